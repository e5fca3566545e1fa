// Player catalog: static pool of draftable players, ADP ordering, and
// tolerant name resolution.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::board::DraftBoard;

/// The catalog compiled into the binary, used when no CSV path is configured.
const BUILTIN_CATALOG: &str = include_str!("../../data/players.csv");

/// Fantasy football positions in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
}

impl Position {
    /// All positions, in tie-break priority order.
    pub const ALL: [Position; 4] = [Position::RB, Position::WR, Position::TE, Position::QB];

    /// Parse a position abbreviation (case-insensitive).
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::QB),
            "RB" => Some(Position::RB),
            "WR" => Some(Position::WR),
            "TE" => Some(Position::TE),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
        }
    }

    /// Tie-break priority when two players share an ADP. Lower sorts first.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::RB => 0,
            Position::WR => 1,
            Position::TE => 2,
            Position::QB => 3,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A draftable player. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub position: Position,
    /// NFL team abbreviation (e.g. "SF").
    pub team: String,
    /// Average draft position. Lower is better.
    pub adp: f64,
    pub tier: u8,
    /// Fantasy points per game last season.
    pub ppg: f64,
    /// Boom-or-bust flag used by the upside strategy.
    #[serde(default)]
    pub upside: bool,
}

impl Player {
    /// Short label used in prompts and on the wire: "Name (POS)".
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.position)
    }
}

/// Deterministic ADP ordering: ADP, then position priority, then name.
pub fn compare_adp(a: &Player, b: &Player) -> Ordering {
    a.adp
        .total_cmp(&b.adp)
        .then_with(|| a.position.sort_order().cmp(&b.position.sort_order()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Return the `k` best players by ADP from `available`.
pub fn top_by_adp(available: &[Player], k: usize) -> Vec<Player> {
    let mut sorted = available.to_vec();
    sorted.sort_by(compare_adp);
    sorted.truncate(k);
    sorted
}

/// Resolve a possibly approximate player name against `available`.
///
/// Matching is case-insensitive: an exact name match wins; otherwise the
/// best-ADP player whose name contains the query (or is contained in it, for
/// chatty replies like "I'll take Justin Jefferson") is chosen.
pub fn resolve_player<'a>(query: &str, available: &'a [Player]) -> Option<&'a Player> {
    let needle = query.trim().trim_matches(|c| c == '"' || c == '*').to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(exact) = available.iter().find(|p| p.name.to_lowercase() == needle) {
        return Some(exact);
    }

    available
        .iter()
        .filter(|p| {
            let name = p.name.to_lowercase();
            name.contains(&needle) || needle.contains(&name)
        })
        .min_by(|a, b| compare_adp(a, b))
}

/// Best available player at each position, in position priority order.
/// Positions with no remaining players are omitted.
pub fn best_by_position(available: &[Player]) -> Vec<Player> {
    Position::ALL
        .iter()
        .filter_map(|pos| {
            available
                .iter()
                .filter(|p| p.position == *pos)
                .min_by(|a, b| compare_adp(a, b))
                .cloned()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// PlayerPool
// ---------------------------------------------------------------------------

/// CSV row in `data/players.csv`.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    name: String,
    pos: String,
    #[serde(default)]
    team: String,
    adp: f64,
    #[serde(default)]
    tier: u8,
    #[serde(default)]
    ppg: f64,
    #[serde(default)]
    upside: bool,
}

/// The static, read-only catalog of draftable players, held in ADP order.
#[derive(Debug, Clone)]
pub struct PlayerPool {
    players: Vec<Player>,
}

impl PlayerPool {
    /// Build a pool from an explicit player list. Duplicate names keep the
    /// first occurrence.
    pub fn from_players(players: Vec<Player>) -> Self {
        let mut seen = HashSet::new();
        let mut players: Vec<Player> = players
            .into_iter()
            .filter(|p| {
                let fresh = seen.insert(p.name.to_lowercase());
                if !fresh {
                    warn!("duplicate catalog entry for '{}', keeping the first", p.name);
                }
                fresh
            })
            .collect();
        players.sort_by(compare_adp);
        PlayerPool { players }
    }

    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        let players = load_players_from_reader(BUILTIN_CATALOG.as_bytes()).map_err(|e| {
            CatalogError::Csv {
                path: "<builtin>".into(),
                source: e,
            }
        })?;
        Ok(Self::from_players(players))
    }

    /// Load a catalog from a CSV file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = std::fs::File::open(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let players = load_players_from_reader(file).map_err(|e| CatalogError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;
        if players.is_empty() {
            return Err(CatalogError::Validation(format!(
                "{} produced zero valid rows",
                path.display()
            )));
        }
        Ok(Self::from_players(players))
    }

    /// All players, in ADP order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look up a player by exact name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Player> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Every player not yet drafted on `board`, in ADP order.
    pub fn available(&self, board: &DraftBoard) -> Vec<Player> {
        self.players
            .iter()
            .filter(|p| !board.is_drafted(&p.name))
            .cloned()
            .collect()
    }
}

fn load_players_from_reader<R: Read>(rdr: R) -> Result<Vec<Player>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayer>() {
        match result {
            Ok(raw) => {
                let Some(position) = Position::from_str_pos(&raw.pos) else {
                    warn!("skipping player '{}': unknown position '{}'", raw.name.trim(), raw.pos);
                    continue;
                };
                if !raw.adp.is_finite() {
                    warn!("skipping player '{}': non-finite ADP", raw.name.trim());
                    continue;
                }
                players.push(Player {
                    name: raw.name.trim().to_string(),
                    position,
                    team: raw.team.trim().to_string(),
                    adp: raw.adp,
                    tier: raw.tier,
                    ppg: raw.ppg,
                    upside: raw.upside,
                });
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(players)
}

#[cfg(test)]
pub(crate) fn test_player(name: &str, position: Position, adp: f64) -> Player {
    Player {
        name: name.to_string(),
        position,
        team: "FA".to_string(),
        adp,
        tier: 1,
        ppg: 10.0,
        upside: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Player> {
        vec![
            test_player("Justin Jefferson", Position::WR, 1.8),
            test_player("Christian McCaffrey", Position::RB, 1.2),
            test_player("Josh Allen", Position::QB, 24.3),
            test_player("Keenan Allen", Position::WR, 29.8),
        ]
    }

    #[test]
    fn from_str_pos_case_insensitive() {
        assert_eq!(Position::from_str_pos("qb"), Some(Position::QB));
        assert_eq!(Position::from_str_pos(" Rb "), Some(Position::RB));
        assert_eq!(Position::from_str_pos("K"), None);
        assert_eq!(Position::from_str_pos(""), None);
    }

    #[test]
    fn builtin_catalog_loads_in_adp_order() {
        let pool = PlayerPool::builtin().unwrap();
        assert!(pool.len() >= 40);
        assert_eq!(pool.players()[0].name, "Christian McCaffrey");
        assert!(pool
            .players()
            .windows(2)
            .all(|w| compare_adp(&w[0], &w[1]) != Ordering::Greater));
        let zay = pool.get("zay flowers").unwrap();
        assert!(zay.upside);
        assert_eq!(zay.position, Position::WR);
    }

    #[test]
    fn loader_skips_bad_rows() {
        let csv = "name,pos,team,adp,tier,ppg,upside\n\
                   Good Player,RB,SF,3.0,1,10.0,false\n\
                   Kicker Guy,K,SF,90.0,5,8.0,false\n\
                   Broken,WR,SF,not-a-number,1,1.0,false\n";
        let players = load_players_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Good Player");
    }

    #[test]
    fn duplicate_names_keep_first() {
        let pool = PlayerPool::from_players(vec![
            test_player("Same Guy", Position::RB, 5.0),
            test_player("same guy", Position::WR, 1.0),
        ]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.players()[0].position, Position::RB);
    }

    #[test]
    fn top_by_adp_breaks_ties_by_position_then_name() {
        let players = vec![
            test_player("Zed", Position::WR, 2.0),
            test_player("Abe", Position::QB, 2.0),
            test_player("Bob", Position::RB, 2.0),
            test_player("Amy", Position::WR, 2.0),
            test_player("First", Position::TE, 1.0),
        ];
        let names: Vec<String> = top_by_adp(&players, 4).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["First", "Bob", "Amy", "Zed"]);
    }

    #[test]
    fn resolve_exact_and_case_insensitive() {
        let players = sample();
        assert_eq!(resolve_player("josh allen", &players).unwrap().name, "Josh Allen");
        assert_eq!(
            resolve_player("JUSTIN JEFFERSON", &players).unwrap().name,
            "Justin Jefferson"
        );
    }

    #[test]
    fn resolve_substring_prefers_best_adp() {
        let players = sample();
        // "allen" matches both Allens; Josh has the better ADP.
        assert_eq!(resolve_player("Allen", &players).unwrap().name, "Josh Allen");
        assert_eq!(resolve_player("McCaffrey", &players).unwrap().name, "Christian McCaffrey");
    }

    #[test]
    fn resolve_chatty_reply_containing_name() {
        let players = sample();
        let found = resolve_player("I'm taking Justin Jefferson, obviously", &players).unwrap();
        assert_eq!(found.name, "Justin Jefferson");
    }

    #[test]
    fn resolve_rejects_unknown_and_empty() {
        let players = sample();
        assert!(resolve_player("Tom Brady", &players).is_none());
        assert!(resolve_player("   ", &players).is_none());
    }

    #[test]
    fn available_excludes_drafted_and_is_stable() {
        use crate::agent::strategy::StrategyTag;
        use crate::draft::pick::Pick;

        let pool = PlayerPool::from_players(sample());
        let mut board = DraftBoard::new(&[StrategyTag::ZeroRB, StrategyTag::RobustRB]);
        board
            .record_pick(Pick {
                round: 1,
                pick_in_round: 1,
                overall: 1,
                team: 1,
                player: test_player("Justin Jefferson", Position::WR, 1.8),
                reasoning: None,
                trash_talk: None,
            })
            .unwrap();

        let first = pool.available(&board);
        assert_eq!(first, pool.available(&board));
        let names: Vec<&str> = first.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Christian McCaffrey", "Josh Allen", "Keenan Allen"]);
    }

    #[test]
    fn best_by_position_skips_empty_positions() {
        let best = best_by_position(&sample());
        let labels: Vec<String> = best.iter().map(|p| p.label()).collect();
        assert_eq!(
            labels,
            vec!["Christian McCaffrey (RB)", "Justin Jefferson (WR)", "Josh Allen (QB)"]
        );
    }
}
