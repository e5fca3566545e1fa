// Draft board: per-team pick lists and the full pick history.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pick::Pick;
use crate::agent::strategy::StrategyTag;

#[derive(Debug, Error, PartialEq)]
pub enum BoardError {
    #[error("no team in slot {slot}")]
    UnknownTeam { slot: u8 },

    #[error("{player} was already drafted by Team {by}")]
    AlreadyDrafted { player: String, by: u8 },

    #[error("pick #{got} recorded out of sequence, expected #{expected}")]
    OutOfSequence { expected: u32, got: u32 },
}

/// A single team's seat at the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    /// Draft slot (1-indexed).
    pub slot: u8,
    pub strategy: StrategyTag,
    /// Picks in the order they were made.
    pub picks: Vec<Pick>,
}

impl TeamState {
    /// Display name for the team.
    pub fn name(&self) -> String {
        if self.strategy == StrategyTag::UserControlled {
            "YOUR TEAM".to_string()
        } else {
            format!("Team {}", self.slot)
        }
    }

    /// Names of the players this team has drafted, in pick order.
    pub fn player_names(&self) -> Vec<String> {
        self.picks.iter().map(|p| p.player.name.clone()).collect()
    }
}

/// The mutable record of a draft. Owned exclusively by the orchestrator;
/// everyone else sees it through shared references or clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftBoard {
    /// Teams indexed by `slot - 1`.
    teams: Vec<TeamState>,
    /// All picks in overall order.
    picks: Vec<Pick>,
    /// Lowercased names of every drafted player.
    drafted: HashSet<String>,
}

impl DraftBoard {
    /// Create an empty board with one team per strategy entry; slot numbers
    /// follow the order of `strategies`.
    pub fn new(strategies: &[StrategyTag]) -> Self {
        let teams = strategies
            .iter()
            .enumerate()
            .map(|(i, strategy)| TeamState {
                slot: (i + 1) as u8,
                strategy: *strategy,
                picks: Vec::new(),
            })
            .collect();

        DraftBoard {
            teams,
            picks: Vec::new(),
            drafted: HashSet::new(),
        }
    }

    pub fn num_teams(&self) -> usize {
        self.teams.len()
    }

    pub fn teams(&self) -> &[TeamState] {
        &self.teams
    }

    /// Look up a team by slot.
    pub fn team(&self, slot: u8) -> Option<&TeamState> {
        (slot as usize)
            .checked_sub(1)
            .and_then(|idx| self.teams.get(idx))
    }

    /// All picks in overall order.
    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn pick_count(&self) -> usize {
        self.picks.len()
    }

    /// The overall number the next recorded pick must carry.
    pub fn next_pick_number(&self) -> u32 {
        self.picks.len() as u32 + 1
    }

    pub fn is_drafted(&self, player_name: &str) -> bool {
        self.drafted.contains(&player_name.to_lowercase())
    }

    /// Record a completed pick.
    ///
    /// All checks run before anything is written, so a rejected pick leaves
    /// the board untouched.
    pub fn record_pick(&mut self, pick: Pick) -> Result<(), BoardError> {
        let expected = self.next_pick_number();
        if pick.overall != expected {
            return Err(BoardError::OutOfSequence {
                expected,
                got: pick.overall,
            });
        }

        let idx = (pick.team as usize)
            .checked_sub(1)
            .filter(|idx| *idx < self.teams.len())
            .ok_or(BoardError::UnknownTeam { slot: pick.team })?;

        let key = pick.player.name.to_lowercase();
        if self.drafted.contains(&key) {
            let by = self
                .picks
                .iter()
                .find(|p| p.player.name.to_lowercase() == key)
                .map(|p| p.team)
                .unwrap_or_default();
            return Err(BoardError::AlreadyDrafted {
                player: pick.player.name.clone(),
                by,
            });
        }

        self.drafted.insert(key);
        self.teams[idx].picks.push(pick.clone());
        self.picks.push(pick);
        Ok(())
    }

    /// Read-only per-team view of the board.
    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            teams: self.teams.clone(),
        }
    }
}

/// Per-team ordered pick lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSummary {
    pub teams: Vec<TeamState>,
}

impl DraftSummary {
    pub fn total_picks(&self) -> usize {
        self.teams.iter().map(|t| t.picks.len()).sum()
    }
}

impl fmt::Display for DraftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DRAFT SUMMARY")?;
        for team in &self.teams {
            writeln!(f)?;
            if team.strategy == StrategyTag::UserControlled {
                writeln!(f, "{}:", team.name())?;
            } else {
                writeln!(f, "{} ({}):", team.name(), team.strategy.label())?;
            }
            for pick in &team.picks {
                writeln!(
                    f,
                    "  R{}: {} ({}, {})",
                    pick.round, pick.player.name, pick.player.position, pick.player.team
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::{test_player, Position};

    fn board() -> DraftBoard {
        DraftBoard::new(&[
            StrategyTag::ZeroRB,
            StrategyTag::BestPlayerAvailable,
            StrategyTag::UserControlled,
        ])
    }

    fn pick(overall: u32, team: u8, name: &str) -> Pick {
        Pick {
            round: 1,
            pick_in_round: overall,
            overall,
            team,
            player: test_player(name, Position::WR, overall as f64),
            reasoning: None,
            trash_talk: None,
        }
    }

    #[test]
    fn new_board_is_empty() {
        let b = board();
        assert_eq!(b.num_teams(), 3);
        assert_eq!(b.pick_count(), 0);
        assert_eq!(b.next_pick_number(), 1);
        assert_eq!(b.team(2).unwrap().strategy, StrategyTag::BestPlayerAvailable);
        assert!(b.team(0).is_none());
        assert!(b.team(4).is_none());
    }

    #[test]
    fn record_pick_appends_to_team_and_history() {
        let mut b = board();
        b.record_pick(pick(1, 1, "Tyreek Hill")).unwrap();
        b.record_pick(pick(2, 2, "CeeDee Lamb")).unwrap();

        assert_eq!(b.pick_count(), 2);
        assert_eq!(b.team(1).unwrap().player_names(), vec!["Tyreek Hill"]);
        assert!(b.is_drafted("tyreek hill"));
        assert!(!b.is_drafted("Davante Adams"));
    }

    #[test]
    fn double_draft_rejected_without_side_effects() {
        let mut b = board();
        b.record_pick(pick(1, 1, "Tyreek Hill")).unwrap();
        let err = b.record_pick(pick(2, 2, "TYREEK HILL")).unwrap_err();
        assert_eq!(
            err,
            BoardError::AlreadyDrafted {
                player: "TYREEK HILL".into(),
                by: 1
            }
        );
        assert_eq!(b.pick_count(), 1);
        assert!(b.team(2).unwrap().picks.is_empty());
    }

    #[test]
    fn out_of_sequence_and_unknown_team_rejected() {
        let mut b = board();
        assert_eq!(
            b.record_pick(pick(2, 1, "A")).unwrap_err(),
            BoardError::OutOfSequence {
                expected: 1,
                got: 2
            }
        );
        assert_eq!(
            b.record_pick(pick(1, 9, "A")).unwrap_err(),
            BoardError::UnknownTeam { slot: 9 }
        );
        assert_eq!(b.pick_count(), 0);
    }

    #[test]
    fn summary_groups_by_team() {
        let mut b = board();
        b.record_pick(pick(1, 1, "Tyreek Hill")).unwrap();
        b.record_pick(pick(2, 3, "CeeDee Lamb")).unwrap();
        let summary = b.summary();
        assert_eq!(summary.total_picks(), 2);

        let text = summary.to_string();
        assert!(text.contains("Team 1 (Zero RB):"));
        assert!(text.contains("YOUR TEAM:"));
        assert!(text.contains("  R1: CeeDee Lamb (WR, FA)"));
    }
}
