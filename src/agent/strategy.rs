// Draft strategies and the candidate filtering each one applies before a
// decision is requested.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::draft::player::{compare_adp, Player, Position};

/// Last round in which ZeroRB refuses running backs.
pub const ZERO_RB_WINDOW: u32 = 3;

/// Last round in which RobustRB insists on running backs.
pub const ROBUST_RB_WINDOW: u32 = 2;

/// The closed set of team strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyTag {
    ZeroRB,
    BestPlayerAvailable,
    RobustRB,
    UpsideHunter,
    UserControlled,
}

impl StrategyTag {
    /// Parse a strategy name. Accepts the tag itself plus the common
    /// spellings used in draft rooms ("Zero RB", "BPA", "Upside").
    pub fn from_name(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "zerorb" => Some(StrategyTag::ZeroRB),
            "bestplayeravailable" | "bpa" => Some(StrategyTag::BestPlayerAvailable),
            "robustrb" => Some(StrategyTag::RobustRB),
            "upsidehunter" | "upside" => Some(StrategyTag::UpsideHunter),
            "usercontrolled" | "user" | "human" => Some(StrategyTag::UserControlled),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            StrategyTag::ZeroRB => "Zero RB",
            StrategyTag::BestPlayerAvailable => "Best Player Available",
            StrategyTag::RobustRB => "Robust RB",
            StrategyTag::UpsideHunter => "Upside Hunter",
            StrategyTag::UserControlled => "User Controlled",
        }
    }

    /// One-line draft-room personality, fed to the model as instructions.
    pub fn philosophy(&self) -> &'static str {
        match self {
            StrategyTag::ZeroRB => {
                "RBs are injury magnets. WRs are the future. You are building an air-raid \
                 offense and you mock anyone who burns early picks on running backs."
            }
            StrategyTag::BestPlayerAvailable => {
                "You are the value vulture. You take the best player on the board, every time, \
                 and you feast on other teams' emotional reaches."
            }
            StrategyTag::RobustRB => {
                "Ground and pound. Championships are won with workhorse running backs and \
                 fancy WR builds will be watching from the sidelines."
            }
            StrategyTag::UpsideHunter => {
                "Boom or bust. Safe picks are for cowards; you swing for league-winning \
                 ceilings and laugh at floor-chasers."
            }
            StrategyTag::UserControlled => "A human manager making their own choices.",
        }
    }

    /// Whether a team with this strategy is a natural critic of `other`.
    pub fn opposes(&self, other: StrategyTag) -> bool {
        use StrategyTag::*;
        matches!(
            (self, other),
            (ZeroRB, RobustRB)
                | (RobustRB, ZeroRB)
                | (BestPlayerAvailable, UpsideHunter)
                | (UpsideHunter, BestPlayerAvailable)
        )
    }

    /// Whether an agent drafts for this team.
    pub fn is_agent(&self) -> bool {
        *self != StrategyTag::UserControlled
    }

    /// Narrow `available` to the players this strategy will consider in
    /// `round`, best first, at most `limit` long.
    ///
    /// Pure and deterministic: equal inputs always give the same ordered list.
    pub fn candidates(&self, round: u32, available: &[Player], limit: usize) -> Vec<Player> {
        let mut ranked = available.to_vec();
        ranked.sort_by(compare_adp);

        let mut candidates = match self {
            StrategyTag::ZeroRB if round <= ZERO_RB_WINDOW => {
                let non_rb: Vec<Player> = ranked
                    .iter()
                    .filter(|p| p.position != Position::RB)
                    .cloned()
                    .collect();
                if non_rb.is_empty() {
                    ranked
                } else {
                    non_rb
                }
            }
            StrategyTag::RobustRB if round <= ROBUST_RB_WINDOW => {
                let rbs: Vec<Player> = ranked
                    .iter()
                    .filter(|p| p.position == Position::RB)
                    .cloned()
                    .collect();
                if rbs.is_empty() {
                    ranked
                } else {
                    rbs
                }
            }
            StrategyTag::UpsideHunter => {
                let (mut boom, rest): (Vec<Player>, Vec<Player>) =
                    ranked.into_iter().partition(|p| p.upside);
                boom.extend(rest);
                boom
            }
            _ => ranked,
        };

        candidates.truncate(limit);
        candidates
    }
}

impl fmt::Display for StrategyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
