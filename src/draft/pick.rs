// Pick and comment records.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::Player;

/// A single committed draft pick. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    /// Round number (1-indexed).
    pub round: u32,
    /// Position within the round (1..=num_teams).
    pub pick_in_round: u32,
    /// Sequential overall pick number (1-indexed).
    pub overall: u32,
    /// Slot of the team that made the pick.
    pub team: u8,
    pub player: Player,
    /// Why the team made the pick, if it said.
    pub reasoning: Option<String>,
    /// Optional one-liner aimed at the rest of the room.
    pub trash_talk: Option<String>,
}

/// Who a comment is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentTarget {
    Team(u8),
    All,
}

impl fmt::Display for CommentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentTarget::Team(slot) => write!(f, "Team {slot}"),
            CommentTarget::All => write!(f, "ALL"),
        }
    }
}

/// A reaction from one team. Ephemeral: emitted, then only kept as
/// conversational history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub from: u8,
    pub to: CommentTarget,
    pub text: String,
}

impl Comment {
    /// The history line this comment leaves behind, e.g. "Team 3 -> Team 1: ...".
    pub fn history_line(&self) -> String {
        format!("Team {} -> {}: {}", self.from, self.to, self.text)
    }
}
