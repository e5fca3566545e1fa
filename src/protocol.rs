// Events flowing out of the orchestrator and the LLM client.

use serde::{Deserialize, Serialize};

use crate::draft::pick::{Comment, Pick};
use crate::draft::player::Player;

/// One discrete, displayable step of a draft turn, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DraftEvent {
    /// Commissioner announcement that a team is up.
    OnTheClock {
        round: u32,
        pick_in_round: u32,
        overall: u32,
        team: u8,
        team_name: String,
    },
    /// A pick was committed to the board.
    PickMade { pick: Pick, team_name: String },
    /// A reaction from another team.
    Comment(Comment),
    /// The draft is suspended until the human at `team` picks.
    AwaitingHuman {
        team: u8,
        overall: u32,
        available: Vec<Player>,
        /// Best available player at each position.
        advice: Vec<Player>,
    },
    /// The human's last submission did not resolve to an available player.
    HumanInputRejected { input: String, message: String },
    RoundComplete { round: u32 },
    DraftComplete { total_picks: usize },
}

/// Messages produced while streaming a completion from the LLM.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// Incremental text.
    Token { text: String },
    /// Stream finished; `full_text` is the whole reply.
    Complete {
        full_text: String,
        input_tokens: u32,
        output_tokens: u32,
    },
    Error { message: String },
}
