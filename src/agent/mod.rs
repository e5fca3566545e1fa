// Agent decision interface: the capability every drafting team is asked
// through, regardless of whether it runs in-process or behind HTTP.

pub mod fallback;
pub mod local;
pub mod remote;
pub mod server;
pub mod strategy;
pub mod wire;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AgentMode, AgentsConfig};
use crate::draft::player::{resolve_player, Player};
use crate::llm::LlmError;
use fallback::FallbackAgent;
use local::LocalAgent;
use remote::RemoteAgent;
use strategy::StrategyTag;

/// Upper bound on comment length, in characters.
pub const MAX_COMMENT_CHARS: usize = 280;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("'{name}' does not resolve to an available player")]
    InvalidSelection { name: String },

    #[error("no reply within {after:?}")]
    CommunicationTimeout { after: Duration },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("empty reply")]
    EmptyReply,

    #[error("reasoning failed: {0}")]
    Reasoning(#[from] LlmError),
}

impl AgentError {
    /// Failures of the channel rather than of the decision itself. These are
    /// the errors a remote agent recovers from by deferring to a local one.
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            AgentError::CommunicationTimeout { .. }
                | AgentError::Transport(_)
                | AgentError::Malformed(_)
                | AgentError::EmptyReply
        )
    }
}

// ---------------------------------------------------------------------------
// Requests and decisions
// ---------------------------------------------------------------------------

/// Everything a team is told when it is on the clock. A snapshot: nothing in
/// here refers back to the live board.
#[derive(Debug, Clone, PartialEq)]
pub struct PickRequest {
    pub team_id: u8,
    pub strategy: StrategyTag,
    pub round: u32,
    pub pick_number: u32,
    /// The team's own picks so far, as "Name (POS)" labels.
    pub own_picks: Vec<String>,
    /// Candidates already shaped by the team's strategy, best first.
    pub candidates: Vec<Player>,
    pub recent_history: Vec<String>,
    pub rival_context: Option<String>,
    /// Set on the second attempt after an unresolvable choice.
    pub retry_note: Option<String>,
}

impl PickRequest {
    /// Resolve a chosen name against the offered candidates.
    pub fn resolve(&self, name: &str) -> Result<Player, AgentError> {
        resolve_player(name, &self.candidates)
            .cloned()
            .ok_or_else(|| AgentError::InvalidSelection {
                name: name.to_string(),
            })
    }
}

/// A request for a reaction to someone else's pick.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRequest {
    pub team_id: u8,
    pub strategy: StrategyTag,
    pub round: u32,
    pub pick_number: u32,
    pub own_picks: Vec<String>,
    /// Slot of the team that just picked.
    pub target_team: u8,
    /// Display name of that team ("Team 3", "YOUR TEAM").
    pub target_name: String,
    pub target_player: Player,
    /// Best few players still on the board, for perspective.
    pub available: Vec<Player>,
    pub recent_history: Vec<String>,
    pub rival_context: Option<String>,
}

/// A validated pick decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PickDecision {
    pub player: Player,
    pub reasoning: String,
    pub trash_talk: Option<String>,
}

/// Trim `text` and cap it at [`MAX_COMMENT_CHARS`]. Blank text is an
/// [`AgentError::EmptyReply`].
pub fn bound_text(text: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AgentError::EmptyReply);
    }
    Ok(trimmed.chars().take(MAX_COMMENT_CHARS).collect())
}

/// Blank trash talk is the same as none.
pub(crate) fn optional_text(text: Option<String>) -> Option<String> {
    text.and_then(|t| bound_text(&t).ok())
}

// ---------------------------------------------------------------------------
// DecisionAgent
// ---------------------------------------------------------------------------

/// The decision capability a team's seat is backed by.
///
/// Implementations must only return players drawn from the request's
/// candidate list; anything else is an [`AgentError::InvalidSelection`].
#[async_trait]
pub trait DecisionAgent: Send + Sync {
    async fn request_pick(&self, request: &PickRequest) -> Result<PickDecision, AgentError>;

    async fn request_comment(&self, request: &CommentRequest) -> Result<String, AgentError>;
}

#[async_trait]
impl<T: DecisionAgent + ?Sized> DecisionAgent for Arc<T> {
    async fn request_pick(&self, request: &PickRequest) -> Result<PickDecision, AgentError> {
        (**self).request_pick(request).await
    }

    async fn request_comment(&self, request: &CommentRequest) -> Result<String, AgentError> {
        (**self).request_comment(request).await
    }
}

// ---------------------------------------------------------------------------
// AgentRoster
// ---------------------------------------------------------------------------

/// Which agent answers for each seat at the draft.
#[derive(Clone)]
pub struct AgentRoster {
    default: Arc<dyn DecisionAgent>,
    seats: HashMap<u8, Arc<dyn DecisionAgent>>,
}

impl AgentRoster {
    /// Every seat served by `default` unless overridden.
    pub fn new(default: Arc<dyn DecisionAgent>) -> Self {
        AgentRoster {
            default,
            seats: HashMap::new(),
        }
    }

    pub fn with_seat(mut self, slot: u8, agent: Arc<dyn DecisionAgent>) -> Self {
        self.seats.insert(slot, agent);
        self
    }

    pub fn for_slot(&self, slot: u8) -> &dyn DecisionAgent {
        self.seats.get(&slot).unwrap_or(&self.default).as_ref()
    }

    /// Build the roster the configuration asks for.
    ///
    /// Local mode serves every seat in-process. Remote mode gives each seat
    /// with an endpoint a `RemoteAgent` that falls back to the local agent
    /// per call; seats without one stay local.
    pub fn from_config(agents: &AgentsConfig, local: Arc<LocalAgent>) -> Self {
        let mut roster = AgentRoster::new(local.clone());
        if agents.mode == AgentMode::Remote {
            for (slot, url) in &agents.endpoints {
                let remote = RemoteAgent::new(url.clone(), agents.timeout);
                roster = roster.with_seat(
                    *slot,
                    Arc::new(FallbackAgent::new(remote, local.clone())),
                );
            }
        }
        roster
    }
}
