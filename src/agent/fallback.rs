// Decorator that asks a primary agent first and defers to a secondary one
// when the primary cannot be reached.

use async_trait::async_trait;
use tracing::warn;

use super::{AgentError, CommentRequest, DecisionAgent, PickDecision, PickRequest};

/// Per-call fallback from `primary` to `secondary`.
///
/// Only communication failures (timeouts, transport errors, unreadable
/// replies) trigger the fallback. An invalid selection is a decision, not an
/// outage, and is returned as-is so the caller can retry it.
pub struct FallbackAgent<P, S> {
    primary: P,
    secondary: S,
}

impl<P, S> FallbackAgent<P, S>
where
    P: DecisionAgent,
    S: DecisionAgent,
{
    pub fn new(primary: P, secondary: S) -> Self {
        FallbackAgent { primary, secondary }
    }
}

#[async_trait]
impl<P, S> DecisionAgent for FallbackAgent<P, S>
where
    P: DecisionAgent,
    S: DecisionAgent,
{
    async fn request_pick(&self, request: &PickRequest) -> Result<PickDecision, AgentError> {
        match self.primary.request_pick(request).await {
            Err(err) if err.is_communication() => {
                warn!(team = request.team_id, error = %err, "primary agent unavailable for pick, deciding locally");
                self.secondary.request_pick(request).await
            }
            other => other,
        }
    }

    async fn request_comment(&self, request: &CommentRequest) -> Result<String, AgentError> {
        match self.primary.request_comment(request).await {
            Err(err) if err.is_communication() => {
                warn!(team = request.team_id, error = %err, "primary agent unavailable for comment, deciding locally");
                self.secondary.request_comment(request).await
            }
            other => other,
        }
    }
}
