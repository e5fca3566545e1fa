// In-process decision agent.
//
// With a reasoner configured, every decision is one completion; without one,
// the agent takes the top candidate and speaks in canned lines so that a
// draft can run offline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::strategy::StrategyTag;
use super::wire::{parse_decision, DecisionKind};
use super::{
    bound_text, optional_text, AgentError, CommentRequest, DecisionAgent, PickDecision,
    PickRequest,
};
use crate::draft::player::{Player, Position};
use crate::llm::prompt::{build_comment_prompt, build_pick_prompt, system_prompt};
use crate::llm::Reasoner;

/// Completion budgets per decision kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLimits {
    pub pick_max_tokens: u32,
    pub comment_max_tokens: u32,
}

impl Default for TokenLimits {
    fn default() -> Self {
        TokenLimits {
            pick_max_tokens: 400,
            comment_max_tokens: 150,
        }
    }
}

pub struct LocalAgent {
    reasoner: Option<Arc<dyn Reasoner>>,
    limits: TokenLimits,
}

impl LocalAgent {
    pub fn new(reasoner: Option<Arc<dyn Reasoner>>, limits: TokenLimits) -> Self {
        LocalAgent { reasoner, limits }
    }

    /// An agent that never calls out to a model.
    pub fn heuristic() -> Self {
        Self::new(None, TokenLimits::default())
    }

    pub fn uses_model(&self) -> bool {
        self.reasoner.is_some()
    }
}

#[async_trait]
impl DecisionAgent for LocalAgent {
    async fn request_pick(&self, request: &PickRequest) -> Result<PickDecision, AgentError> {
        let Some(reasoner) = &self.reasoner else {
            let player = request
                .candidates
                .first()
                .cloned()
                .ok_or_else(|| AgentError::InvalidSelection {
                    name: String::new(),
                })?;
            return Ok(PickDecision {
                reasoning: canned_reasoning(request.strategy, &player),
                player,
                trash_talk: None,
            });
        };

        let text = reasoner
            .complete(
                &system_prompt(request.team_id, request.strategy),
                &build_pick_prompt(request),
                self.limits.pick_max_tokens,
            )
            .await?;
        debug!(team = request.team_id, reply = %text, "pick completion");

        let reply = parse_decision(DecisionKind::Pick, &text)?.into_pick()?;
        let player = request.resolve(&reply.player_name)?;
        let reasoning = bound_text(&reply.reasoning)
            .unwrap_or_else(|_| canned_reasoning(request.strategy, &player));

        Ok(PickDecision {
            player,
            reasoning,
            trash_talk: optional_text(reply.trash_talk),
        })
    }

    async fn request_comment(&self, request: &CommentRequest) -> Result<String, AgentError> {
        let Some(reasoner) = &self.reasoner else {
            return Ok(canned_comment(request.strategy, &request.target_player));
        };

        let text = reasoner
            .complete(
                &system_prompt(request.team_id, request.strategy),
                &build_comment_prompt(request),
                self.limits.comment_max_tokens,
            )
            .await?;

        let reply = parse_decision(DecisionKind::Comment, &text)?.into_comment()?;
        bound_text(&reply.text)
    }
}

// ---------------------------------------------------------------------------
// Canned lines
// ---------------------------------------------------------------------------

fn canned_reasoning(strategy: StrategyTag, player: &Player) -> String {
    match strategy {
        StrategyTag::ZeroRB => format!(
            "{} keeps the air raid rolling. Running backs can wait.",
            player.name
        ),
        StrategyTag::RobustRB if player.position == Position::RB => format!(
            "{} gives me the workhorse this roster is built around.",
            player.name
        ),
        StrategyTag::UpsideHunter if player.upside => format!(
            "{} has league-winning upside. Floors are for cowards.",
            player.name
        ),
        _ => format!("{} is the best value left on the board.", player.name),
    }
}

fn canned_comment(strategy: StrategyTag, target: &Player) -> String {
    match (strategy, target.position) {
        (StrategyTag::ZeroRB, Position::RB) => format!(
            "{}? Enjoy refreshing the injury report all season.",
            target.name
        ),
        (StrategyTag::ZeroRB, _) => "Decent. Still not catching my receiving corps.".to_string(),
        (StrategyTag::RobustRB, Position::RB) => {
            "Respect. Workhorses win championships.".to_string()
        }
        (StrategyTag::RobustRB, _) => format!(
            "{} won't help you when the ground game decides the playoffs.",
            target.name
        ),
        (StrategyTag::UpsideHunter, _) if target.upside => {
            "Now that is a swing I can respect.".to_string()
        }
        (StrategyTag::UpsideHunter, _) => "Safe. Boring. Predictable.".to_string(),
        (StrategyTag::BestPlayerAvailable, _) => {
            format!("Fine value on {}. I'd have taken him too.", target.name)
        }
        (StrategyTag::UserControlled, _) => format!("Interesting pick with {}.", target.name),
    }
}
