// HTTP decision agent: forwards requests to an agent server and waits a
// bounded time for the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::wire::{parse_decision, Decision, DecisionRequest};
use super::{
    bound_text, optional_text, AgentError, CommentRequest, DecisionAgent, PickDecision,
    PickRequest,
};

pub struct RemoteAgent {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RemoteAgent {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        RemoteAgent {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server answers `GET /health` within the timeout.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.http.get(format!("{}/health", self.base_url)).send();
        matches!(
            tokio::time::timeout(self.timeout, probe).await,
            Ok(Ok(resp)) if resp.status().is_success()
        )
    }

    async fn call(&self, request: &DecisionRequest) -> Result<Decision, AgentError> {
        let exchange = async {
            let resp = self
                .http
                .post(format!("{}/decision", self.base_url))
                .json(request)
                .send()
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;

            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| AgentError::Transport(e.to_string()))?;
            debug!(team = request.team_id, %status, body = %body, "agent reply");

            if status == StatusCode::UNPROCESSABLE_ENTITY {
                return Err(rejected_selection(&body));
            }
            if !status.is_success() {
                return Err(AgentError::Transport(format!(
                    "agent at {} returned {status}",
                    self.base_url
                )));
            }
            parse_decision(request.kind, &body)
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| AgentError::CommunicationTimeout {
                after: self.timeout,
            })?
    }
}

/// The server refused its own model's choice; carry the name through.
fn rejected_selection(body: &str) -> AgentError {
    let name = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("player_name")?.as_str().map(str::to_string))
        .unwrap_or_default();
    AgentError::InvalidSelection { name }
}

#[async_trait]
impl DecisionAgent for RemoteAgent {
    async fn request_pick(&self, request: &PickRequest) -> Result<PickDecision, AgentError> {
        let reply = self
            .call(&DecisionRequest::for_pick(request))
            .await?
            .into_pick()?;
        let player = request.resolve(&reply.player_name)?;
        Ok(PickDecision {
            player,
            reasoning: reply.reasoning.trim().to_string(),
            trash_talk: optional_text(reply.trash_talk),
        })
    }

    async fn request_comment(&self, request: &CommentRequest) -> Result<String, AgentError> {
        let reply = self
            .call(&DecisionRequest::for_comment(request))
            .await?
            .into_comment()?;
        bound_text(&reply.text)
    }
}
