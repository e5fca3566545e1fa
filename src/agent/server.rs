// HTTP agent server: hosts one team's decision agent so that a draft running
// elsewhere can reach it through `RemoteAgent`.
//
// Routes:
//   GET  /health    liveness probe
//   POST /decision  one pick or comment request in the wire format

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::wire::{CommentReply, DecisionKind, DecisionRequest, PickReply};
use super::{AgentError, CommentRequest, DecisionAgent, PickRequest};
use crate::draft::player::{Player, PlayerPool};

/// Shared state passed to the handlers.
#[derive(Clone)]
pub struct AgentServerState {
    pub slot: u8,
    pub agent: Arc<dyn DecisionAgent>,
    /// Catalog used to turn the names on the wire back into players.
    pub pool: Arc<PlayerPool>,
}

/// Build the router with all routes.
pub fn build_router(state: AgentServerState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/decision", post(decision_handler))
        .with_state(state)
}

/// Bind `addr` and serve in a background task.
pub async fn start(addr: &str, state: AgentServerState) -> Result<AgentServerHandle, std::io::Error> {
    let slot = state.slot;
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(slot, %local_addr, "agent server listening");

    let router = build_router(state);
    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            warn!("agent server stopped: {e}");
        }
    });

    Ok(AgentServerHandle {
        addr: local_addr,
        task,
    })
}

/// Handle returned by [`start`]; dropping it leaves the server running.
pub struct AgentServerHandle {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl AgentServerHandle {
    /// Base URL suitable for `RemoteAgent::new`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait until the server task exits.
    pub async fn wait(self) {
        let _ = self.task.await;
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

async fn health_handler(State(state): State<AgentServerState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "team_id": state.slot }))
}

async fn decision_handler(
    State(state): State<AgentServerState>,
    Json(request): Json<DecisionRequest>,
) -> Response {
    if request.team_id != state.slot {
        warn!(
            slot = state.slot,
            team_id = request.team_id,
            "decision request addressed to another team"
        );
    }

    match decide(&state, request).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn decide(state: &AgentServerState, request: DecisionRequest) -> Result<Value, AgentError> {
    let players = resolve_names(&state.pool, &request.available_players);

    let body = match request.kind {
        DecisionKind::Pick => {
            let pick = PickRequest {
                team_id: request.team_id,
                strategy: request.strategy_tag,
                round: request.round,
                pick_number: request.pick_number,
                own_picks: request.own_picks,
                candidates: players,
                recent_history: request.recent_history,
                rival_context: request.rival_context,
                retry_note: request.retry_note,
            };
            let decision = state.agent.request_pick(&pick).await?;
            info!(
                team = pick.team_id,
                player = %decision.player.name,
                "served pick decision"
            );
            serde_json::to_value(PickReply {
                player_name: decision.player.name,
                reasoning: decision.reasoning,
                trash_talk: decision.trash_talk,
            })
        }
        DecisionKind::Comment => {
            let target_player = request
                .target_player
                .as_deref()
                .and_then(|name| state.pool.get(name))
                .cloned()
                .ok_or_else(|| {
                    AgentError::Malformed("comment request without a known target_player".into())
                })?;
            let target_team = request.target_team.unwrap_or_default();
            let comment = CommentRequest {
                team_id: request.team_id,
                strategy: request.strategy_tag,
                round: request.round,
                pick_number: request.pick_number,
                own_picks: request.own_picks,
                target_team,
                target_name: request
                    .target_name
                    .unwrap_or_else(|| format!("Team {target_team}")),
                target_player,
                available: players,
                recent_history: request.recent_history,
                rival_context: request.rival_context,
            };
            let text = state.agent.request_comment(&comment).await?;
            serde_json::to_value(CommentReply { text })
        }
    };

    body.map_err(|e| AgentError::Malformed(e.to_string()))
}

/// Names unknown to this server's catalog are dropped.
fn resolve_names(pool: &PlayerPool, names: &[String]) -> Vec<Player> {
    names
        .iter()
        .filter_map(|name| {
            let found = pool.get(name).cloned();
            if found.is_none() {
                warn!("ignoring unknown player '{name}' in decision request");
            }
            found
        })
        .collect()
}

fn error_response(err: AgentError) -> Response {
    let status = match &err {
        AgentError::InvalidSelection { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AgentError::Malformed(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    let mut body = json!({ "error": err.to_string() });
    if let AgentError::InvalidSelection { name } = &err {
        body["player_name"] = Value::String(name.clone());
    }
    warn!(%status, error = %err, "decision request failed");
    (status, Json(body)).into_response()
}
