// JSON wire contract between the orchestrator and remote agents.
//
// Requests are flat JSON objects. Replies may arrive bare or wrapped in a
// generic envelope; `parse_decision` peels envelopes off before anything
// else looks at the payload, so callers only ever see a typed `Decision`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::strategy::StrategyTag;
use super::{AgentError, CommentRequest, PickRequest};
use crate::llm::prompt::extract_json;

/// Envelopes nested deeper than this are treated as the payload itself.
const MAX_ENVELOPE_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    Pick,
    Comment,
}

/// A decision request as it travels over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub kind: DecisionKind,
    pub team_id: u8,
    pub strategy_tag: StrategyTag,
    pub round: u32,
    pub pick_number: u32,
    /// Player names, best first.
    pub available_players: Vec<String>,
    #[serde(default)]
    pub recent_history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rival_context: Option<String>,
    #[serde(default)]
    pub own_picks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_team: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_note: Option<String>,
}

impl DecisionRequest {
    pub fn for_pick(req: &PickRequest) -> Self {
        DecisionRequest {
            kind: DecisionKind::Pick,
            team_id: req.team_id,
            strategy_tag: req.strategy,
            round: req.round,
            pick_number: req.pick_number,
            available_players: req.candidates.iter().map(|p| p.name.clone()).collect(),
            recent_history: req.recent_history.clone(),
            rival_context: req.rival_context.clone(),
            own_picks: req.own_picks.clone(),
            target_team: None,
            target_name: None,
            target_player: None,
            retry_note: req.retry_note.clone(),
        }
    }

    pub fn for_comment(req: &CommentRequest) -> Self {
        DecisionRequest {
            kind: DecisionKind::Comment,
            team_id: req.team_id,
            strategy_tag: req.strategy,
            round: req.round,
            pick_number: req.pick_number,
            available_players: req.available.iter().map(|p| p.name.clone()).collect(),
            recent_history: req.recent_history.clone(),
            rival_context: req.rival_context.clone(),
            own_picks: req.own_picks.clone(),
            target_team: Some(req.target_team),
            target_name: Some(req.target_name.clone()),
            target_player: Some(req.target_player.name.clone()),
            retry_note: None,
        }
    }
}

/// Reply body for a pick request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickReply {
    pub player_name: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trash_talk: Option<String>,
}

/// Reply body for a comment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentReply {
    pub text: String,
}

/// An unwrapped, typed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Pick(PickReply),
    Comment(CommentReply),
}

impl Decision {
    pub fn into_pick(self) -> Result<PickReply, AgentError> {
        match self {
            Decision::Pick(reply) => Ok(reply),
            Decision::Comment(_) => Err(AgentError::Malformed(
                "expected a pick, got a comment".into(),
            )),
        }
    }

    pub fn into_comment(self) -> Result<CommentReply, AgentError> {
        match self {
            Decision::Comment(reply) => Ok(reply),
            Decision::Pick(_) => Err(AgentError::Malformed(
                "expected a comment, got a pick".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope handling
// ---------------------------------------------------------------------------

/// Strip any known envelopes from `value`.
///
/// Recognized shapes:
/// - `{"status": {"message": {"parts": [{"text": "<json or text>"}, ...]}}}`
/// - `{"result": <payload or json string>}`
pub fn unwrap_envelope(mut value: Value) -> Value {
    for _ in 0..MAX_ENVELOPE_DEPTH {
        match peel(&value) {
            Some(inner) => value = inner,
            None => break,
        }
    }
    value
}

fn peel(value: &Value) -> Option<Value> {
    if let Some(parts) = value.pointer("/status/message/parts").and_then(Value::as_array) {
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        return Some(parse_embedded(&text));
    }

    // Only peel `result` when it is the sole key, so a payload that happens
    // to carry a "result" field is left alone.
    let obj = value.as_object()?;
    if obj.len() == 1 {
        if let Some(result) = obj.get("result") {
            return Some(match result {
                Value::String(s) => parse_embedded(s),
                other => other.clone(),
            });
        }
    }
    None
}

/// JSON embedded in text (possibly fenced or surrounded by chatter), or the
/// text itself when there is none.
fn parse_embedded(text: &str) -> Value {
    extract_json(text).unwrap_or_else(|| Value::String(text.trim().to_string()))
}

/// Parse a raw reply body into a typed decision of the expected kind.
pub fn parse_decision(kind: DecisionKind, body: &str) -> Result<Decision, AgentError> {
    if body.trim().is_empty() {
        return Err(AgentError::EmptyReply);
    }

    let raw: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => parse_embedded(body),
    };

    match (kind, unwrap_envelope(raw)) {
        (DecisionKind::Comment, Value::String(text)) => {
            Ok(Decision::Comment(CommentReply { text }))
        }
        (DecisionKind::Pick, Value::String(text)) => Err(AgentError::Malformed(format!(
            "pick reply carried no JSON object: {text:.80}"
        ))),
        (DecisionKind::Pick, value) => serde_json::from_value(value)
            .map(Decision::Pick)
            .map_err(|e| AgentError::Malformed(e.to_string())),
        (DecisionKind::Comment, value) => serde_json::from_value(value)
            .map(Decision::Comment)
            .map_err(|e| AgentError::Malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::player::{test_player, Position};
    use serde_json::json;

    #[test]
    fn bare_pick_reply() {
        let body = r#"{"player_name":"Tyreek Hill","reasoning":"Speed kills.","trash_talk":"RBs break."}"#;
        let reply = parse_decision(DecisionKind::Pick, body).unwrap().into_pick().unwrap();
        assert_eq!(reply.player_name, "Tyreek Hill");
        assert_eq!(reply.trash_talk.as_deref(), Some("RBs break."));
    }

    #[test]
    fn pick_reply_without_trash_talk() {
        let body = r#"{"player_name":"Tyreek Hill","reasoning":"Speed kills."}"#;
        let reply = parse_decision(DecisionKind::Pick, body).unwrap().into_pick().unwrap();
        assert_eq!(reply.trash_talk, None);
    }

    #[test]
    fn status_message_parts_envelope() {
        let inner = r#"{"player_name":"CeeDee Lamb","reasoning":"Target hog."}"#;
        let body = json!({
            "status": { "message": { "parts": [ { "kind": "text", "text": inner } ] } }
        })
        .to_string();
        let reply = parse_decision(DecisionKind::Pick, &body).unwrap().into_pick().unwrap();
        assert_eq!(reply.player_name, "CeeDee Lamb");
    }

    #[test]
    fn result_envelope_with_object_and_with_string() {
        let body = json!({ "result": { "text": "Bold move." } }).to_string();
        let reply = parse_decision(DecisionKind::Comment, &body)
            .unwrap()
            .into_comment()
            .unwrap();
        assert_eq!(reply.text, "Bold move.");

        let body = json!({ "result": "{\"text\":\"Reach of the year.\"}" }).to_string();
        let reply = parse_decision(DecisionKind::Comment, &body)
            .unwrap()
            .into_comment()
            .unwrap();
        assert_eq!(reply.text, "Reach of the year.");
    }

    #[test]
    fn nested_envelopes_are_peeled() {
        let inner = json!({ "result": { "text": "Enjoy the bench." } }).to_string();
        let body = json!({
            "status": { "message": { "parts": [ { "text": inner } ] } }
        })
        .to_string();
        let reply = parse_decision(DecisionKind::Comment, &body)
            .unwrap()
            .into_comment()
            .unwrap();
        assert_eq!(reply.text, "Enjoy the bench.");
    }

    #[test]
    fn plain_text_comment_is_accepted() {
        let body = json!({
            "status": { "message": { "parts": [ { "text": "Who needs RBs anyway?" } ] } }
        })
        .to_string();
        let reply = parse_decision(DecisionKind::Comment, &body)
            .unwrap()
            .into_comment()
            .unwrap();
        assert_eq!(reply.text, "Who needs RBs anyway?");
    }

    #[test]
    fn pick_without_json_is_malformed() {
        let err = parse_decision(DecisionKind::Pick, "I pick whoever").unwrap_err();
        assert!(matches!(err, AgentError::Malformed(_)));
        let err = parse_decision(DecisionKind::Pick, r#"{"reasoning":"no name"}"#).unwrap_err();
        assert!(matches!(err, AgentError::Malformed(_)));
    }

    #[test]
    fn empty_body_is_empty_reply() {
        assert!(matches!(
            parse_decision(DecisionKind::Comment, "  "),
            Err(AgentError::EmptyReply)
        ));
    }

    #[test]
    fn kind_mismatch_is_malformed() {
        let decision = Decision::Comment(CommentReply { text: "hi".into() });
        assert!(matches!(decision.into_pick(), Err(AgentError::Malformed(_))));
    }

    #[test]
    fn pick_request_serializes_to_flat_contract() {
        let req = PickRequest {
            team_id: 1,
            strategy: StrategyTag::ZeroRB,
            round: 2,
            pick_number: 12,
            own_picks: vec!["Justin Jefferson (WR)".into()],
            candidates: vec![test_player("Tyreek Hill", Position::WR, 3.0)],
            recent_history: vec!["Team 3 -> Team 1: enjoy the bench".into()],
            rival_context: Some("Team 3 (Robust RB)".into()),
            retry_note: None,
        };
        let value = serde_json::to_value(DecisionRequest::for_pick(&req)).unwrap();
        assert_eq!(value["kind"], "pick");
        assert_eq!(value["strategy_tag"], "ZeroRB");
        assert_eq!(value["available_players"], json!(["Tyreek Hill"]));
        assert_eq!(value["rival_context"], "Team 3 (Robust RB)");
        assert!(value.get("retry_note").is_none());

        let back: DecisionRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, DecisionRequest::for_pick(&req));
    }
}
