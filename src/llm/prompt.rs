// Prompt templates for pick decisions and draft-room commentary.
//
// Prompts carry the whole decision context (strategy, candidates, history)
// so that a single stateless completion is enough. Replies are requested as
// JSON but parsed tolerantly, since models like to wrap JSON in prose or
// code fences.

use serde_json::Value;

use crate::agent::{CommentRequest, PickRequest, MAX_COMMENT_CHARS};
use crate::agent::strategy::StrategyTag;
use crate::draft::player::Player;

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// System prompt for a team's manager persona.
pub fn system_prompt(team_id: u8, strategy: StrategyTag) -> String {
    format!(
        "You are Team {team_id}, a fantasy football manager in a snake-format \
         mock draft. Your strategy: {}.\n\
         {}\n\
         \n\
         Stay in character. Be confident, competitive, and brief. \
         Never quote raw ADP numbers like \"12.4\"; say \"first-round talent\" \
         or \"a top-5 pick\" instead.",
        strategy.label(),
        strategy.philosophy(),
    )
}

// ---------------------------------------------------------------------------
// Pick prompt
// ---------------------------------------------------------------------------

/// Build the prompt asking a team to choose one of its candidates.
pub fn build_pick_prompt(req: &PickRequest) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!(
        "## ON THE CLOCK\nRound {} | Overall pick #{}\n\n",
        req.round, req.pick_number
    ));

    prompt.push_str("## YOUR ROSTER\n");
    prompt.push_str(&format_list(&req.own_picks, "None yet"));
    prompt.push('\n');

    prompt.push_str("## AVAILABLE (best first)\n");
    for (i, player) in req.candidates.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, describe_player(player)));
    }
    prompt.push('\n');

    push_context(&mut prompt, &req.recent_history, req.rival_context.as_deref());

    if let Some(note) = &req.retry_note {
        prompt.push_str(&format!("## NOTE\n{note}\n\n"));
    }

    prompt.push_str(
        "Choose exactly one player from the AVAILABLE list. Reply with JSON only:\n\
         {\"player_name\": \"<exact name from the list>\", \
         \"reasoning\": \"<1-2 sentences on why this fits your strategy>\", \
         \"trash_talk\": \"<optional one-liner at the other teams, or empty>\"}",
    );
    prompt
}

// ---------------------------------------------------------------------------
// Comment prompt
// ---------------------------------------------------------------------------

/// Build the prompt asking a team to react to another team's pick.
pub fn build_comment_prompt(req: &CommentRequest) -> String {
    let mut prompt = String::with_capacity(768);

    prompt.push_str(&format!(
        "## THE PICK\n{} just took {} with pick #{} (round {}).\n\n",
        req.target_name,
        describe_player(&req.target_player),
        req.pick_number,
        req.round
    ));

    prompt.push_str("## YOUR ROSTER\n");
    prompt.push_str(&format_list(&req.own_picks, "None yet"));
    prompt.push('\n');

    if !req.available.is_empty() {
        let names: Vec<String> = req.available.iter().map(|p| p.label()).collect();
        prompt.push_str(&format!("## STILL ON THE BOARD\n{}\n\n", names.join(", ")));
    }

    push_context(&mut prompt, &req.recent_history, req.rival_context.as_deref());

    prompt.push_str(&format!(
        "React to this pick in one or two sentences (under {MAX_COMMENT_CHARS} characters). \
         Trash talk is encouraged if it clashes with your philosophy. \
         Reply with the comment text only."
    ));
    prompt
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

/// Natural-language description of a player without raw ADP figures.
fn describe_player(player: &Player) -> String {
    let rank = player.adp.round().max(1.0) as u32;
    let standing = match rank {
        1..=3 => "an elite top-3 pick".to_string(),
        4..=12 => "first-round talent".to_string(),
        13..=24 => "an early second-round talent".to_string(),
        _ => format!("usually drafted around pick {rank}"),
    };
    let mut out = format!(
        "{} ({}, {}) - {}, tier {}, {:.1} PPG last season",
        player.name, player.position, player.team, standing, player.tier, player.ppg
    );
    if player.upside {
        out.push_str(", boom-or-bust upside");
    }
    out
}

fn format_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        format!("{empty}\n")
    } else {
        format!("{}\n", items.join(", "))
    }
}

fn push_context(prompt: &mut String, history: &[String], rival_context: Option<&str>) {
    if let Some(rivals) = rival_context {
        prompt.push_str(&format!("## RIVALS\n{rivals}\n\n"));
    }
    if !history.is_empty() {
        prompt.push_str("## RECENT CONVERSATION\n");
        for line in history {
            prompt.push_str(&format!("- {line}\n"));
        }
        prompt.push('\n');
    }
}

/// Find the first JSON object embedded in `text`, tolerating code fences
/// and surrounding prose.
pub fn extract_json(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Value>()
            .next()
            .and_then(Result::ok)
            .filter(Value::is_object)
    })
}
