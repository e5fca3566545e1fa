// Integration tests for the mock draft.
//
// These drive whole drafts through the library's public API: the session
// state machine with in-process agents, scripted reasoners, remote agents
// behind wiremock, and a real agent server on an ephemeral port.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mock_draft::agent::fallback::FallbackAgent;
use mock_draft::agent::local::{LocalAgent, TokenLimits};
use mock_draft::agent::remote::RemoteAgent;
use mock_draft::agent::server::{self, AgentServerState};
use mock_draft::agent::strategy::StrategyTag;
use mock_draft::agent::{
    AgentError, AgentRoster, CommentRequest, DecisionAgent, PickDecision, PickRequest,
};
use mock_draft::draft::board::TeamState;
use mock_draft::draft::order::slot_on_clock;
use mock_draft::draft::pick::Pick;
use mock_draft::draft::player::{Player, PlayerPool, Position};
use mock_draft::llm::{LlmError, Reasoner};
use mock_draft::orchestrator::commentary::{CommentPolicy, MAX_COMMENTERS};
use mock_draft::orchestrator::{self, Advance, DraftPhase, DraftSession, DraftSettings};
use mock_draft::protocol::DraftEvent;

use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ===========================================================================
// Test helpers
// ===========================================================================

fn player(name: &str, position: Position, adp: f64) -> Player {
    Player {
        name: name.to_string(),
        position,
        team: "FA".to_string(),
        adp,
        tier: 1,
        ppg: 12.0,
        upside: false,
    }
}

/// Six players with ADP 1..6: A(RB) B(WR) C(WR) D(QB) E(TE) F(RB).
fn lettered_pool() -> PlayerPool {
    PlayerPool::from_players(vec![
        player("A", Position::RB, 1.0),
        player("B", Position::WR, 2.0),
        player("C", Position::WR, 3.0),
        player("D", Position::QB, 4.0),
        player("E", Position::TE, 5.0),
        player("F", Position::RB, 6.0),
    ])
}

fn heuristic() -> Arc<LocalAgent> {
    Arc::new(LocalAgent::heuristic())
}

fn drain(rx: &mut mpsc::Receiver<DraftEvent>) -> Vec<DraftEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn names(picks: &[Pick]) -> Vec<String> {
    picks.iter().map(|p| p.player.name.clone()).collect()
}

/// Run agent turns until the draft completes. Panics if a human is up.
async fn run_to_completion(session: &mut DraftSession, tx: &mpsc::Sender<DraftEvent>) {
    loop {
        match session.advance(tx).await.unwrap() {
            Advance::Picked(_) => {}
            Advance::Complete(_) => break,
            Advance::AwaitingHuman { slot, .. } => panic!("unexpected human turn for {slot}"),
        }
    }
}

/// Asks every team, including the picker and the human, to comment.
struct EveryonePolicy;

impl CommentPolicy for EveryonePolicy {
    fn select(&self, _pick: &Pick, teams: &[TeamState]) -> Vec<u8> {
        teams.iter().map(|t| t.slot).collect()
    }
}

/// Heuristic agent that counts comment requests.
struct CountingAgent {
    inner: LocalAgent,
    comments: AtomicUsize,
}

#[async_trait]
impl DecisionAgent for CountingAgent {
    async fn request_pick(&self, request: &PickRequest) -> Result<PickDecision, AgentError> {
        self.inner.request_pick(request).await
    }

    async fn request_comment(&self, request: &CommentRequest) -> Result<String, AgentError> {
        self.comments.fetch_add(1, Ordering::SeqCst);
        self.inner.request_comment(request).await
    }
}

/// Replays canned completions in order and records every prompt.
struct ScriptedReasoner {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoner {
    fn new(replies: &[&str]) -> Self {
        ScriptedReasoner {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Reasoner for ScriptedReasoner {
    async fn complete(&self, _system: &str, prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(LlmError::NoReply)
    }
}

// ===========================================================================
// Orchestrator end-to-end
// ===========================================================================

#[tokio::test]
async fn six_team_single_round_with_human_in_slot_four() {
    let settings = DraftSettings::new(6, 1, vec![StrategyTag::BestPlayerAvailable; 6], Some(4));
    let mut session =
        orchestrator::start(settings, lettered_pool(), AgentRoster::new(heuristic())).unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    for expected in ["A", "B", "C"] {
        let Advance::Picked(pick) = session.advance(&tx).await.unwrap() else {
            panic!("expected an agent pick");
        };
        assert_eq!(pick.player.name, expected);
    }

    let Advance::AwaitingHuman {
        slot, available, ..
    } = session.advance(&tx).await.unwrap()
    else {
        panic!("expected the human to be on the clock");
    };
    assert_eq!(slot, 4);
    let offered: HashSet<String> = available.into_iter().map(|p| p.name).collect();
    assert_eq!(offered, HashSet::from(["D".into(), "E".into(), "F".into()]));
    assert_eq!(session.phase(), DraftPhase::AwaitingHumanInput { slot: 4 });

    let pick = session.submit_human_pick("E", &tx).await.unwrap();
    assert_eq!((pick.team, pick.overall), (4, 4));

    run_to_completion(&mut session, &tx).await;
    assert_eq!(names(session.board().picks()), vec!["A", "B", "C", "E", "D", "F"]);
    assert_eq!(session.phase(), DraftPhase::Complete);

    let events = drain(&mut rx);
    let n = events.len();
    assert_eq!(events[n - 2], DraftEvent::RoundComplete { round: 1 });
    assert_eq!(events[n - 1], DraftEvent::DraftComplete { total_picks: 6 });
}

#[tokio::test]
async fn events_for_one_pick_arrive_in_order() {
    let settings = DraftSettings::new(3, 1, vec![StrategyTag::ZeroRB; 3], None);
    let mut session =
        orchestrator::start(settings, lettered_pool(), AgentRoster::new(heuristic())).unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    session.advance(&tx).await.unwrap();
    let events = drain(&mut rx);

    assert!(matches!(
        events[0],
        DraftEvent::OnTheClock {
            overall: 1,
            team: 1,
            ..
        }
    ));
    assert!(matches!(&events[1], DraftEvent::PickMade { pick, .. } if pick.team == 1));
    let comments: Vec<u8> = events[2..]
        .iter()
        .map(|e| match e {
            DraftEvent::Comment(c) => c.from,
            other => panic!("unexpected event after pick: {other:?}"),
        })
        .collect();
    assert_eq!(comments, vec![2, 3]);
}

#[tokio::test]
async fn default_league_drafts_snake_order_without_repeats() {
    let strategies = vec![
        StrategyTag::ZeroRB,
        StrategyTag::BestPlayerAvailable,
        StrategyTag::RobustRB,
        StrategyTag::UserControlled,
        StrategyTag::UpsideHunter,
        StrategyTag::BestPlayerAvailable,
    ];
    let settings = DraftSettings::new(6, 3, strategies, Some(4));
    let pool = PlayerPool::builtin().unwrap();
    let mut session = orchestrator::start(settings, pool, AgentRoster::new(heuristic())).unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    let mut human_turns = 0;
    loop {
        match session.advance(&tx).await.unwrap() {
            Advance::Picked(_) => {}
            Advance::Complete(_) => break,
            Advance::AwaitingHuman { available, .. } => {
                human_turns += 1;
                session
                    .submit_human_pick(&available[0].name, &tx)
                    .await
                    .unwrap();
            }
        }
    }
    drain(&mut rx);

    let picks = session.board().picks();
    assert_eq!(picks.len(), 18);
    assert_eq!(human_turns, 3);
    let unique: HashSet<&str> = picks.iter().map(|p| p.player.name.as_str()).collect();
    assert_eq!(unique.len(), 18);
    for pick in picks {
        assert_eq!(pick.team, slot_on_clock(pick.overall, 6));
    }

    // Zero RB avoids backs through its window; Robust RB takes only backs.
    let summary = session.summary();
    assert!(summary.teams[0]
        .picks
        .iter()
        .all(|p| p.player.position != Position::RB));
    assert!(summary.teams[2]
        .picks
        .iter()
        .take(2)
        .all(|p| p.player.position == Position::RB));
    assert_eq!(summary.total_picks(), 18);
}

#[tokio::test]
async fn comments_never_exceed_cap_or_come_from_picker_or_human() {
    let counting = Arc::new(CountingAgent {
        inner: LocalAgent::heuristic(),
        comments: AtomicUsize::new(0),
    });
    let settings = DraftSettings::new(5, 2, vec![StrategyTag::BestPlayerAvailable; 5], Some(5));
    let pool = PlayerPool::builtin().unwrap();
    let mut session = DraftSession::new(settings, pool, AgentRoster::new(counting.clone()))
        .unwrap()
        .with_policy(EveryonePolicy);
    session.start().unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    loop {
        match session.advance(&tx).await.unwrap() {
            Advance::Picked(_) => {}
            Advance::Complete(_) => break,
            Advance::AwaitingHuman { available, .. } => {
                session
                    .submit_human_pick(&available[0].name, &tx)
                    .await
                    .unwrap();
            }
        }
    }

    let mut picker = 0;
    let mut per_pick = 0;
    let mut total = 0;
    for event in drain(&mut rx) {
        match event {
            DraftEvent::PickMade { pick, .. } => {
                picker = pick.team;
                per_pick = 0;
            }
            DraftEvent::Comment(comment) => {
                per_pick += 1;
                total += 1;
                assert!(per_pick <= MAX_COMMENTERS);
                assert_ne!(comment.from, picker);
                assert_ne!(comment.from, 5);
            }
            _ => {}
        }
    }
    assert_eq!(total, 10 * MAX_COMMENTERS);
    assert_eq!(counting.comments.load(Ordering::SeqCst), total);
}

#[tokio::test]
async fn reasoner_gets_a_retry_note_after_naming_an_unavailable_player() {
    let reasoner = Arc::new(ScriptedReasoner::new(&[
        r#"{"player_name": "Tom Brady", "reasoning": "GOAT."}"#,
        r#"Fine. {"player_name": "CeeDee Lamb", "reasoning": "Target hog.", "trash_talk": "Enjoy my leftovers."}"#,
        r#"{"text": "Bold."}"#,
        r#"{"player_name": "Justin Jefferson", "reasoning": "WR1 falls to me."}"#,
        r#"{"text": "We'll see."}"#,
    ]));
    let agent = LocalAgent::new(Some(reasoner.clone()), TokenLimits::default());
    let settings = DraftSettings::new(2, 1, vec![StrategyTag::BestPlayerAvailable; 2], None);
    let mut session = orchestrator::start(
        settings,
        PlayerPool::builtin().unwrap(),
        AgentRoster::new(Arc::new(agent)),
    )
    .unwrap();
    let (tx, _rx) = mpsc::channel(1024);

    run_to_completion(&mut session, &tx).await;

    let picks = session.board().picks();
    assert_eq!(names(picks), vec!["CeeDee Lamb", "Justin Jefferson"]);
    assert_eq!(picks[0].reasoning.as_deref(), Some("Target hog."));
    assert_eq!(picks[0].trash_talk.as_deref(), Some("Enjoy my leftovers."));

    let prompts = reasoner.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 5);
    assert!(!prompts[0].contains("Tom Brady"));
    assert!(prompts[1].contains("Tom Brady"));

    assert!(session
        .history(2)
        .contains(&"Team 1 -> ALL: Enjoy my leftovers.".to_string()));
    assert!(session
        .history(1)
        .contains(&"Team 2 -> Team 1: Bold.".to_string()));
}

#[tokio::test]
async fn silent_reasoner_falls_back_to_best_by_adp() {
    let reasoner = Arc::new(ScriptedReasoner::new(&[]));
    let agent = LocalAgent::new(Some(reasoner), TokenLimits::default());
    let settings = DraftSettings::new(2, 1, vec![StrategyTag::ZeroRB; 2], None);
    let mut session = orchestrator::start(
        settings,
        PlayerPool::builtin().unwrap(),
        AgentRoster::new(Arc::new(agent)),
    )
    .unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    run_to_completion(&mut session, &tx).await;

    // The overall best player, even though Zero RB would never offer him.
    let first = &session.board().picks()[0];
    assert_eq!(first.player.name, "Christian McCaffrey");
    assert!(first.reasoning.as_deref().unwrap().starts_with("Auto-pick"));
    assert!(!drain(&mut rx)
        .iter()
        .any(|e| matches!(e, DraftEvent::Comment(_))));
}

// ===========================================================================
// Remote agents
// ===========================================================================

#[tokio::test]
async fn slow_remote_agent_falls_back_to_local_agent() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/decision"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"player_name": "Josh Allen", "reasoning": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock)
        .await;

    let local = heuristic();
    let remote = RemoteAgent::new(mock.uri(), Duration::from_millis(100));
    let roster = AgentRoster::new(local.clone())
        .with_seat(1, Arc::new(FallbackAgent::new(remote, local)));
    let settings = DraftSettings::new(2, 1, vec![StrategyTag::BestPlayerAvailable; 2], None);
    let mut session =
        orchestrator::start(settings, PlayerPool::builtin().unwrap(), roster).unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    run_to_completion(&mut session, &tx).await;

    let first = &session.board().picks()[0];
    assert_eq!(first.player.name, "Christian McCaffrey");
    assert!(!first.reasoning.as_deref().unwrap().starts_with("Auto-pick"));
    // Team 1's comment on pick 2 also came from the fallback.
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, DraftEvent::Comment(c) if c.from == 1)));
}

#[tokio::test]
async fn draft_against_live_agent_server() {
    let pool = PlayerPool::builtin().unwrap();
    let server = server::start(
        "127.0.0.1:0",
        AgentServerState {
            slot: 2,
            agent: heuristic(),
            pool: Arc::new(pool.clone()),
        },
    )
    .await
    .unwrap();

    let remote = RemoteAgent::new(server.url(), Duration::from_secs(5));
    assert!(remote.is_healthy().await);
    let roster = AgentRoster::new(heuristic()).with_seat(2, Arc::new(remote));
    let settings = DraftSettings::new(
        3,
        2,
        vec![
            StrategyTag::ZeroRB,
            StrategyTag::RobustRB,
            StrategyTag::UpsideHunter,
        ],
        None,
    );
    let mut session = orchestrator::start(settings, pool, roster).unwrap();
    let (tx, mut rx) = mpsc::channel(1024);

    run_to_completion(&mut session, &tx).await;

    let team2 = &session.summary().teams[1];
    assert_eq!(team2.picks.len(), 2);
    assert!(team2
        .picks
        .iter()
        .all(|p| p.player.position == Position::RB));
    assert!(team2
        .picks
        .iter()
        .all(|p| !p.reasoning.as_deref().unwrap_or("").starts_with("Auto-pick")));
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, DraftEvent::Comment(c) if c.from == 2)));

    server.shutdown();
}
