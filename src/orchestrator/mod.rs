// Turn orchestrator: drives a snake draft one pick at a time.
//
// The session owns the board outright. Agents are handed snapshots
// (candidates, history, own picks) and never see the live board. Every
// observable step is emitted as a `DraftEvent` on the caller's channel, with
// an injectable pacer between events.

pub mod commentary;
pub mod pacing;

use std::collections::{HashMap, HashSet, VecDeque};

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::agent::strategy::StrategyTag;
use crate::agent::{AgentError, AgentRoster, CommentRequest, PickDecision, PickRequest};
use crate::draft::board::{BoardError, DraftBoard, DraftSummary};
use crate::draft::order;
use crate::draft::pick::{Comment, CommentTarget, Pick};
use crate::draft::player::{best_by_position, resolve_player, top_by_adp, Player, PlayerPool};
use crate::protocol::DraftEvent;
use commentary::{CommentPolicy, RivalryPolicy, MAX_COMMENTERS};
use pacing::{NoPacing, Pacer};

/// Players shown to commenters for perspective.
const COMMENT_BOARD_PREVIEW: usize = 5;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no players left to draft at pick #{pick}")]
    EmptyAvailablePool { pick: u32 },

    #[error("{message}")]
    HumanInputInvalid { input: String, message: String },

    #[error("not waiting for a human pick")]
    NotAwaitingHuman,

    #[error("the draft is complete")]
    Complete,

    #[error("the draft has not started")]
    NotStarted,

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("invalid draft settings: {0}")]
    InvalidSettings(String),
}

// ---------------------------------------------------------------------------
// Settings and phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DraftSettings {
    pub num_teams: u8,
    pub num_rounds: u32,
    /// Strategy per slot, indexed by `slot - 1`.
    pub strategies: Vec<StrategyTag>,
    /// Slot driven by a human. Forced to `UserControlled`.
    pub human_slot: Option<u8>,
    /// Most candidates offered to an agent per pick.
    pub candidate_limit: usize,
    /// Lines of conversation each team remembers.
    pub history_window: usize,
}

impl DraftSettings {
    pub fn new(
        num_teams: u8,
        num_rounds: u32,
        strategies: Vec<StrategyTag>,
        human_slot: Option<u8>,
    ) -> Self {
        DraftSettings {
            num_teams,
            num_rounds,
            strategies,
            human_slot,
            candidate_limit: 10,
            history_window: 5,
        }
    }

    pub fn total_picks(&self) -> u32 {
        u32::from(self.num_teams) * self.num_rounds
    }

    /// Check the settings against a catalog of `pool_size` players.
    pub fn validate(&self, pool_size: usize) -> Result<(), DraftError> {
        let invalid = |msg: String| Err(DraftError::InvalidSettings(msg));

        if self.num_teams < 2 {
            return invalid(format!("need at least 2 teams, got {}", self.num_teams));
        }
        if self.num_rounds == 0 {
            return invalid("need at least 1 round".into());
        }
        if self.strategies.len() != usize::from(self.num_teams) {
            return invalid(format!(
                "{} strategies assigned for {} teams",
                self.strategies.len(),
                self.num_teams
            ));
        }
        if let Some(slot) = self.human_slot {
            if slot == 0 || slot > self.num_teams {
                return invalid(format!(
                    "human slot {slot} outside 1..={}",
                    self.num_teams
                ));
            }
        }
        if self.candidate_limit == 0 {
            return invalid("candidate_limit must be at least 1".into());
        }
        if self.total_picks() as usize > pool_size {
            return invalid(format!(
                "{} picks needed but only {pool_size} players in the pool",
                self.total_picks()
            ));
        }
        Ok(())
    }
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPhase {
    NotStarted,
    InProgress,
    /// Suspended until the human in `slot` picks.
    AwaitingHumanInput { slot: u8 },
    Complete,
    /// The pool ran dry before `pick`. Terminal.
    Failed { pick: u32 },
}

/// Result of one `advance` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// An agent pick was committed.
    Picked(Pick),
    /// The human is on the clock.
    AwaitingHuman {
        slot: u8,
        available: Vec<Player>,
        /// Best available player at each position.
        advice: Vec<Player>,
    },
    Complete(DraftSummary),
}

// ---------------------------------------------------------------------------
// DraftSession
// ---------------------------------------------------------------------------

pub struct DraftSession {
    settings: DraftSettings,
    pool: PlayerPool,
    board: DraftBoard,
    phase: DraftPhase,
    agents: AgentRoster,
    policy: Box<dyn CommentPolicy>,
    pacer: Box<dyn Pacer>,
    /// Recent lines each team has said or heard, oldest first.
    memory: HashMap<u8, VecDeque<String>>,
}

/// Validate settings, build a session, and start it.
pub fn start(
    settings: DraftSettings,
    pool: PlayerPool,
    agents: AgentRoster,
) -> Result<DraftSession, DraftError> {
    let mut session = DraftSession::new(settings, pool, agents)?;
    session.start()?;
    Ok(session)
}

impl DraftSession {
    /// Build a session in `NotStarted`. The human slot, if any, is forced to
    /// `UserControlled`.
    pub fn new(
        mut settings: DraftSettings,
        pool: PlayerPool,
        agents: AgentRoster,
    ) -> Result<Self, DraftError> {
        settings.validate(pool.len())?;
        if let Some(slot) = settings.human_slot {
            settings.strategies[usize::from(slot) - 1] = StrategyTag::UserControlled;
        }

        let board = DraftBoard::new(&settings.strategies);
        Ok(DraftSession {
            settings,
            pool,
            board,
            phase: DraftPhase::NotStarted,
            agents,
            policy: Box::new(RivalryPolicy::default()),
            pacer: Box::new(NoPacing),
            memory: HashMap::new(),
        })
    }

    pub fn with_policy(mut self, policy: impl CommentPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// `NotStarted -> InProgress`.
    pub fn start(&mut self) -> Result<(), DraftError> {
        match self.phase {
            DraftPhase::NotStarted => {
                info!(
                    teams = self.settings.num_teams,
                    rounds = self.settings.num_rounds,
                    human_slot = ?self.settings.human_slot,
                    "draft started"
                );
                self.phase = DraftPhase::InProgress;
                Ok(())
            }
            DraftPhase::Complete => Err(DraftError::Complete),
            DraftPhase::Failed { pick } => Err(DraftError::EmptyAvailablePool { pick }),
            _ => Ok(()),
        }
    }

    pub fn phase(&self) -> DraftPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase == DraftPhase::Complete
    }

    pub fn settings(&self) -> &DraftSettings {
        &self.settings
    }

    pub fn board(&self) -> &DraftBoard {
        &self.board
    }

    /// Players not yet drafted, in ADP order.
    pub fn available(&self) -> Vec<Player> {
        self.pool.available(&self.board)
    }

    /// Per-team ordered pick lists.
    pub fn summary(&self) -> DraftSummary {
        self.board.summary()
    }

    /// What `slot` remembers of the conversation, oldest first.
    pub fn history(&self, slot: u8) -> Vec<String> {
        self.memory
            .get(&slot)
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Control surface
    // -----------------------------------------------------------------------

    /// Make the next pick, or report that the human is on the clock or the
    /// draft is over. Calling again while awaiting the human repeats the
    /// signal without emitting anything.
    ///
    /// Events are sent with `Sender::send`, which waits while the channel is
    /// full. The receiver must be drained concurrently (a spawned task, as
    /// `mockdraft run` does), or sized to hold a whole turn's events.
    /// Draining it from the task that awaits `advance` deadlocks once the
    /// buffer fills.
    ///
    /// Once the pool runs dry the session is `Failed` and every later call
    /// returns `EmptyAvailablePool` again.
    pub async fn advance(
        &mut self,
        events: &mpsc::Sender<DraftEvent>,
    ) -> Result<Advance, DraftError> {
        match self.phase {
            DraftPhase::NotStarted => return Err(DraftError::NotStarted),
            DraftPhase::Complete => return Ok(Advance::Complete(self.summary())),
            DraftPhase::Failed { pick } => return Err(DraftError::EmptyAvailablePool { pick }),
            DraftPhase::AwaitingHumanInput { slot } => {
                let available = self.available();
                let advice = best_by_position(&available);
                return Ok(Advance::AwaitingHuman {
                    slot,
                    available,
                    advice,
                });
            }
            DraftPhase::InProgress => {}
        }

        let overall = self.board.next_pick_number();
        let num_teams = u32::from(self.settings.num_teams);
        let slot = order::slot_on_clock(overall, num_teams);
        let round = order::round_of(overall, num_teams);
        let pick_in_round = order::pick_in_round(overall, num_teams);
        let strategy = self
            .board
            .team(slot)
            .map(|t| t.strategy)
            .ok_or(BoardError::UnknownTeam { slot })?;

        let available = self.available();
        let Some(best) = available.first().cloned() else {
            error!(overall, "player pool exhausted mid-draft");
            self.phase = DraftPhase::Failed { pick: overall };
            return Err(DraftError::EmptyAvailablePool { pick: overall });
        };

        self.emit(
            events,
            DraftEvent::OnTheClock {
                round,
                pick_in_round,
                overall,
                team: slot,
                team_name: self.team_name(slot),
            },
        )
        .await;

        if !strategy.is_agent() {
            self.phase = DraftPhase::AwaitingHumanInput { slot };
            info!(slot, overall, "awaiting human pick");
            let advice = best_by_position(&available);
            self.emit(
                events,
                DraftEvent::AwaitingHuman {
                    team: slot,
                    overall,
                    available: available.clone(),
                    advice: advice.clone(),
                },
            )
            .await;
            return Ok(Advance::AwaitingHuman {
                slot,
                available,
                advice,
            });
        }

        let decision = self
            .decide_agent_pick(slot, strategy, round, overall, &available, best)
            .await;
        let pick = Pick {
            round,
            pick_in_round,
            overall,
            team: slot,
            player: decision.player,
            reasoning: Some(decision.reasoning),
            trash_talk: decision.trash_talk,
        };
        self.commit(pick.clone(), events).await?;
        Ok(Advance::Picked(pick))
    }

    /// Resume a suspended draft with the human's choice.
    ///
    /// An unresolvable name leaves the session awaiting input and returns
    /// `HumanInputInvalid`; there is no fallback for humans. Events follow
    /// the same delivery rules as [`DraftSession::advance`].
    pub async fn submit_human_pick(
        &mut self,
        player_name: &str,
        events: &mpsc::Sender<DraftEvent>,
    ) -> Result<Pick, DraftError> {
        let slot = match self.phase {
            DraftPhase::AwaitingHumanInput { slot } => slot,
            DraftPhase::NotStarted => return Err(DraftError::NotStarted),
            DraftPhase::Complete => return Err(DraftError::Complete),
            DraftPhase::Failed { pick } => return Err(DraftError::EmptyAvailablePool { pick }),
            DraftPhase::InProgress => return Err(DraftError::NotAwaitingHuman),
        };

        let available = self.available();
        let Some(player) = resolve_player(player_name, &available).cloned() else {
            let input = player_name.trim().to_string();
            let message = if input.is_empty() {
                "Enter a player name.".to_string()
            } else {
                format!("{input} is not available. Try again.")
            };
            warn!(slot, input = %input, "rejected human pick");
            self.emit(
                events,
                DraftEvent::HumanInputRejected {
                    input: input.clone(),
                    message: message.clone(),
                },
            )
            .await;
            return Err(DraftError::HumanInputInvalid { input, message });
        };

        let overall = self.board.next_pick_number();
        let num_teams = u32::from(self.settings.num_teams);
        let pick = Pick {
            round: order::round_of(overall, num_teams),
            pick_in_round: order::pick_in_round(overall, num_teams),
            overall,
            team: slot,
            player,
            reasoning: None,
            trash_talk: None,
        };
        self.commit(pick.clone(), events).await?;
        Ok(pick)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Ask the seat's agent, retry once with a note, then fall back to the
    /// best player by ADP. Never fails.
    ///
    /// A decision only counts if it names a player in `available`; the
    /// committed player is the pool's own record.
    async fn decide_agent_pick(
        &self,
        slot: u8,
        strategy: StrategyTag,
        round: u32,
        overall: u32,
        available: &[Player],
        best: Player,
    ) -> PickDecision {
        let mut request = PickRequest {
            team_id: slot,
            strategy,
            round,
            pick_number: overall,
            own_picks: self.own_picks(slot),
            candidates: strategy.candidates(round, available, self.settings.candidate_limit),
            recent_history: self.history(slot),
            rival_context: self.policy.rival_context(slot, self.board.teams()),
            retry_note: None,
        };
        let agent = self.agents.for_slot(slot);

        for attempt in 1..=2 {
            let err = match agent.request_pick(&request).await {
                Ok(decision) => match available
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(&decision.player.name))
                {
                    Some(player) => {
                        return PickDecision {
                            player: player.clone(),
                            ..decision
                        }
                    }
                    None => AgentError::InvalidSelection {
                        name: decision.player.name,
                    },
                },
                Err(err) => err,
            };
            warn!(slot, overall, attempt, error = %err, "unusable pick decision");
            request.retry_note = Some(retry_note(&err));
        }

        warn!(slot, overall, player = %best.name, "falling back to best available by ADP");
        PickDecision {
            reasoning: format!(
                "Auto-pick: {} was the best player available by ADP.",
                best.name
            ),
            player: best,
            trash_talk: None,
        }
    }

    /// Commit `pick` and emit everything that follows from it.
    async fn commit(
        &mut self,
        pick: Pick,
        events: &mpsc::Sender<DraftEvent>,
    ) -> Result<(), DraftError> {
        self.board.record_pick(pick.clone())?;
        let total = self.settings.total_picks();
        self.phase = if pick.overall >= total {
            DraftPhase::Complete
        } else {
            DraftPhase::InProgress
        };
        info!(
            overall = pick.overall,
            team = pick.team,
            player = %pick.player.name,
            "pick recorded"
        );

        if let Some(talk) = &pick.trash_talk {
            let line = Comment {
                from: pick.team,
                to: CommentTarget::All,
                text: talk.clone(),
            }
            .history_line();
            for slot in 1..=self.settings.num_teams {
                self.remember(slot, line.clone());
            }
        }

        self.emit(
            events,
            DraftEvent::PickMade {
                pick: pick.clone(),
                team_name: self.team_name(pick.team),
            },
        )
        .await;

        let comments = self.collect_comments(&pick).await;
        for comment in comments {
            let line = comment.history_line();
            self.remember(comment.from, line.clone());
            self.remember(pick.team, line);
            self.emit(events, DraftEvent::Comment(comment)).await;
        }

        if pick.pick_in_round == u32::from(self.settings.num_teams) {
            self.emit(events, DraftEvent::RoundComplete { round: pick.round })
                .await;
        }

        if self.phase == DraftPhase::Complete {
            info!(total_picks = self.board.pick_count(), "draft complete");
            self.emit(
                events,
                DraftEvent::DraftComplete {
                    total_picks: self.board.pick_count(),
                },
            )
            .await;
        }
        Ok(())
    }

    /// Gather reactions to `pick`. Requests run concurrently; results keep
    /// the policy's order. Failed comments are dropped.
    async fn collect_comments(&self, pick: &Pick) -> Vec<Comment> {
        let mut seen = HashSet::new();
        let mut slots = self.policy.select(pick, self.board.teams());
        slots.retain(|slot| {
            *slot != pick.team
                && self
                    .board
                    .team(*slot)
                    .is_some_and(|t| t.strategy.is_agent())
                && seen.insert(*slot)
        });
        slots.truncate(MAX_COMMENTERS);
        if slots.is_empty() {
            return Vec::new();
        }

        let preview = top_by_adp(&self.available(), COMMENT_BOARD_PREVIEW);
        let target_name = self.team_name(pick.team);
        let requests: Vec<CommentRequest> = slots
            .iter()
            .filter_map(|slot| self.board.team(*slot))
            .map(|team| CommentRequest {
                team_id: team.slot,
                strategy: team.strategy,
                round: pick.round,
                pick_number: pick.overall,
                own_picks: self.own_picks(team.slot),
                target_team: pick.team,
                target_name: target_name.clone(),
                target_player: pick.player.clone(),
                available: preview.clone(),
                recent_history: self.history(team.slot),
                rival_context: self.policy.rival_context(team.slot, self.board.teams()),
            })
            .collect();

        let replies = join_all(
            requests
                .iter()
                .map(|req| self.agents.for_slot(req.team_id).request_comment(req)),
        )
        .await;

        requests
            .iter()
            .zip(replies)
            .filter_map(|(req, reply)| match reply {
                Ok(text) => Some(Comment {
                    from: req.team_id,
                    to: CommentTarget::Team(pick.team),
                    text,
                }),
                Err(err) => {
                    warn!(team = req.team_id, error = %err, "comment dropped");
                    None
                }
            })
            .collect()
    }

    /// Blocks while `events` is full.
    async fn emit(&self, events: &mpsc::Sender<DraftEvent>, event: DraftEvent) {
        // The consumer may have gone away; keep drafting.
        let _ = events.send(event).await;
        self.pacer.pause().await;
    }

    fn remember(&mut self, slot: u8, line: String) {
        let window = self.settings.history_window;
        if window == 0 {
            return;
        }
        let lines = self.memory.entry(slot).or_default();
        lines.push_back(line);
        while lines.len() > window {
            lines.pop_front();
        }
    }

    fn own_picks(&self, slot: u8) -> Vec<String> {
        self.board
            .team(slot)
            .map(|t| t.picks.iter().map(|p| p.player.label()).collect())
            .unwrap_or_default()
    }

    fn team_name(&self, slot: u8) -> String {
        self.board
            .team(slot)
            .map(|t| t.name())
            .unwrap_or_else(|| format!("Team {slot}"))
    }
}

fn retry_note(err: &AgentError) -> String {
    match err {
        AgentError::InvalidSelection { name } => format!(
            "Your previous choice '{name}' is not one of the available players. \
             Choose exactly one name from the AVAILABLE list."
        ),
        other => format!(
            "Your previous reply could not be used ({other}). \
             Choose exactly one name from the AVAILABLE list."
        ),
    }
}
