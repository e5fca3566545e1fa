// Mock draft entry point.
//
// `mockdraft run` (the default) plays a draft in the terminal:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config
// 3. Load the player catalog
// 4. Build the LLM client and the local agent
// 5. Build the agent roster (probing remote agents if configured)
// 6. Start the session and spawn the event printer
// 7. Drive the draft, reading human picks from stdin
// 8. Print the summary
//
// `mockdraft serve --slot N` hosts one team's agent over HTTP instead.

use std::io::Write as _;
use std::sync::Arc;

use mock_draft::agent::local::{LocalAgent, TokenLimits};
use mock_draft::agent::remote::RemoteAgent;
use mock_draft::agent::server::{self, AgentServerState};
use mock_draft::agent::AgentRoster;
use mock_draft::config::{self, AgentMode, Config};
use mock_draft::draft::player::{Player, PlayerPool};
use mock_draft::llm::client::LlmClient;
use mock_draft::orchestrator::commentary::RivalryPolicy;
use mock_draft::orchestrator::pacing::pacer_from_millis;
use mock_draft::orchestrator::{Advance, DraftError, DraftSession};
use mock_draft::protocol::DraftEvent;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Players listed when the human is on the clock.
const HUMAN_BOARD_SIZE: usize = 10;

#[derive(Parser)]
#[command(name = "mockdraft", version, about = "Fantasy football mock draft against AI teams")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play a draft in the terminal (default).
    Run {
        /// Print events as fast as they happen.
        #[arg(long)]
        no_pacing: bool,
    },
    /// Serve one team's agent over HTTP for remote drafts.
    Serve {
        /// Draft slot this server answers for.
        #[arg(long)]
        slot: u8,
        /// Port to listen on (default 5000 + slot).
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("mockdraft starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: {} teams, {} rounds, human slot {:?}",
        config.draft.num_teams, config.draft.num_rounds, config.draft.human_slot
    );

    // 3. Load the player catalog
    let pool = load_pool(&config)?;
    info!("Loaded {} players", pool.len());

    // 4. Build the LLM client and the local agent
    let llm_client = LlmClient::from_config(&config);
    if llm_client.is_active() {
        info!("LLM client initialized (API key configured)");
    } else {
        info!("LLM client disabled (no API key); agents use heuristics");
    }
    let local = Arc::new(LocalAgent::new(
        llm_client.into_reasoner(),
        TokenLimits {
            pick_max_tokens: config.llm.pick_max_tokens,
            comment_max_tokens: config.llm.comment_max_tokens,
        },
    ));

    match cli.command.unwrap_or(Command::Run { no_pacing: false }) {
        Command::Run { no_pacing } => run_draft(config, pool, local, no_pacing).await,
        Command::Serve { slot, port } => serve_agent(config, pool, local, slot, port).await,
    }
}

async fn run_draft(
    config: Config,
    pool: PlayerPool,
    local: Arc<LocalAgent>,
    no_pacing: bool,
) -> anyhow::Result<()> {
    // 5. Build the agent roster
    if config.agents.mode == AgentMode::Remote {
        for (slot, url) in &config.agents.endpoints {
            if !RemoteAgent::new(url.clone(), config.agents.timeout)
                .is_healthy()
                .await
            {
                warn!(slot, url = %url, "remote agent not responding; will fall back per call");
                println!("Team {slot}'s agent at {url} is not responding; it will draft locally.");
            }
        }
    }
    let roster = AgentRoster::from_config(&config.agents, local);

    // 6. Start the session and spawn the event printer
    let policy =
        RivalryPolicy::new(config.rivals.clone()).quiet_obvious_picks(config.skip_obvious_picks);
    let delay_ms = if no_pacing { 0 } else { config.pacing.event_delay_ms };
    let mut session = DraftSession::new(config.draft.clone(), pool, roster)
        .context("invalid draft settings")?
        .with_policy(policy)
        .with_pacer(pacer_from_millis(delay_ms));
    session.start()?;

    println!(
        "Mock draft: {} teams, {} rounds ({})",
        config.draft.num_teams,
        config.draft.num_rounds,
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    );

    let (event_tx, mut event_rx) = mpsc::channel::<DraftEvent>(256);
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            print_event(&event);
        }
    });

    // 7. Drive the draft, reading human picks from stdin
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match session.advance(&event_tx).await? {
            Advance::Picked(_) => {}
            Advance::Complete(_) => break,
            Advance::AwaitingHuman { .. } => loop {
                let Some(line) = stdin.next_line().await.context("failed to read stdin")? else {
                    bail!("stdin closed while waiting for your pick");
                };
                match session.submit_human_pick(&line, &event_tx).await {
                    Ok(_) => break,
                    Err(DraftError::HumanInputInvalid { .. }) => continue,
                    Err(e) => return Err(e.into()),
                }
            },
        }
    }

    drop(event_tx);
    let _ = printer.await;

    // 8. Print the summary
    println!("\n{}", session.summary());
    info!("mockdraft finished");
    Ok(())
}

async fn serve_agent(
    config: Config,
    pool: PlayerPool,
    local: Arc<LocalAgent>,
    slot: u8,
    port: Option<u16>,
) -> anyhow::Result<()> {
    if slot == 0 || slot > config.draft.num_teams {
        bail!("slot {slot} outside 1..={}", config.draft.num_teams);
    }
    let port = port.unwrap_or(5000 + u16::from(slot));
    let addr = format!("{}:{}", config.server.bind, port);

    let state = AgentServerState {
        slot,
        agent: local,
        pool: Arc::new(pool),
    };
    let handle = server::start(&addr, state)
        .await
        .with_context(|| format!("failed to bind agent server on {addr}"))?;
    println!("Team {slot} agent listening on {}", handle.url());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!(slot, "agent server shutting down"),
        _ = handle.wait() => warn!(slot, "agent server stopped"),
    }
    Ok(())
}

fn load_pool(config: &Config) -> anyhow::Result<PlayerPool> {
    let pool = match &config.players_path {
        Some(path) => PlayerPool::load(path)
            .with_context(|| format!("failed to load players from {}", path.display()))?,
        None => PlayerPool::builtin().context("failed to load built-in catalog")?,
    };
    Ok(pool)
}

// ---------------------------------------------------------------------------
// Terminal output
// ---------------------------------------------------------------------------

fn print_event(event: &DraftEvent) {
    match event {
        DraftEvent::OnTheClock {
            round,
            pick_in_round,
            overall,
            team_name,
            ..
        } => {
            println!(
                "\n[Commissioner] Round {round}, pick {pick_in_round} (#{overall} overall): \
                 {team_name} is on the clock."
            );
        }
        DraftEvent::PickMade { pick, team_name } => {
            println!(
                "  {team_name} selects {} ({}, {})",
                pick.player.name, pick.player.position, pick.player.team
            );
            if let Some(reasoning) = &pick.reasoning {
                println!("    \"{reasoning}\"");
            }
            if let Some(talk) = &pick.trash_talk {
                println!("    >> {talk}");
            }
        }
        DraftEvent::Comment(comment) => {
            println!("  {}", comment.history_line());
        }
        DraftEvent::AwaitingHuman {
            overall,
            available,
            advice,
            ..
        } => {
            println!("\nYou're on the clock with pick #{overall}. Best available:");
            for (i, player) in available.iter().take(HUMAN_BOARD_SIZE).enumerate() {
                println!("  {:>2}. {}", i + 1, describe(player));
            }
            let best: Vec<String> = advice
                .iter()
                .map(|p| format!("{} {}", p.position, p.name))
                .collect();
            println!("  Best by position: {}", best.join(", "));
            prompt();
        }
        DraftEvent::HumanInputRejected { message, .. } => {
            println!("  {message}");
            prompt();
        }
        DraftEvent::RoundComplete { round } => {
            println!("\n[Commissioner] That's the end of round {round}.");
        }
        DraftEvent::DraftComplete { total_picks } => {
            println!("\n[Commissioner] The draft is complete after {total_picks} picks.");
        }
    }
}

fn describe(player: &Player) -> String {
    let upside = if player.upside { ", upside" } else { "" };
    format!(
        "{} ({}, {}) ADP {:.1}{upside}",
        player.name, player.position, player.team, player.adp
    )
}

fn prompt() {
    print!("Your pick: ");
    let _ = std::io::stdout().flush();
}

/// Initialize tracing to log to a file (the terminal shows the draft).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("mock-draft.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_draft=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
