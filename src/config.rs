// Configuration loading and parsing (draft.toml, credentials.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::agent::strategy::StrategyTag;
use crate::orchestrator::commentary::RivalTable;
use crate::orchestrator::DraftSettings;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// League shape and per-slot strategies. The human slot, when present,
    /// is always `UserControlled` here.
    pub draft: DraftSettings,
    pub rivals: RivalTable,
    pub skip_obvious_picks: bool,
    pub agents: AgentsConfig,
    pub llm: LlmConfig,
    pub pacing: PacingConfig,
    pub server: ServerConfig,
    /// Player catalog CSV. `None` means the built-in catalog.
    pub players_path: Option<PathBuf>,
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Every agent runs in-process.
    #[default]
    Local,
    /// Agents are reached over HTTP, with the in-process agent as fallback.
    Remote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentsConfig {
    pub mode: AgentMode,
    /// Upper bound on a single remote call.
    pub timeout: Duration,
    /// Base URL per slot.
    pub endpoints: BTreeMap<u8, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub pick_max_tokens: u32,
    pub comment_max_tokens: u32,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            model: "claude-sonnet-4-5-20250929".into(),
            pick_max_tokens: 400,
            comment_max_tokens: 150,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Delay after each draft event; 0 disables pacing.
    pub event_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        PacingConfig { event_delay_ms: 600 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address `mockdraft serve` binds to.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draft.toml file.
#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    draft: DraftSection,
    #[serde(default)]
    agents: AgentsSection,
    #[serde(default)]
    llm: LlmConfig,
    #[serde(default)]
    pacing: PacingConfig,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    data: DataSection,
}

/// TOML table keys are strings; slots are parsed during validation.
#[derive(Debug, Clone, Deserialize)]
struct DraftSection {
    #[serde(default = "default_num_teams")]
    num_teams: u8,
    #[serde(default = "default_num_rounds")]
    num_rounds: u32,
    #[serde(default)]
    human_slot: Option<u8>,
    #[serde(default = "default_candidate_limit")]
    candidate_limit: usize,
    #[serde(default = "default_history_window")]
    history_window: usize,
    #[serde(default)]
    skip_obvious_picks: bool,
    #[serde(default)]
    strategies: BTreeMap<String, String>,
    #[serde(default)]
    rivals: BTreeMap<String, Vec<u8>>,
}

fn default_num_teams() -> u8 {
    6
}

fn default_num_rounds() -> u32 {
    3
}

fn default_candidate_limit() -> usize {
    10
}

fn default_history_window() -> usize {
    5
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct AgentsSection {
    mode: AgentMode,
    timeout_secs: u64,
    endpoints: BTreeMap<String, String>,
}

impl Default for AgentsSection {
    fn default() -> Self {
        AgentsSection {
            mode: AgentMode::Local,
            timeout_secs: 30,
            endpoints: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DataSection {
    #[serde(default)]
    players: Option<String>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draft.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- draft.toml (required) ---
    let draft_path = config_dir.join("draft.toml");
    let draft_text = read_file(&draft_path)?;
    let mut config = parse_draft_toml(&draft_text, &draft_path, base_dir)?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        config.credentials =
            toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
                path: credentials_path.clone(),
                source: e,
            })?;
    }

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Parse draft.toml text into a validated `Config` with empty credentials.
/// Relative catalog paths resolve against `base_dir`.
fn parse_draft_toml(text: &str, path: &Path, base_dir: &Path) -> Result<Config, ConfigError> {
    let file: DraftFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    assemble(file, base_dir)
}

fn parse_slot(field: &str, key: &str, num_teams: u8) -> Result<u8, ConfigError> {
    let slot: u8 = key
        .trim()
        .parse()
        .map_err(|_| invalid(field, format!("'{key}' is not a team slot")))?;
    check_slot(field, slot, num_teams)
}

fn check_slot(field: &str, slot: u8, num_teams: u8) -> Result<u8, ConfigError> {
    if slot == 0 || slot > num_teams {
        return Err(invalid(
            field,
            format!("slot {slot} outside 1..={num_teams}"),
        ));
    }
    Ok(slot)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Turn the raw file into typed config, validating as we go.
fn assemble(file: DraftFile, base_dir: &Path) -> Result<Config, ConfigError> {
    let section = file.draft;
    let n = section.num_teams;

    if n < 2 {
        return Err(invalid("draft.num_teams", "must be at least 2"));
    }
    if section.num_rounds == 0 {
        return Err(invalid("draft.num_rounds", "must be at least 1"));
    }
    if section.candidate_limit == 0 {
        return Err(invalid("draft.candidate_limit", "must be at least 1"));
    }

    // Strategies: unlisted slots draft best available.
    let mut strategies = vec![StrategyTag::BestPlayerAvailable; usize::from(n)];
    for (key, name) in &section.strategies {
        let slot = parse_slot("draft.strategies", key, n)?;
        let tag = StrategyTag::from_name(name).ok_or_else(|| {
            invalid("draft.strategies", format!("unknown strategy '{name}' for slot {slot}"))
        })?;
        strategies[usize::from(slot) - 1] = tag;
    }

    // At most one human seat; `human_slot` and a UserControlled entry must agree.
    let listed_humans: Vec<u8> = strategies
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_agent())
        .map(|(i, _)| (i + 1) as u8)
        .collect();
    let human_slot = match (section.human_slot, listed_humans.as_slice()) {
        (Some(slot), []) => Some(check_slot("draft.human_slot", slot, n)?),
        (Some(slot), [listed]) if *listed == slot => Some(slot),
        (Some(slot), _) => {
            return Err(invalid(
                "draft.human_slot",
                format!("slot {slot} conflicts with UserControlled slots {listed_humans:?}"),
            ))
        }
        (None, []) => None,
        (None, [listed]) => Some(*listed),
        (None, _) => {
            return Err(invalid(
                "draft.strategies",
                format!("only one UserControlled team allowed, got {listed_humans:?}"),
            ))
        }
    };
    if let Some(slot) = human_slot {
        strategies[usize::from(slot) - 1] = StrategyTag::UserControlled;
    }

    let mut rivals = BTreeMap::new();
    for (key, list) in &section.rivals {
        let slot = parse_slot("draft.rivals", key, n)?;
        for rival in list {
            check_slot("draft.rivals", *rival, n)?;
            if *rival == slot {
                return Err(invalid(
                    "draft.rivals",
                    format!("team {slot} cannot be its own rival"),
                ));
            }
        }
        rivals.insert(slot, list.clone());
    }

    let agents_section = file.agents;
    if agents_section.timeout_secs == 0 {
        return Err(invalid("agents.timeout_secs", "must be greater than 0"));
    }
    let mut endpoints = BTreeMap::new();
    for (key, url) in &agents_section.endpoints {
        let slot = parse_slot("agents.endpoints", key, n)?;
        if url.trim().is_empty() {
            return Err(invalid("agents.endpoints", format!("empty URL for slot {slot}")));
        }
        endpoints.insert(slot, url.trim().to_string());
    }
    if agents_section.mode == AgentMode::Remote {
        let missing: Vec<u8> = (1..=n)
            .filter(|slot| strategies[usize::from(*slot) - 1].is_agent())
            .filter(|slot| !endpoints.contains_key(slot))
            .collect();
        if !missing.is_empty() {
            return Err(invalid(
                "agents.endpoints",
                format!("remote mode needs an endpoint for slots {missing:?}"),
            ));
        }
    }

    let llm = file.llm;
    if llm.model.trim().is_empty() {
        return Err(invalid("llm.model", "must not be empty"));
    }
    if llm.pick_max_tokens == 0 || llm.comment_max_tokens == 0 {
        return Err(invalid("llm", "token limits must be greater than 0"));
    }
    if !(0.0..=1.0).contains(&llm.temperature) {
        return Err(invalid(
            "llm.temperature",
            format!("must be between 0.0 and 1.0 inclusive, got {}", llm.temperature),
        ));
    }

    let players_path = file
        .data
        .players
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let path = PathBuf::from(p.trim());
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        });

    let mut draft = DraftSettings::new(n, section.num_rounds, strategies, human_slot);
    draft.candidate_limit = section.candidate_limit;
    draft.history_window = section.history_window;

    Ok(Config {
        draft,
        rivals: RivalTable::new(rivals),
        skip_obvious_picks: section.skip_obvious_picks,
        agents: AgentsConfig {
            mode: agents_section.mode,
            timeout: Duration::from_secs(agents_section.timeout_secs),
            endpoints,
        },
        llm,
        pacing: file.pacing,
        server: file.server,
        players_path,
        credentials: CredentialsConfig::default(),
    })
}

/// The shipped defaults, parsed. For tests that need a full `Config`.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    parse_draft_toml(
        include_str!("../defaults/draft.toml"),
        Path::new("defaults/draft.toml"),
        Path::new("."),
    )
    .expect("shipped defaults must parse")
}
