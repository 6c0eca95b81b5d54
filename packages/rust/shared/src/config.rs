//! Application configuration for Newsroom.
//!
//! User config lives at `~/.newsroom/newsroom.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{NewsroomError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "newsroom.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".newsroom";

// ---------------------------------------------------------------------------
// Config structs (matching newsroom.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Article pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Knowledge-base merge settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory articles are written to.
    #[serde(default = "default_posts_dir")]
    pub posts_dir: String,

    /// Knowledge-base directory (one YAML file per collection).
    #[serde(default = "default_kb_dir")]
    pub kb_dir: String,

    /// Directory research batches are read from.
    #[serde(default = "default_research_dir")]
    pub research_dir: String,

    /// Markdown library of compliance rules and tool notes.
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: String,

    /// Articles per run.
    #[serde(default = "default_articles")]
    pub articles: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            posts_dir: default_posts_dir(),
            kb_dir: default_kb_dir(),
            research_dir: default_research_dir(),
            knowledge_dir: default_knowledge_dir(),
            articles: default_articles(),
        }
    }
}

fn default_posts_dir() -> String {
    "_posts".into()
}
fn default_kb_dir() -> String {
    "_data/market".into()
}
fn default_research_dir() -> String {
    "_data/research".into()
}
fn default_knowledge_dir() -> String {
    "knowledge".into()
}
fn default_articles() -> usize {
    3
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Env var holding a comma-separated list of API keys (never store keys here).
    #[serde(default = "default_api_keys_env")]
    pub api_keys_env: String,

    /// Env var holding a single API key, consulted when the list is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the models endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Models tried in order for structured and plain calls.
    #[serde(default = "default_light_models")]
    pub light_models: Vec<String>,

    /// Models tried in order for search-augmented drafting.
    #[serde(default = "default_heavy_models")]
    pub heavy_models: Vec<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Fixed delay between fallback attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_keys_env: default_api_keys_env(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            light_models: default_light_models(),
            heavy_models: default_heavy_models(),
            timeout_secs: default_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_api_keys_env() -> String {
    "GEMINI_API_KEYS".into()
}
fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".into()
}
fn default_light_models() -> Vec<String> {
    vec!["gemini-2.5-flash-lite".into(), "gemini-2.0-flash".into()]
}
fn default_heavy_models() -> Vec<String> {
    vec!["gemini-2.5-pro".into(), "gemini-2.5-flash-lite".into()]
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_retry_delay_ms() -> u64 {
    1000
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Maximum title length in characters.
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,

    /// Output budget for draft and revision calls.
    #[serde(default = "default_draft_max_tokens")]
    pub draft_max_tokens: u32,

    /// Characters of the original draft included in a revision request.
    #[serde(default = "default_revision_context_chars")]
    pub revision_context_chars: usize,

    /// How far back the recent-title exclusion list looks.
    #[serde(default = "default_recent_title_days")]
    pub recent_title_days: i64,

    /// Shared persona text prepended to every category persona.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_preamble: Option<String>,

    /// Best-effort steps run against each written article.
    #[serde(default = "default_post_process")]
    pub post_process: Vec<PostProcessStep>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            title_max_len: default_title_max_len(),
            draft_max_tokens: default_draft_max_tokens(),
            revision_context_chars: default_revision_context_chars(),
            recent_title_days: default_recent_title_days(),
            persona_preamble: None,
            post_process: default_post_process(),
        }
    }
}

fn default_title_max_len() -> usize {
    45
}
fn default_draft_max_tokens() -> u32 {
    8192
}
fn default_revision_context_chars() -> usize {
    6000
}
fn default_recent_title_days() -> i64 {
    7
}
fn default_post_process() -> Vec<PostProcessStep> {
    vec![PostProcessStep {
        name: "textlint".into(),
        program: "textlint".into(),
        args: vec!["--fix".into(), "{path}".into()],
        timeout_secs: 60,
        enrichment: false,
    }]
}

/// `[[pipeline.post_process]]` entry: an external command run on each article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessStep {
    /// Label used in logs.
    pub name: String,
    /// Executable to run.
    pub program: String,
    /// Arguments; `{path}` is replaced with the article path.
    #[serde(default)]
    pub args: Vec<String>,
    /// Kill the step after this many seconds.
    #[serde(default = "default_step_timeout")]
    pub timeout_secs: u64,
    /// Link/ad enrichment step, skipped when enrichment is disabled for a run.
    #[serde(default)]
    pub enrichment: bool,
}

fn default_step_timeout() -> u64 {
    60
}

/// `[knowledge]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Research batches older than this are skipped.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    /// Recent-news history kept per company.
    #[serde(default = "default_max_recent_news")]
    pub max_recent_news: usize,

    /// Research notes older than this are not quoted in drafts.
    #[serde(default = "default_research_lookup_days")]
    pub research_lookup_days: i64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_recent_news: default_max_recent_news(),
            research_lookup_days: default_research_lookup_days(),
        }
    }
}

fn default_max_age_days() -> i64 {
    3
}
fn default_max_recent_news() -> usize {
    5
}
fn default_research_lookup_days() -> i64 {
    7
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.newsroom/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| NewsroomError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.newsroom/newsroom.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| NewsroomError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| NewsroomError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| NewsroomError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| NewsroomError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| NewsroomError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Collect API keys from the environment.
///
/// The comma-separated list variable wins; the single-key variable is the
/// fallback. Blank entries are dropped.
pub fn resolve_api_keys(config: &GeminiConfig) -> Result<Vec<String>> {
    let from_list = std::env::var(&config.api_keys_env)
        .ok()
        .map(|raw| split_keys(&raw))
        .unwrap_or_default();
    if !from_list.is_empty() {
        return Ok(from_list);
    }

    match std::env::var(&config.api_key_env) {
        Ok(val) if !val.trim().is_empty() => Ok(vec![val.trim().to_string()]),
        _ => Err(NewsroomError::config(format!(
            "Gemini API key not found. Set {} (comma-separated) or {}.",
            config.api_keys_env, config.api_key_env
        ))),
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}
