//! Application configuration for docforge.
//!
//! User config lives at `~/.docforge/docforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocforgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docforge";

// ---------------------------------------------------------------------------
// Config structs (matching docforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Generation service settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Source scraping settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Confidence thresholds for discovery and rewrite decisions.
    #[serde(default)]
    pub confidence: ConfidenceConfig,

    /// Candidate batching limits.
    #[serde(default)]
    pub batching: BatchingConfig,

    /// Scheduled-sweep target selection.
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path to the docforge database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.docforge/docforge.db".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model to use for rewrite and discovery calls.
    #[serde(default = "default_model")]
    pub model: String,

    /// Max output tokens per generation call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout in seconds.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Cost estimate input: USD per 1K tokens (input + output combined).
    #[serde(default = "default_cost_per_1k")]
    pub cost_per_1k_tokens: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_generation_timeout(),
            cost_per_1k_tokens: default_cost_per_1k(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}
fn default_max_tokens() -> u32 {
    8_000
}
fn default_generation_timeout() -> u64 {
    120
}
fn default_cost_per_1k() -> f64 {
    0.002
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Per-URL timeout in seconds.
    #[serde(default = "default_scrape_timeout")]
    pub timeout_secs: u64,

    /// Max concurrent scrape requests per job.
    #[serde(default = "default_scrape_concurrency")]
    pub concurrency: u32,

    /// Extract only main content, dropping nav/footer chrome.
    #[serde(default = "default_true")]
    pub only_main_content: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scrape_timeout(),
            concurrency: default_scrape_concurrency(),
            only_main_content: true,
        }
    }
}

fn default_scrape_timeout() -> u64 {
    30
}
fn default_scrape_concurrency() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

/// `[confidence]` section — named thresholds, no module-level globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    /// Minimum confidence for a discovered relationship to survive
    /// filtering and be persisted on the job.
    #[serde(default = "default_create_threshold")]
    pub relationship_create_threshold: f64,

    /// Minimum confidence for display surfaces (consumed by the site, not
    /// by this core).
    #[serde(default = "default_display_threshold")]
    pub relationship_display_threshold: f64,

    /// Rewrites below this confidence are flagged for extra reviewer
    /// attention.
    #[serde(default = "default_rewrite_threshold")]
    pub rewrite_apply_threshold: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            relationship_create_threshold: default_create_threshold(),
            relationship_display_threshold: default_display_threshold(),
            rewrite_apply_threshold: default_rewrite_threshold(),
        }
    }
}

fn default_create_threshold() -> f64 {
    0.6
}
fn default_display_threshold() -> f64 {
    0.5
}
fn default_rewrite_threshold() -> f64 {
    0.7
}

/// `[batching]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchingConfig {
    /// Max candidates per generation call.
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_batch: usize,

    /// Max estimated prompt tokens per generation call.
    #[serde(default = "default_max_batch_tokens")]
    pub max_tokens_per_batch: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_candidates_per_batch: default_max_candidates(),
            max_tokens_per_batch: default_max_batch_tokens(),
        }
    }
}

fn default_max_candidates() -> usize {
    15
}
fn default_max_batch_tokens() -> usize {
    4_000
}

/// `[sweep]` section — scheduled batch job target selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Items not refreshed within this many days are considered stale.
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: u32,

    /// Max jobs created per sweep.
    #[serde(default = "default_sweep_limit")]
    pub limit: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            stale_after_days: default_stale_after_days(),
            limit: default_sweep_limit(),
        }
    }
}

fn default_stale_after_days() -> u32 {
    30
}
fn default_sweep_limit() -> u32 {
    20
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocforgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docforge/docforge.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| DocforgeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocforgeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocforgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocforgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocforgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the generation API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.generation.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(DocforgeError::config(format!(
            "generation API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("relationship_create_threshold"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.confidence.relationship_create_threshold, 0.6);
        assert_eq!(parsed.batching.max_candidates_per_batch, 15);
        assert_eq!(parsed.generation.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[confidence]
relationship_create_threshold = 0.75

[sweep]
stale_after_days = 7
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.confidence.relationship_create_threshold, 0.75);
        // Untouched fields keep their defaults.
        assert_eq!(config.confidence.rewrite_apply_threshold, 0.7);
        assert_eq!(config.sweep.stale_after_days, 7);
        assert_eq!(config.sweep.limit, 20);
        assert_eq!(config.batching.max_tokens_per_batch, 4_000);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.generation.api_key_env = "DF_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
