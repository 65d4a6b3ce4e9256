use anyhow::{Context, Result};
use resonnet_core::cadence::DelayPolicy;
use resonnet_core::scheduler::SchedulerConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub debounce: DebounceConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,
    #[serde(default = "default_max_cache_items")]
    pub max_cache_items: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_content_length: default_min_content_length(),
            max_cache_items: default_max_cache_items(),
        }
    }
}

fn default_min_content_length() -> usize {
    resonnet_core::MIN_CONTENT_LENGTH
}
fn default_max_cache_items() -> usize {
    resonnet_core::MAX_CACHE_ITEMS
}

impl AnalysisConfig {
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            min_content_length: self.min_content_length,
            cache_capacity: self.max_cache_items,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DebounceConfig {
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_min_ms")]
    pub min_ms: u64,
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    #[serde(default = "default_fast_interval_ms")]
    pub fast_interval_ms: u64,
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
    #[serde(default = "default_retune_interval_ms")]
    pub retune_interval_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            min_ms: default_min_ms(),
            max_ms: default_max_ms(),
            step_ms: default_step_ms(),
            fast_interval_ms: default_fast_interval_ms(),
            window: default_window(),
            max_samples: default_max_samples(),
            retune_interval_ms: default_retune_interval_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    800
}
fn default_min_ms() -> u64 {
    500
}
fn default_max_ms() -> u64 {
    1200
}
fn default_step_ms() -> u64 {
    50
}
fn default_fast_interval_ms() -> u64 {
    200
}
fn default_window() -> usize {
    5
}
fn default_max_samples() -> usize {
    20
}
fn default_retune_interval_ms() -> u64 {
    5000
}

impl DebounceConfig {
    pub fn policy(&self) -> DelayPolicy {
        DelayPolicy {
            initial_ms: self.initial_ms,
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            step_ms: self.step_ms,
            fast_interval_ms: self.fast_interval_ms,
            window: self.window,
            max_samples: self.max_samples,
        }
    }

    pub fn retune_interval(&self) -> Duration {
        Duration::from_millis(self.retune_interval_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
        }
    }
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f64 {
    0.2
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to built-in defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    // Validate analysis
    if config.analysis.max_cache_items == 0 {
        anyhow::bail!("analysis.max_cache_items must be > 0");
    }

    // Validate debounce
    let d = &config.debounce;
    if d.min_ms > d.max_ms {
        anyhow::bail!("debounce.min_ms must be <= debounce.max_ms");
    }
    if !(d.min_ms..=d.max_ms).contains(&d.initial_ms) {
        anyhow::bail!(
            "debounce.initial_ms must be within [{}, {}]",
            d.min_ms,
            d.max_ms
        );
    }
    if d.step_ms == 0 {
        anyhow::bail!("debounce.step_ms must be > 0");
    }
    if d.window < 2 {
        anyhow::bail!("debounce.window must be >= 2");
    }
    if d.max_samples < d.window {
        anyhow::bail!("debounce.max_samples must be >= debounce.window");
    }
    if d.retune_interval_ms == 0 {
        anyhow::bail!("debounce.retune_interval_ms must be > 0");
    }

    // Validate client
    if !(0.0..=1.0).contains(&config.client.temperature) {
        anyhow::bail!("client.temperature must be in [0.0, 1.0]");
    }
    if config.client.timeout_secs == 0 {
        anyhow::bail!("client.timeout_secs must be > 0");
    }
    if config.client.model.trim().is_empty() {
        anyhow::bail!("client.model must not be empty");
    }

    Ok(())
}
