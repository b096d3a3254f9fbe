//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never aborts startup: the service logs a
//! warning and continues with compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Primary environment variable for the question root folder
pub const ROOT_FOLDER_ENV: &str = "PERGAMO_QUESTIONS_ROOT";
/// Secondary environment variable for the question root folder
pub const ROOT_ENV: &str = "PERGAMO_ROOT";
/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV: &str = "PERGAMO_CONFIG";

/// Compiled defaults used when no other source provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: PathBuf::from("./public"),
            host: "127.0.0.1".to_string(),
            port: 5780,
            log_level: "info".to_string(),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root folder containing the question tree
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub explain: ExplainConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Question store settings
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// URL prefix prepended to rewritten asset paths (e.g. "/assets")
    #[serde(default)]
    pub asset_prefix: String,

    /// Serve asset files from the root folder under `asset_prefix`
    #[serde(default)]
    pub serve_assets: bool,

    /// Expose `POST /questions/reload`
    #[serde(default)]
    pub allow_reload: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            asset_prefix: String::new(),
            serve_assets: false,
            allow_reload: false,
        }
    }
}

/// LLM explanation endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// API key (may also come from PERGAMO_LLM_API_KEY / GROQ_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upstream connect timeout
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Maximum silence between two upstream chunks before the stream is cut
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Explanation requests allowed per client per minute
    #[serde(default = "default_explain_rpm")]
    pub requests_per_minute: u32,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            connect_timeout_secs: default_connect_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            requests_per_minute: default_explain_rpm(),
        }
    }
}

/// Question report settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReportsConfig {
    /// Moderation webhook (may also come from PERGAMO_WEBHOOK_URL / DISCORD_WEBHOOK_URL)
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Reports allowed per client per minute
    #[serde(default = "default_report_rpm")]
    pub requests_per_minute: u32,

    /// How long a (question, client) report is remembered
    #[serde(default = "default_dedup_ttl_secs")]
    pub dedup_ttl_secs: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            requests_per_minute: default_report_rpm(),
            dedup_ttl_secs: default_dedup_ttl_secs(),
        }
    }
}

/// Practice session limits
#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Sessions unused for this long are dropped
    #[serde(default = "default_session_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    /// Live sessions kept before the least recently used one is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Period of the background sweep (sessions and rate limiter state)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: default_session_idle_ttl_secs(),
            max_sessions: default_max_sessions(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_max_tokens() -> u32 {
    500
}

fn default_temperature() -> f32 {
    0.7
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_idle_timeout_secs() -> u64 {
    30
}

fn default_explain_rpm() -> u32 {
    10
}

fn default_report_rpm() -> u32 {
    2
}

fn default_dedup_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_session_idle_ttl_secs() -> u64 {
    60 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load configuration, falling back to defaults on any failure
    ///
    /// Secrets found in the environment override the file afterwards.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let mut config = match config_file_path(explicit) {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Could not load config file {}: {} (using defaults)",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            None => {
                info!("No config file found, using compiled defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config
    }

    /// Apply secret overrides from environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Some(key) = first_env(&["PERGAMO_LLM_API_KEY", "GROQ_API_KEY"]) {
            self.explain.api_key = Some(key);
        }
        if let Some(url) = first_env(&["PERGAMO_WEBHOOK_URL", "DISCORD_WEBHOOK_URL"]) {
            self.reports.webhook_url = Some(url);
        }
    }
}

/// Locate the TOML config file
///
/// Order: explicit path, `PERGAMO_CONFIG`, `<config_dir>/pergamo/config.toml`.
/// An explicit path is returned even if it does not exist so the caller can
/// report it.
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("pergamo").join("config.toml"))
        .filter(|p| p.exists())
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Resolves the question root folder
///
/// Priority: CLI argument → `PERGAMO_QUESTIONS_ROOT` → `PERGAMO_ROOT` →
/// TOML `root_folder` → compiled default.
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Some(path) = first_env(&[ROOT_FOLDER_ENV, ROOT_ENV]) {
            return PathBuf::from(path);
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Validate that a resolved root folder is usable
///
/// A missing folder is not fatal for the question service (it serves an
/// empty store), so this only reports the problem.
pub fn check_root_folder(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "question root folder {}",
            path.display()
        )));
    }
    if !path.is_dir() {
        return Err(Error::Config(format!(
            "question root {} is not a directory",
            path.display()
        )));
    }
    Ok(())
}
