//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/dqa/config.toml`
//! - Windows: `%APPDATA%/dqa/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `DQA_CONFIG`: Override config file path
//! - `DQA_INTERVAL`: Seconds between quota checks
//! - `DQA_THRESHOLD`: Alert threshold in percent (0-100)
//! - `DQA_TIMEOUT`: HTTP timeout in seconds
//! - `DQA_CLIENT_SECRETS`: Path to the OAuth client JSON
//! - `DQA_TOKEN_FILE`: Path to the cached token record
//! - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID`: Alert destination, read once
//!   at startup after loading the dotenv file

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use super::paths::{DEFAULT_CLIENT_SECRETS_FILE, DEFAULT_ENV_FILE, DEFAULT_TOKEN_FILE};
use crate::error::{DqaError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "DQA_CONFIG";
/// Environment variable for the check interval in seconds.
pub const ENV_INTERVAL: &str = "DQA_INTERVAL";
/// Environment variable for the alert threshold in percent.
pub const ENV_THRESHOLD: &str = "DQA_THRESHOLD";
/// Environment variable for the HTTP timeout in seconds.
pub const ENV_TIMEOUT: &str = "DQA_TIMEOUT";
/// Environment variable for the OAuth client secrets path.
pub const ENV_CLIENT_SECRETS: &str = "DQA_CLIENT_SECRETS";
/// Environment variable for the token record path.
pub const ENV_TOKEN_FILE: &str = "DQA_TOKEN_FILE";
/// Telegram bot token.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Telegram destination chat.
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Production check interval.
pub const DEFAULT_INTERVAL_SECS: u64 = 3600;
/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Google APIs root.
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com";
/// Telegram Bot API root.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Values supplied on the command line. `None` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub threshold_percent: Option<f64>,
}

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Time between quota checks.
    pub interval: Duration,
    /// Alert when usage is at or above this percentage.
    pub threshold_percent: f64,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// OAuth client secrets document.
    pub client_secrets_file: PathBuf,
    /// Cached token record.
    pub token_file: PathBuf,
    /// Google APIs root URL.
    pub drive_api_base: String,
    /// Telegram Bot API root URL.
    pub telegram_api_base: String,
    /// Dotenv file with the Telegram secrets.
    pub env_file: PathBuf,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub interval: ConfigSource,
    pub threshold: ConfigSource,
    pub timeout: ConfigSource,
    pub client_secrets_file: ConfigSource,
    pub token_file: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration from CLI overrides, environment variables,
    /// and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file exists but is invalid
    /// - An environment variable holds an unparseable value
    /// - Any resolved value is out of range
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let config = Self::load_config(overrides)?;
        config.validate()?;
        Self::from_layers(&config, overrides)
    }

    /// Merge an already-loaded config file with env vars and CLI overrides.
    ///
    /// # Errors
    /// Returns an error if an environment value cannot be parsed or the
    /// merged result is out of range.
    pub fn from_layers(config: &Config, overrides: &ConfigOverrides) -> Result<Self> {
        let mut sources = ConfigSources::default();

        let interval_secs = resolve_value(
            overrides.interval_secs,
            ENV_INTERVAL,
            Some(config.general.interval_seconds),
            DEFAULT_INTERVAL_SECS,
            &mut sources.interval,
        )?;
        let threshold_percent = resolve_value(
            overrides.threshold_percent,
            ENV_THRESHOLD,
            Some(config.alert.threshold_percent),
            0.0,
            &mut sources.threshold,
        )?;
        let timeout_secs = resolve_value(
            None,
            ENV_TIMEOUT,
            Some(config.general.timeout_seconds),
            DEFAULT_TIMEOUT_SECS,
            &mut sources.timeout,
        )?;
        let client_secrets_file = resolve_value(
            None,
            ENV_CLIENT_SECRETS,
            Some(config.oauth.client_secrets_file.clone()),
            PathBuf::from(DEFAULT_CLIENT_SECRETS_FILE),
            &mut sources.client_secrets_file,
        )?;
        let token_file = resolve_value(
            None,
            ENV_TOKEN_FILE,
            Some(config.oauth.token_file.clone()),
            PathBuf::from(DEFAULT_TOKEN_FILE),
            &mut sources.token_file,
        )?;

        validate_interval(interval_secs)?;
        validate_threshold(threshold_percent)?;
        validate_timeout(timeout_secs)?;

        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            threshold_percent,
            timeout: Duration::from_secs(timeout_secs),
            client_secrets_file,
            token_file,
            drive_api_base: config.drive.api_base.clone(),
            telegram_api_base: config.telegram.api_base.clone(),
            env_file: config.telegram.env_file.clone(),
            sources,
        })
    }

    /// Load config file, respecting `--config` and `DQA_CONFIG`.
    fn load_config(overrides: &ConfigOverrides) -> Result<Config> {
        if let Some(path) = &overrides.config_path {
            return Config::load_required(path);
        }
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            Config::load_required(Path::new(&path))
        } else {
            Config::load()
        }
    }
}

/// Pick the highest-precedence value, recording where it came from.
///
/// Config file values equal to the built-in default count as defaults.
fn resolve_value<T>(
    cli: Option<T>,
    env_key: &str,
    file: Option<T>,
    default: T,
    source: &mut ConfigSource,
) -> Result<T>
where
    T: std::str::FromStr + PartialEq,
    T::Err: std::fmt::Display,
{
    if let Some(value) = cli {
        *source = ConfigSource::Cli;
        return Ok(value);
    }

    if let Ok(raw) = std::env::var(env_key) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            *source = ConfigSource::Env;
            return trimmed.parse().map_err(|e: T::Err| DqaError::ConfigInvalid {
                key: env_key.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            });
        }
    }

    match file {
        Some(value) if value != default => {
            *source = ConfigSource::ConfigFile;
            Ok(value)
        }
        _ => {
            *source = ConfigSource::Default;
            Ok(default)
        }
    }
}

fn validate_interval(secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(DqaError::ConfigInvalid {
            key: "interval_seconds".to_string(),
            value: secs.to_string(),
            message: "interval must be greater than 0 seconds".to_string(),
        });
    }
    Ok(())
}

fn validate_threshold(percent: f64) -> Result<()> {
    if !percent.is_finite() || !(0.0..=100.0).contains(&percent) {
        return Err(DqaError::ConfigInvalid {
            key: "threshold_percent".to_string(),
            value: percent.to_string(),
            message: "threshold must be between 0 and 100".to_string(),
        });
    }
    Ok(())
}

fn validate_timeout(secs: u64) -> Result<()> {
    if secs == 0 || secs > 300 {
        return Err(DqaError::ConfigInvalid {
            key: "timeout_seconds".to_string(),
            value: secs.to_string(),
            message: "timeout must be between 1 and 300 seconds".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Config File
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Alert policy settings.
    pub alert: AlertConfig,
    /// OAuth file locations.
    pub oauth: OAuthConfig,
    /// Drive API settings.
    pub drive: DriveConfig,
    /// Telegram settings.
    pub telegram: TelegramConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Seconds between quota checks.
    pub interval_seconds: u64,
    /// Timeout for network requests in seconds.
    pub timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
}

/// Alert policy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Dispatch when usage is at or above this percentage.
    pub threshold_percent: f64,
}

/// OAuth file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_secrets_file: PathBuf,
    pub token_file: PathBuf,
}

/// Drive API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
}

/// Telegram settings. Secrets stay out of this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base: String,
    /// Dotenv file read once at startup.
    pub env_file: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            interval_seconds: DEFAULT_INTERVAL_SECS,
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            log_level: None,
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_secrets_file: PathBuf::from(DEFAULT_CLIENT_SECRETS_FILE),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_DRIVE_API_BASE.to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            env_file: PathBuf::from(DEFAULT_ENV_FILE),
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| DqaError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load configuration from a path the operator named explicitly.
    ///
    /// # Errors
    /// Returns [`DqaError::ConfigNotFound`] if the file is missing.
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DqaError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        Self::load_from(path)
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - Interval is positive
    /// - Threshold is a percentage
    /// - Timeout is within reasonable bounds (1-300 seconds)
    /// - API base URLs parse
    ///
    /// # Errors
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<()> {
        validate_interval(self.general.interval_seconds)?;
        validate_threshold(self.alert.threshold_percent)?;
        validate_timeout(self.general.timeout_seconds)?;

        for (key, value) in [
            ("drive.api_base", &self.drive.api_base),
            ("telegram.api_base", &self.telegram.api_base),
        ] {
            url::Url::parse(value).map_err(|e| DqaError::ConfigInvalid {
                key: key.to_string(),
                value: value.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}

// =============================================================================
// Telegram secrets
// =============================================================================

/// Telegram destination, loaded once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSettings")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

impl TelegramSettings {
    /// Load the dotenv file (if present) into the process environment, then
    /// read the bot token and chat id. Values already in the environment win.
    ///
    /// # Errors
    /// [`DqaError::EnvVarMissing`] when either variable is unset or empty,
    /// [`DqaError::ConfigParse`] when the dotenv file is malformed.
    pub fn load(env_file: &Path) -> Result<Self> {
        match dotenvy::from_path(env_file) {
            Ok(()) => tracing::debug!(path = %env_file.display(), "Loaded dotenv file"),
            Err(e) if e.not_found() => {
                tracing::debug!(path = %env_file.display(), "No dotenv file, using environment");
            }
            Err(e) => {
                return Err(DqaError::ConfigParse {
                    path: env_file.display().to_string(),
                    message: e.to_string(),
                });
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    ///
    /// # Errors
    /// [`DqaError::EnvVarMissing`] when a value is absent or blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DqaError::EnvVarMissing {
                    name: name.to_string(),
                })
        };

        Ok(Self {
            bot_token: required(ENV_BOT_TOKEN)?,
            chat_id: required(ENV_CHAT_ID)?,
        })
    }
}
