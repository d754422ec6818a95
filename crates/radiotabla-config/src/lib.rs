//! Shared configuration for radiotabla.
//!
//! TOML file plus `RADIOTABLA_*` environment overrides, and translation to
//! the core's [`CoordinatorConfig`] and the client's [`TransportConfig`].
//! The CLI layers its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use radiotabla_core::{ChannelId, CoordinatorConfig, DEFAULT_BASE_URL, TransportConfig};

const ENV_PREFIX: &str = "RADIOTABLA_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Channel shown by `schedule` and `watch` when none is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_channel: Option<u32>,

    /// Output defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Schedule service connection.
    #[serde(default)]
    pub api: ApiSettings,

    /// Bulk refresh pacing.
    #[serde(default)]
    pub refresh: RefreshSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiSettings {
    /// Base URL of the schedule service.
    #[serde(default = "default_api_url")]
    pub url: String,

    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Override the User-Agent header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_BASE_URL.into()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RefreshSettings {
    /// Seconds between bulk refreshes. `0` turns the timer off.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound for one catalog or schedule fetch.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Ceiling for the backed-off refresh period after failures.
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    radiotabla_core::config::DEFAULT_REFRESH_INTERVAL.as_secs()
}
fn default_fetch_timeout_secs() -> u64 {
    radiotabla_core::config::DEFAULT_FETCH_TIMEOUT.as_secs()
}
fn default_max_backoff_secs() -> u64 {
    radiotabla_core::config::DEFAULT_MAX_BACKOFF.as_secs()
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Parsed and checked service base URL.
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let url: Url = self
            .api
            .url
            .parse()
            .map_err(|_| invalid("api.url", format!("invalid URL: {}", self.api.url)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(
                "api.url",
                format!("expected http or https, got '{other}'"),
            )),
        }
    }

    /// Transport settings for the HTTP client.
    pub fn transport_config(&self) -> Result<TransportConfig, ConfigError> {
        if self.api.timeout_secs == 0 {
            return Err(invalid("api.timeout_secs", "must be greater than zero"));
        }
        let mut transport =
            TransportConfig::default().with_timeout(Duration::from_secs(self.api.timeout_secs));
        if let Some(agent) = &self.api.user_agent {
            if agent.trim().is_empty() {
                return Err(invalid("api.user_agent", "must not be blank"));
            }
            transport.user_agent.clone_from(agent);
        }
        Ok(transport)
    }

    /// Runtime pacing for the coordinator.
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        let refresh = &self.refresh;
        if refresh.fetch_timeout_secs == 0 {
            return Err(invalid("refresh.fetch_timeout_secs", "must be greater than zero"));
        }
        if refresh.interval_secs > 0 && refresh.max_backoff_secs < refresh.interval_secs {
            return Err(invalid(
                "refresh.max_backoff_secs",
                format!(
                    "must be at least refresh.interval_secs ({})",
                    refresh.interval_secs
                ),
            ));
        }
        Ok(CoordinatorConfig {
            refresh_interval: Duration::from_secs(refresh.interval_secs),
            fetch_timeout: Duration::from_secs(refresh.fetch_timeout_secs),
            max_backoff: Duration::from_secs(refresh.max_backoff_secs),
            initial_refresh: true,
        })
    }

    pub fn favorite(&self) -> Option<ChannelId> {
        self.favorite_channel.map(ChannelId::new)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("se", "radiotabla", "radiotabla").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("radiotabla");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, still honoring `RADIOTABLA_*` overrides.
///
/// A missing file is not an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
