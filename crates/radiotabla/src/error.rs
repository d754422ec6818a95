//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use radiotabla_config::ConfigError;
use radiotabla_core::{CoreError, FetchFailure};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Fetch ────────────────────────────────────────────────────────
    #[error("{}", FetchFailure::HostUnreachable.user_message())]
    #[diagnostic(
        code(radiotabla::host_unreachable),
        help("Could not resolve the API host.\nDetail: {detail}")
    )]
    HostUnreachable { detail: String },

    #[error("{}", FetchFailure::NetworkUnreachable.user_message())]
    #[diagnostic(
        code(radiotabla::network_unreachable),
        help("Detail: {detail}\nCheck --api-url if you are not using the public service.")
    )]
    NetworkUnreachable { detail: String },

    #[error("{}", FetchFailure::Other.user_message())]
    #[diagnostic(code(radiotabla::unexpected), help("Detail: {detail}"))]
    Unexpected { detail: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(radiotabla::timeout),
        help("Increase the limit with --timeout or refresh.fetch_timeout_secs in the config.")
    )]
    Timeout { seconds: u64 },

    // ── Channels ─────────────────────────────────────────────────────
    #[error("Channel {id} not found")]
    #[diagnostic(
        code(radiotabla::channel_not_found),
        help("Run: radiotabla channels to see available channel IDs")
    )]
    ChannelNotFound { id: u32 },

    #[error("No channel given")]
    #[diagnostic(
        code(radiotabla::no_channel),
        help(
            "Pass a channel ID, or set a default with:\n\
             radiotabla config init --favorite <ID>"
        )
    )]
    NoChannel,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(radiotabla::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists at {path}")]
    #[diagnostic(
        code(radiotabla::config_exists),
        help("Use --force to overwrite it.")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(radiotabla::config))]
    Config(Box<ConfigError>),

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("The schedule coordinator stopped unexpectedly")]
    #[diagnostic(code(radiotabla::stopped))]
    Stopped,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(radiotabla::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(radiotabla::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::HostUnreachable { .. } | Self::NetworkUnreachable { .. } => {
                exit_code::CONNECTION
            }
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::ChannelNotFound { .. } => exit_code::NOT_FOUND,
            Self::NoChannel | Self::Validation { .. } => exit_code::USAGE,
            Self::ConfigExists { .. } => exit_code::CONFLICT,
            _ => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Fetch { kind, detail } => match kind {
                FetchFailure::HostUnreachable => Self::HostUnreachable { detail },
                FetchFailure::NetworkUnreachable => Self::NetworkUnreachable { detail },
                FetchFailure::Other => Self::Unexpected { detail },
            },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::ChannelNotFound { id } => Self::ChannelNotFound { id },
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::CoordinatorStopped => Self::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failures_keep_their_user_message() {
        let host: CliError = CoreError::Fetch {
            kind: FetchFailure::HostUnreachable,
            detail: "dns error".into(),
        }
        .into();
        let other: CliError = CoreError::Fetch {
            kind: FetchFailure::Other,
            detail: "HTTP 500".into(),
        }
        .into();

        assert_eq!(
            host.to_string(),
            "API host not reachable. Please check your internet connection."
        );
        assert_eq!(other.to_string(), "An unexpected error occurred.");
        assert_eq!(host.exit_code(), exit_code::CONNECTION);
        assert_eq!(other.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn timeout_and_missing_channel_codes() {
        let timeout: CliError = CoreError::Timeout { timeout_secs: 30 }.into();
        let missing: CliError = CoreError::ChannelNotFound { id: 9 }.into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err: CliError = ConfigError::Validation {
            field: "api.url".into(),
            reason: "bad".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
