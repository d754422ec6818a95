// ── Core error types ──
//
// User-facing errors from radiotabla-core. Consumers never see HTTP
// status codes or XML parse failures directly: the `From<radiotabla_api::Error>`
// impl folds every transport-layer error into the three fetch failure
// classes the display layer knows how to talk about.

use std::io;

use serde::Serialize;
use strum::{Display, EnumIter, IntoStaticStr};
use thiserror::Error;

/// Classified failure of a single fetch operation.
///
/// Every failure maps to exactly one class, and every class maps to
/// exactly one user-facing message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumIter, IntoStaticStr,
)]
pub enum FetchFailure {
    /// The service host name could not be resolved.
    HostUnreachable,
    /// Connecting or talking on the socket failed.
    NetworkUnreachable,
    /// Timeouts, unexpected HTTP status, malformed responses, anything else.
    Other,
}

impl FetchFailure {
    /// The message shown to the user for this failure class.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::HostUnreachable => {
                "API host not reachable. Please check your internet connection."
            }
            Self::NetworkUnreachable => {
                "Network unreachable or other socket-related issues. Please check your internet connection."
            }
            Self::Other => "An unexpected error occurred.",
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Fetch errors ─────────────────────────────────────────────────
    #[error("{}", kind.user_message())]
    Fetch {
        kind: FetchFailure,
        /// Technical detail for logs; never shown as the headline.
        detail: String,
    },

    #[error("Fetch timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Channel not found: {id}")]
    ChannelNotFound { id: u32 },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Coordinator is not running")]
    CoordinatorStopped,
}

impl CoreError {
    /// The failure class this error is reported under.
    pub fn failure(&self) -> FetchFailure {
        match self {
            Self::Fetch { kind, .. } => *kind,
            Self::Timeout { .. }
            | Self::ChannelNotFound { .. }
            | Self::Config { .. }
            | Self::CoordinatorStopped => FetchFailure::Other,
        }
    }

    /// The one line shown to the user for this error.
    pub fn user_message(&self) -> &'static str {
        self.failure().user_message()
    }

    /// Technical detail suitable for logs.
    pub fn detail(&self) -> String {
        match self {
            Self::Fetch { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<radiotabla_api::Error> for CoreError {
    fn from(err: radiotabla_api::Error) -> Self {
        let kind = classify(&err);
        Self::Fetch {
            kind,
            detail: err.to_string(),
        }
    }
}

fn classify(err: &radiotabla_api::Error) -> FetchFailure {
    if err.is_timeout() {
        return FetchFailure::Other;
    }
    if err.is_dns_failure() {
        return FetchFailure::HostUnreachable;
    }
    if err.is_connect() {
        return FetchFailure::NetworkUnreachable;
    }
    match err.io_error_kind() {
        Some(
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkDown,
        ) => FetchFailure::NetworkUnreachable,
        _ => FetchFailure::Other,
    }
}
