use std::error::Error as StdError;
use std::io;

use thiserror::Error;

/// Top-level error type for the `radiotabla-api` crate.
///
/// Covers every failure mode of a single request against the schedule
/// service: transport, HTTP status, and wire decoding. `radiotabla-core`
/// classifies these into the user-facing failure taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failed to construct the HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Service ─────────────────────────────────────────────────────
    /// The service answered with a non-success status.
    #[error("Unexpected HTTP {status} from {url}")]
    Status { status: u16, url: String },

    // ── Data ────────────────────────────────────────────────────────
    /// XML deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the request timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }

    /// Returns `true` if the failure happened while establishing a connection.
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_connect())
    }

    /// Returns `true` if the host name could not be resolved.
    ///
    /// The resolver error is buried a few levels down the source chain
    /// (reqwest → hyper-util connect error → resolver), so this walks the
    /// chain looking for the connector's "dns error" marker.
    pub fn is_dns_failure(&self) -> bool {
        let Self::Transport(e) = self else {
            return false;
        };
        source_chain(e).any(|cause| {
            let text = cause.to_string();
            text.contains("dns error") || text.contains("failed to lookup address")
        })
    }

    /// The first `std::io::Error` kind found in the source chain, if any.
    pub fn io_error_kind(&self) -> Option<io::ErrorKind> {
        let Self::Transport(e) = self else {
            return None;
        };
        source_chain(e).find_map(|cause| cause.downcast_ref::<io::Error>().map(io::Error::kind))
    }

    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

fn source_chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}
