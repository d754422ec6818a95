// ── Runtime coordinator configuration ──
//
// Describes *how* the coordinator paces its work. Never touches disk:
// the CLI builds one from `radiotabla-config` and hands it in.

use std::time::Duration;

/// Default period between bulk refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
/// Default upper bound for a single catalog or schedule fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Default ceiling for the backed-off refresh period.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Period of the bulk refresh timer. `Duration::ZERO` disables the timer.
    pub refresh_interval: Duration,
    /// Per-fetch timeout, applied to catalog and schedule fetches alike.
    pub fetch_timeout: Duration,
    /// Ceiling for the exponential backoff after failed refreshes.
    pub max_backoff: Duration,
    /// Issue a bulk refresh (catalog load) as soon as the coordinator starts.
    pub initial_refresh: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_backoff: DEFAULT_MAX_BACKOFF,
            initial_refresh: true,
        }
    }
}

impl CoordinatorConfig {
    /// One-shot use: no background timer.
    pub fn without_timer(mut self) -> Self {
        self.refresh_interval = Duration::ZERO;
        self
    }
}
