// radiotabla-core: Schedule cache and refresh coordination between radiotabla-api and consumers.

pub mod backoff;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod model;
pub mod store;
pub mod stream;
pub mod window;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::CoordinatorConfig;
pub use coordinator::{ChannelFailure, Coordinator, Notice, RefreshReport};
pub use error::{CoreError, FetchFailure};
pub use fetch::{ScheduleSource, fetch_dates, fetch_schedule};
pub use store::{Catalog, Completion, FetchState, FetchTicket, ScheduleCache};
pub use stream::{DisplayState, DisplayStream};
pub use window::RelevanceWindow;

// Re-export model types at the crate root for ergonomics.
pub use model::{Bucket, Channel, ChannelId, ProgramEntry, ProgramIdentity};

// The client the CLI wires in as the production `ScheduleSource`.
pub use radiotabla_api::{DEFAULT_BASE_URL, SrClient, TransportConfig};
