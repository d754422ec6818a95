// ── Domain model ──
//
// Canonical channel and schedule types. Everything downstream of the
// decoder (cache, catalog, coordinator, CLI) speaks these types only.

pub mod bucket;
pub mod channel;
pub mod program;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use radiotabla_core::model::*` gives you everything.

pub use bucket::Bucket;
pub use channel::{Channel, ChannelId};
pub use program::{ProgramEntry, ProgramIdentity};
