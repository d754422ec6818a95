// ── Shared state ──

mod cache;
mod catalog;

pub use cache::{CacheSnapshot, Completion, FetchState, FetchTicket, ScheduleCache};
pub use catalog::{Catalog, CatalogSnapshot, merge_schedules};
