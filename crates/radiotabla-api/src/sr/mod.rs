// Sveriges Radio open API client modules
//
// Hand-written client for the `/api/v2` XML endpoints. Every document is
// wrapped in an `<sr>` root; the payload types strip that wrapper before
// the caller sees them.

pub mod channels;
pub mod client;
pub mod models;
pub mod schedule;

pub use client::SrClient;
