// radiotabla-api: Async Rust client for the Sveriges Radio open API
//
// Thin transport layer: builds requests for the channel and schedule
// endpoints and decodes the XML documents into raw wire types. No
// normalization or caching happens here.

pub mod error;
pub mod sr;
pub mod transport;

pub use error::Error;
pub use sr::SrClient;
pub use sr::client::DEFAULT_BASE_URL;
pub use transport::TransportConfig;
