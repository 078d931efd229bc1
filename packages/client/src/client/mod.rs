//! HTTP client modules with focused separation of concerns
//!
//! `core` holds the shared client state, `configuration` its builder and
//! `stats` the counters every call updates.

pub mod configuration;
pub mod core;
pub mod stats;

pub use configuration::HttpClientBuilder;
pub use core::HttpClient;
pub use stats::{ClientStats, ClientStatsSnapshot};
