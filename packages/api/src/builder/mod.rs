//! Fluent client and request builders
//!
//! [`ClientBuilder`] configures the engine and produces a [`Client`];
//! [`RequestBuilder`] assembles one request and runs it as a call.

pub mod core;
pub mod methods;
pub mod network;
pub mod request;

pub use core::{Client, ClientBuilder};
pub use request::{ContentType, RequestBuilder};
