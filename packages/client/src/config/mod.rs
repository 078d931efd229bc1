//! Client configuration
//!
//! [`HttpConfig`] holds every tunable of the engine; builder methods live in
//! `builders.rs` and consistency checks in `validation.rs`.

mod builders;
pub mod types;
pub mod validation;

pub use types::HttpConfig;
pub use validation::{ConfigResult, ConfigValidator, ConfigurationError, Validator};
