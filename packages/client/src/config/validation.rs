//! Configuration validation
//!
//! Rejects settings that would make the engine misbehave before any call runs.

use std::time::Duration;

use super::types::HttpConfig;
use crate::protocol::Protocol;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid protocol list: {0}")]
    InvalidProtocols(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration conflict: {0}")]
    Conflict(String),
}

/// Configuration validation trait
pub trait Validator {
    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant if any validation fails:
    /// - `InvalidTimeout` - if a timeout is zero or exceeds one hour
    /// - `InvalidProtocols` - if the protocol list is unusable
    /// - `InvalidParameter` - if a limit is outside its valid range
    fn validate(&self) -> ConfigResult<()>;
}

/// Common configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate timeout duration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` if the duration is zero or
    /// exceeds one hour.
    pub fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot be zero"
            )));
        }

        if timeout.as_secs() > 3600 {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot exceed 1 hour"
            )));
        }

        Ok(())
    }

    /// Validate that a limit is at least one
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidParameter` if `value` is zero.
    pub fn validate_at_least_one(value: usize, name: &str) -> ConfigResult<()> {
        if value == 0 {
            return Err(ConfigurationError::InvalidParameter(format!(
                "{name} must be at least 1, was {value}"
            )));
        }
        Ok(())
    }

    /// Validate the offered protocol list
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidProtocols` if the list offers
    /// HTTP/1.0, lacks HTTP/1.1 while offering anything besides prior
    /// knowledge, or mixes prior knowledge with other protocols.
    pub fn validate_protocols(protocols: &[Protocol]) -> ConfigResult<()> {
        if protocols.contains(&Protocol::Http10) {
            return Err(ConfigurationError::InvalidProtocols(
                "http/1.0 must not be offered".to_string(),
            ));
        }

        if protocols.contains(&Protocol::H2PriorKnowledge) {
            if protocols.len() > 1 {
                return Err(ConfigurationError::InvalidProtocols(format!(
                    "h2_prior_knowledge cannot be combined with other protocols: {protocols:?}"
                )));
            }
            return Ok(());
        }

        if !protocols.contains(&Protocol::Http11) {
            return Err(ConfigurationError::InvalidProtocols(format!(
                "protocols must contain http/1.1 or h2_prior_knowledge: {protocols:?}"
            )));
        }

        Ok(())
    }
}

impl Validator for HttpConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_timeout(self.connect_timeout, "connect_timeout")?;
        if let Some(call_timeout) = self.call_timeout {
            ConfigValidator::validate_timeout(call_timeout, "call_timeout")?;
        }
        ConfigValidator::validate_timeout(self.pool_keep_alive, "pool_keep_alive")?;
        if self.fast_fallback {
            ConfigValidator::validate_timeout(self.fast_fallback_delay, "fast_fallback_delay")?;
        }
        ConfigValidator::validate_protocols(&self.protocols)?;
        ConfigValidator::validate_at_least_one(
            self.http2_max_concurrent_streams,
            "http2_max_concurrent_streams",
        )?;
        ConfigValidator::validate_at_least_one(self.max_requests, "max_requests")?;
        ConfigValidator::validate_at_least_one(
            self.max_requests_per_host,
            "max_requests_per_host",
        )?;
        Ok(())
    }
}
