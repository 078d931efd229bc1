//! TLS-specific error types

use std::io;

/// TLS-specific error types for detailed error handling
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
    #[error("Certificate rejected: {0}")]
    Certificate(String),
    #[error("Invalid server name: {0}")]
    InvalidHostname(String),
    #[error("TLS configuration error: {0}")]
    Configuration(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl TlsError {
    /// Classifies an error returned by a TLS stream during the handshake.
    ///
    /// Certificate problems are distinguished from transport failures so
    /// that the former are never retried on another route.
    #[must_use]
    pub fn from_handshake_io(err: io::Error) -> TlsError {
        let rustls_error = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>());

        match rustls_error {
            Some(rustls::Error::InvalidCertificate(reason)) => {
                TlsError::Certificate(format!("{reason:?}"))
            }
            Some(other) => TlsError::Handshake(other.to_string()),
            None => TlsError::Io(err),
        }
    }
}
