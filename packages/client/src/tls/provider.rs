//! TLS provider seam and its rustls implementation

use std::fmt;
use std::io::BufReader;
use std::sync::Arc;

use futures::future::BoxFuture;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

use super::errors::TlsError;
use super::handshake::Handshake;
use crate::connect::BoxedIo;
use crate::protocol::Protocol;

/// Performs client TLS handshakes.
///
/// Two addresses only share pooled connections when they hold the same
/// provider instance.
pub trait TlsProvider: Send + Sync + 'static {
    /// Runs the handshake for `host` over `io`, offering `protocols` via ALPN.
    fn handshake<'a>(
        &'a self,
        io: BoxedIo,
        host: &'a str,
        protocols: &'a [Protocol],
    ) -> BoxFuture<'a, Result<(BoxedIo, Handshake), TlsError>>;
}

/// rustls client using the `ring` crypto provider.
#[derive(Clone)]
pub struct RustlsProvider {
    config: Arc<ClientConfig>,
}

impl RustlsProvider {
    /// Verifies servers against `roots`.
    ///
    /// # Errors
    ///
    /// Returns `TlsError::Configuration` if the crypto provider rejects the
    /// default protocol versions.
    pub fn new(roots: RootCertStore) -> Result<Self, TlsError> {
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .map_err(|e| TlsError::Configuration(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self::with_config(config))
    }

    /// Uses a caller-built configuration. Its ALPN list is replaced per
    /// handshake with the address's protocols.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl fmt::Debug for RustlsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RustlsProvider")
            .field("alpn_protocols", &self.config.alpn_protocols.len())
            .finish()
    }
}

impl TlsProvider for RustlsProvider {
    fn handshake<'a>(
        &'a self,
        io: BoxedIo,
        host: &'a str,
        protocols: &'a [Protocol],
    ) -> BoxFuture<'a, Result<(BoxedIo, Handshake), TlsError>> {
        Box::pin(async move {
            let server_name = ServerName::try_from(host.to_string())
                .map_err(|e| TlsError::InvalidHostname(format!("{host}: {e}")))?;

            let mut config = (*self.config).clone();
            config.alpn_protocols = Protocol::alpn_ids(protocols);

            let stream = TlsConnector::from(Arc::new(config))
                .connect(server_name, io)
                .await
                .map_err(TlsError::from_handshake_io)?;

            let handshake = Handshake::from_rustls(stream.get_ref().1);
            tracing::debug!(
                target: "hopwire::tls",
                host,
                version = handshake.tls_version(),
                cipher = handshake.cipher_suite(),
                alpn = ?handshake.protocol(),
                "handshake complete"
            );

            Ok((Box::new(stream) as BoxedIo, handshake))
        })
    }
}

/// Reads every certificate in a PEM bundle into a root store.
///
/// # Errors
///
/// Returns `TlsError::Certificate` if the bundle is malformed or holds no
/// usable certificate.
pub fn roots_from_pem(pem: &[u8]) -> Result<RootCertStore, TlsError> {
    let mut roots = RootCertStore::empty();
    let mut reader = BufReader::new(pem);

    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| TlsError::Certificate(format!("invalid PEM: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| TlsError::Certificate(e.to_string()))?;
    }

    if roots.is_empty() {
        return Err(TlsError::Certificate("no certificates in PEM bundle".to_string()));
    }
    Ok(roots)
}
