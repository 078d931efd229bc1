use std::fmt;

use rustls::pki_types::CertificateDer;

use super::certificate::SubjectNames;
use crate::protocol::Protocol;

/// What a completed TLS handshake negotiated.
#[derive(Clone)]
pub struct Handshake {
    tls_version: String,
    cipher_suite: String,
    peer_certificates: Vec<CertificateDer<'static>>,
    protocol: Option<Protocol>,
    peer_names: SubjectNames,
}

impl Handshake {
    /// Records a handshake. The leaf certificate, if any, is the first of
    /// `peer_certificates`; its subject names are read up front.
    #[must_use]
    pub fn new(
        tls_version: impl Into<String>,
        cipher_suite: impl Into<String>,
        peer_certificates: Vec<CertificateDer<'static>>,
        protocol: Option<Protocol>,
    ) -> Self {
        let peer_names = peer_certificates
            .first()
            .and_then(|leaf| SubjectNames::from_der(leaf).ok())
            .unwrap_or_default();

        Self {
            tls_version: tls_version.into(),
            cipher_suite: cipher_suite.into(),
            peer_certificates,
            protocol,
            peer_names,
        }
    }

    pub(crate) fn from_rustls(connection: &rustls::ClientConnection) -> Self {
        let tls_version = connection
            .protocol_version()
            .map(|v| format!("{v:?}"))
            .unwrap_or_default();
        let cipher_suite = connection
            .negotiated_cipher_suite()
            .map(|suite| format!("{:?}", suite.suite()))
            .unwrap_or_default();
        let peer_certificates = connection
            .peer_certificates()
            .map(|certs| certs.iter().map(|cert| cert.clone().into_owned()).collect())
            .unwrap_or_default();
        let protocol = connection.alpn_protocol().and_then(Protocol::from_alpn);

        Self::new(tls_version, cipher_suite, peer_certificates, protocol)
    }

    #[must_use]
    pub fn tls_version(&self) -> &str {
        &self.tls_version
    }

    #[must_use]
    pub fn cipher_suite(&self) -> &str {
        &self.cipher_suite
    }

    #[must_use]
    pub fn peer_certificates(&self) -> &[CertificateDer<'static>] {
        &self.peer_certificates
    }

    /// The ALPN result, `None` when the server selected nothing.
    #[must_use]
    pub fn protocol(&self) -> Option<Protocol> {
        self.protocol
    }

    #[must_use]
    pub fn peer_names(&self) -> &SubjectNames {
        &self.peer_names
    }

    /// Whether the peer's leaf certificate is valid for `host`.
    #[must_use]
    pub fn verifies_host(&self, host: &str) -> bool {
        self.peer_names.matches(host)
    }
}

impl fmt::Debug for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshake")
            .field("tls_version", &self.tls_version)
            .field("cipher_suite", &self.cipher_suite)
            .field("peer_certificates", &self.peer_certificates.len())
            .field("protocol", &self.protocol)
            .field("peer_names", &self.peer_names.dns_names)
            .finish()
    }
}
