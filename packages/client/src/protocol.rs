//! Application protocols a connection can speak.

use std::fmt;
use std::str::FromStr;

/// Protocols negotiated with ALPN or assumed by prior knowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// HTTP/1.0, only ever observed on responses.
    Http10,
    Http11,
    /// HTTP/2 negotiated over TLS.
    Http2,
    /// Cleartext HTTP/2 without an upgrade round trip.
    H2PriorKnowledge,
}

impl Protocol {
    /// The ALPN identifier, also used for logging and parsing.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http10 => "http/1.0",
            Protocol::Http11 => "http/1.1",
            Protocol::Http2 => "h2",
            Protocol::H2PriorKnowledge => "h2_prior_knowledge",
        }
    }

    /// Whether a single connection can carry concurrent streams.
    #[must_use]
    pub const fn is_multiplexed(&self) -> bool {
        matches!(self, Protocol::Http2 | Protocol::H2PriorKnowledge)
    }

    /// Whether the protocol is offered in a TLS ALPN extension.
    #[must_use]
    pub const fn is_alpn(&self) -> bool {
        matches!(self, Protocol::Http11 | Protocol::Http2)
    }

    /// ALPN identifiers for the TLS-capable protocols in `protocols`, in order.
    #[must_use]
    pub fn alpn_ids(protocols: &[Protocol]) -> Vec<Vec<u8>> {
        protocols
            .iter()
            .filter(|p| p.is_alpn())
            .map(|p| p.as_str().as_bytes().to_vec())
            .collect()
    }

    /// Maps a negotiated ALPN identifier back to a protocol.
    #[must_use]
    pub fn from_alpn(id: &[u8]) -> Option<Protocol> {
        match id {
            b"http/1.0" => Some(Protocol::Http10),
            b"http/1.1" => Some(Protocol::Http11),
            b"h2" => Some(Protocol::Http2),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http/1.0" => Ok(Protocol::Http10),
            "http/1.1" => Ok(Protocol::Http11),
            "h2" => Ok(Protocol::Http2),
            "h2_prior_knowledge" => Ok(Protocol::H2PriorKnowledge),
            other => Err(format!("unexpected protocol: {other}")),
        }
    }
}
