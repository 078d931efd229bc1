//! TLS negotiation
//!
//! [`TlsProvider`] performs the client handshake over an established stream
//! and reports what was negotiated as a [`Handshake`]. [`RustlsProvider`] is
//! the production implementation; [`Platform`] picks its trust roots.

pub mod certificate;
pub mod errors;
pub mod handshake;
pub mod platform;
pub mod provider;

pub use certificate::SubjectNames;
pub use errors::TlsError;
pub use handshake::Handshake;
pub use platform::Platform;
pub use provider::{RustlsProvider, TlsProvider};
