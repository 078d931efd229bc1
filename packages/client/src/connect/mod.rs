//! Socket establishment and proxy handshakes
//!
//! Everything that turns a [`Route`](crate::route::Route) into a byte stream
//! before TLS: the TCP connect itself, SOCKS5 negotiation and HTTP `CONNECT`
//! tunnels.

pub mod socket;
pub mod socks;
pub mod tunnel;

pub use socket::{BoxedIo, Io, SocketFactory, TcpSocketFactory};
