//! Socket factory seam and its TCP implementation

use std::io;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::config::HttpConfig;
use crate::route::SocketTarget;

/// A bidirectional byte stream a connection runs over.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

/// Owned, type-erased connection stream.
pub type BoxedIo = Box<dyn Io>;

/// Opens raw sockets.
///
/// The target is [`SocketTarget::Unresolved`] when connecting to a proxy
/// by name; implementations resolve it themselves.
pub trait SocketFactory: Send + Sync + 'static {
    fn connect<'a>(&'a self, target: &'a SocketTarget) -> BoxFuture<'a, io::Result<BoxedIo>>;
}

/// Plain TCP sockets with nodelay and keep-alive applied.
#[derive(Debug, Clone)]
pub struct TcpSocketFactory {
    nodelay: bool,
    keepalive: Option<Duration>,
}

impl Default for TcpSocketFactory {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

impl TcpSocketFactory {
    #[must_use]
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            nodelay: config.tcp_nodelay,
            keepalive: config.tcp_keepalive,
        }
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(self.nodelay)?;

        if let Some(time) = self.keepalive {
            let keepalive = socket2::TcpKeepalive::new().with_time(time);
            socket2::SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
        }

        Ok(())
    }
}

impl SocketFactory for TcpSocketFactory {
    fn connect<'a>(&'a self, target: &'a SocketTarget) -> BoxFuture<'a, io::Result<BoxedIo>> {
        Box::pin(async move {
            let stream = match target {
                SocketTarget::Resolved(addr) => TcpStream::connect(*addr).await?,
                SocketTarget::Unresolved { host, port } => {
                    TcpStream::connect((host.as_str(), *port)).await?
                }
            };

            self.configure(&stream)?;
            tracing::trace!(
                target: "hopwire::connect",
                %target,
                local = ?stream.local_addr().ok(),
                "socket connected"
            );
            Ok(Box::new(stream) as BoxedIo)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connects_to_resolved_and_unresolved_targets() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let factory = TcpSocketFactory::default();

        factory.connect(&SocketTarget::Resolved(addr)).await.unwrap();
        factory
            .connect(&SocketTarget::Unresolved {
                host: "localhost".to_string(),
                port: addr.port(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn refused_connections_surface_io_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpSocketFactory::default()
            .connect(&SocketTarget::Resolved(addr))
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }
}
