//! HTTP CONNECT tunnel establishment
//!
//! Opens a tunnel through an HTTP proxy so TLS to the origin can run over it.

use std::io;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::socket::BoxedIo;
use crate::proxy::Credentials;

const MAX_RESPONSE_HEAD: usize = 8 * 1024;

/// Sends `CONNECT host:port` over `io` and waits for a 2xx answer.
///
/// The response head is read one byte at a time so nothing past the blank
/// line is consumed; the proxy's first tunnelled byte belongs to TLS.
pub async fn establish(
    mut io: BoxedIo,
    host: &str,
    port: u16,
    credentials: Option<&Credentials>,
) -> io::Result<BoxedIo> {
    let authority = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };

    let mut request = format!(
        "CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\nProxy-Connection: Keep-Alive\r\n"
    );
    if let Some(credentials) = credentials {
        let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
        request.push_str(&format!("Proxy-Authorization: Basic {token}\r\n"));
    }
    request.push_str("\r\n");

    io.write_all(request.as_bytes()).await?;
    io.flush().await?;

    let head = read_response_head(&mut io).await?;
    let status_line = head.lines().next().unwrap_or_default();
    let status = parse_status(status_line)?;

    match status {
        200..=299 => {
            tracing::debug!(target: "hopwire::connect", %authority, status, "tunnel established");
            Ok(io)
        }
        407 => Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("proxy authentication required for {authority}"),
        )),
        _ => Err(io::Error::other(format!(
            "unexpected response to CONNECT {authority}: {status_line}"
        ))),
    }
}

async fn read_response_head(io: &mut BoxedIo) -> io::Result<String> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "CONNECT response head too large",
            ));
        }
        if io.read(&mut byte).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "proxy closed the connection during CONNECT",
            ));
        }
        head.push(byte[0]);
    }

    String::from_utf8(head).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn parse_status(status_line: &str) -> io::Result<u16> {
    let mut parts = status_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/1.") => code
            .parse::<u16>()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, status_line.to_string())),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("malformed CONNECT status line: {status_line:?}"),
        )),
    }
}
