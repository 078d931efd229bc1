//! SOCKS5 CONNECT handshake (RFC 1928), no authentication
//!
//! The origin host name is sent unresolved so the proxy performs DNS.

use std::io;
use std::net::IpAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::socket::BoxedIo;

const VERSION: u8 = 0x05;
const NO_AUTH: u8 = 0x00;
const CMD_CONNECT: u8 = 0x01;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Asks the proxy on the other end of `io` to connect to `host:port`.
pub async fn connect(mut io: BoxedIo, host: &str, port: u16) -> io::Result<BoxedIo> {
    io.write_all(&[VERSION, 1, NO_AUTH]).await?;

    let mut auth_response = [0u8; 2];
    io.read_exact(&mut auth_response).await?;
    if auth_response != [VERSION, NO_AUTH] {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("SOCKS5 proxy refused unauthenticated access: {auth_response:?}"),
        ));
    }

    let mut request = vec![VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ipv4)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ipv4.octets());
        }
        Ok(IpAddr::V6(ipv6)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ipv6.octets());
        }
        Err(_) => {
            let len = u8::try_from(host.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "SOCKS5 host name too long")
            })?;
            request.push(ATYP_DOMAIN);
            request.push(len);
            request.extend_from_slice(host.as_bytes());
        }
    }
    request.extend_from_slice(&port.to_be_bytes());
    io.write_all(&request).await?;

    let mut response = [0u8; 4];
    io.read_exact(&mut response).await?;
    if response[0] != VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unexpected SOCKS version {}", response[0]),
        ));
    }
    if response[1] != 0x00 {
        return Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("SOCKS5 connect to {host}:{port} rejected: {}", reply_message(response[1])),
        ));
    }

    // Bound address is read and discarded.
    let remaining = match response[3] {
        ATYP_IPV4 => 4 + 2,
        ATYP_IPV6 => 16 + 2,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            io.read_exact(&mut len).await?;
            usize::from(len[0]) + 2
        }
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid SOCKS5 address type {other}"),
            ));
        }
    };
    let mut bound = vec![0u8; remaining];
    io.read_exact(&mut bound).await?;

    tracing::debug!(target: "hopwire::connect", host, port, "SOCKS5 tunnel established");
    Ok(io)
}

fn reply_message(code: u8) -> &'static str {
    match code {
        0x01 => "general failure",
        0x02 => "connection not allowed by ruleset",
        0x03 => "network unreachable",
        0x04 => "host unreachable",
        0x05 => "connection refused",
        0x06 => "TTL expired",
        0x07 => "command not supported",
        0x08 => "address type not supported",
        _ => "unknown error",
    }
}
