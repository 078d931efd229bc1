mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use hopwire_client::{
    Exchange, ExchangeCodec, HttpClient, HttpRequest, HttpResponse, Protocol, StatusCode,
    StreamError,
};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Just enough HTTP/1.1 to exercise a real socket.
struct Http11Codec;

impl ExchangeCodec for Http11Codec {
    fn exchange<'a>(
        &'a self,
        exchange: &'a Exchange,
        request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, StreamError>> {
        Box::pin(async move {
            let mut io = exchange.connection().lock_io().await?;
            let head = format!(
                "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: 0\r\n\r\n",
                request.method(),
                request.url().path(),
                request.host()
            );
            io.write_all(head.as_bytes()).await?;
            io.flush().await?;

            let mut head = Vec::new();
            while !head.ends_with(b"\r\n\r\n") {
                let mut byte = [0u8; 1];
                if io.read(&mut byte).await? == 0 {
                    return Err(StreamError::ConnectionShutdown);
                }
                head.push(byte[0]);
            }
            let head = String::from_utf8_lossy(&head).into_owned();

            let status = head
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse::<u16>().ok())
                .and_then(|code| StatusCode::from_u16(code).ok())
                .ok_or_else(|| StreamError::Protocol(format!("bad status line: {head}")))?;
            let length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            let mut body = vec![0u8; length];
            io.read_exact(&mut body).await?;
            Ok(HttpResponse::new(status).with_body(Bytes::from(body)))
        })
    }
}

struct Server {
    port: u16,
    accepted: Arc<AtomicUsize>,
    closed: mpsc::UnboundedReceiver<()>,
}

async fn serve(body: &'static str) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let accepted = Arc::new(AtomicUsize::new(0));
    let (closed_tx, closed) = mpsc::unbounded_channel();

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut reader = BufReader::new(read);
                loop {
                    let mut line = String::new();
                    let mut eof = false;
                    loop {
                        line.clear();
                        if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                            eof = true;
                            break;
                        }
                        if line == "\r\n" {
                            break;
                        }
                    }
                    if eof {
                        let _ = closed_tx.send(());
                        return;
                    }
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}",
                        body.len()
                    );
                    if write.write_all(response.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    Server {
        port,
        accepted,
        closed,
    }
}

fn client() -> HttpClient {
    HttpClient::builder()
        .without_tls()
        .codec(Arc::new(Http11Codec))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_calls_share_one_tcp_connection() {
    let server = serve("hello").await;
    let client = client();
    let url = format!("http://127.0.0.1:{}/greeting", server.port);

    for _ in 0..2 {
        let response = client
            .new_call(HttpRequest::get(url.as_str()).unwrap())
            .execute()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_text(), "hello");
        assert_eq!(response.protocol(), Protocol::Http11);
    }

    assert_eq!(server.accepted.load(Ordering::SeqCst), 1);
    let stats = client.stats().snapshot();
    assert_eq!(stats.connections_established, 1);
    assert_eq!(stats.pool_hits, 1);
    assert_eq!(stats.requests_successful, 2);
}

#[tokio::test]
async fn test_shutdown_closes_the_socket() {
    let mut server = serve("bye").await;
    let client = client();
    let url = format!("http://127.0.0.1:{}/", server.port);

    client
        .new_call(HttpRequest::get(url.as_str()).unwrap())
        .execute()
        .await
        .unwrap();
    client.shutdown();

    tokio::time::timeout(Duration::from_secs(5), server.closed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.connection_pool().connection_count(), 0);
}

#[tokio::test]
async fn test_refused_port_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = client();
    let url = format!("http://127.0.0.1:{port}/");
    let err = client
        .new_call(HttpRequest::get(url.as_str()).unwrap())
        .execute()
        .await
        .unwrap_err();

    assert!(err.is_route_exhausted());
    assert!(err.route_failures()[0].is_connect());
    assert_eq!(
        client.route_database().failed_routes()[0]
            .target()
            .to_string(),
        format!("127.0.0.1:{port}")
    );
}
