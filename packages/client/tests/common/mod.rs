#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use hopwire_client::connect::BoxedIo;
use hopwire_client::tls::{Handshake, TlsError, TlsProvider};
use hopwire_client::{
    Dns, DnsError, Error, EventListener, Exchange, ExchangeCodec, HttpClient, HttpClientBuilder,
    HttpRequest, HttpResponse, Protocol, RealConnection, Route, SocketFactory, SocketTarget,
    StatusCode, StreamError,
};
use rustls::pki_types::CertificateDer;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadBuf};
use tokio::sync::Notify;
use tokio::time::Instant;

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Answers lookups from a fixed table.
#[derive(Default)]
pub struct FakeDns {
    hosts: Mutex<HashMap<String, Vec<IpAddr>>>,
    lookups: Mutex<Vec<String>>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, host: &str, addresses: &[&str]) {
        self.hosts
            .lock()
            .unwrap()
            .insert(host.to_string(), addresses.iter().map(|a| ip(a)).collect());
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl Dns for FakeDns {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, Result<Vec<IpAddr>, DnsError>> {
        self.lookups.lock().unwrap().push(host.to_string());
        let answer = self.hosts.lock().unwrap().get(host).cloned();
        Box::pin(async move {
            answer.ok_or_else(|| DnsError::UnknownHost {
                host: host.to_string(),
                reason: "not in fake table".to_string(),
            })
        })
    }
}

/// What the fake socket factory does for one endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Connects; the peer never writes.
    Connect,
    Refuse,
    Hang,
    Delay(Duration),
    /// Connects with `bytes` already queued from the peer.
    Answer(&'static [u8]),
}

/// SOCKS5 peer accepting unauthenticated CONNECT, bound to 0.0.0.0:0.
pub const SOCKS5_GRANTED: &[u8] = &[5, 0, 5, 0, 0, 1, 0, 0, 0, 0, 0, 0];

pub const TUNNEL_ESTABLISHED: &[u8] = b"HTTP/1.1 200 Connection established\r\n\r\n";

pub const TUNNEL_AUTH_REQUIRED: &[u8] =
    b"HTTP/1.1 407 Proxy Authentication Required\r\nProxy-Authenticate: Basic\r\n\r\n";

/// In-memory sockets with per-IP behaviour. Every socket handed out is
/// counted until dropped.
pub struct FakeSocketFactory {
    default: Behavior,
    behaviors: Mutex<HashMap<IpAddr, Behavior>>,
    hosts: Mutex<HashMap<String, Behavior>>,
    attempts: Mutex<Vec<(SocketTarget, Instant)>>,
    peers: Mutex<Vec<DuplexStream>>,
    open: Arc<AtomicUsize>,
}

impl Default for FakeSocketFactory {
    fn default() -> Self {
        Self {
            default: Behavior::Connect,
            behaviors: Mutex::new(HashMap::new()),
            hosts: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
            peers: Mutex::new(Vec::new()),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeSocketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, address: &str, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(ip(address), behavior);
    }

    /// Behaviour for unresolved targets naming `host`, as SOCKS routes use.
    pub fn set_host(&self, host: &str, behavior: Behavior) {
        self.hosts.lock().unwrap().insert(host.to_string(), behavior);
    }

    /// Bytes the client has written to the `index`th socket so far.
    pub fn received(&self, index: usize) -> Vec<u8> {
        let mut peers = self.peers.lock().unwrap();
        let peer = &mut peers[index];
        let mut received = Vec::new();
        let mut chunk = [0u8; 1024];
        while let Some(Ok(read)) = peer.read(&mut chunk).now_or_never() {
            if read == 0 {
                break;
            }
            received.extend_from_slice(&chunk[..read]);
        }
        received
    }

    pub fn attempts(&self) -> Vec<SocketTarget> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(target, _)| target.clone())
            .collect()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn attempted_ips(&self) -> Vec<IpAddr> {
        self.attempts()
            .into_iter()
            .filter_map(|target| match target {
                SocketTarget::Resolved(addr) => Some(addr.ip()),
                SocketTarget::Unresolved { .. } => None,
            })
            .collect()
    }

    pub fn open_sockets(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    fn behavior(&self, target: &SocketTarget) -> Behavior {
        match target {
            SocketTarget::Resolved(addr) => self
                .behaviors
                .lock()
                .unwrap()
                .get(&addr.ip())
                .copied()
                .unwrap_or(self.default),
            SocketTarget::Unresolved { host, .. } => self
                .hosts
                .lock()
                .unwrap()
                .get(host)
                .copied()
                .unwrap_or(self.default),
        }
    }

    fn open_socket(&self) -> BoxedIo {
        self.open_socket_with(tokio::io::duplex(64 * 1024))
    }

    async fn answering_socket(&self, bytes: &[u8]) -> BoxedIo {
        let (client, mut server) = tokio::io::duplex(64 * 1024);
        server.write_all(bytes).await.unwrap();
        self.open_socket_with((client, server))
    }

    fn open_socket_with(&self, (client, server): (DuplexStream, DuplexStream)) -> BoxedIo {
        self.peers.lock().unwrap().push(server);
        self.open.fetch_add(1, Ordering::SeqCst);
        Box::new(TrackedIo {
            inner: client,
            open: Arc::clone(&self.open),
        })
    }
}

impl SocketFactory for FakeSocketFactory {
    fn connect<'a>(&'a self, target: &'a SocketTarget) -> BoxFuture<'a, io::Result<BoxedIo>> {
        self.attempts
            .lock()
            .unwrap()
            .push((target.clone(), Instant::now()));
        let behavior = self.behavior(target);
        Box::pin(async move {
            match behavior {
                Behavior::Connect => Ok(self.open_socket()),
                Behavior::Refuse => Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("{target} refused"),
                )),
                Behavior::Hang => futures::future::pending().await,
                Behavior::Delay(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(self.open_socket())
                }
                Behavior::Answer(bytes) => Ok(self.answering_socket(bytes).await),
            }
        })
    }
}

struct TrackedIo {
    inner: DuplexStream,
    open: Arc<AtomicUsize>,
}

impl Drop for TrackedIo {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AsyncRead for TrackedIo {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for TrackedIo {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Completes every handshake without touching the socket.
#[derive(Default)]
pub struct FakeTls {
    alpn: Option<Protocol>,
    certificates: Vec<CertificateDer<'static>>,
    untrusted_hosts: Vec<String>,
}

impl FakeTls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Negotiates `protocol` whenever the client offers it.
    pub fn with_alpn(mut self, protocol: Protocol) -> Self {
        self.alpn = Some(protocol);
        self
    }

    /// Presents a leaf certificate valid for `names`.
    pub fn with_certificate_for(mut self, names: &[&str]) -> Self {
        let names = names.iter().map(|name| (*name).to_string()).collect::<Vec<_>>();
        let certified = rcgen::generate_simple_self_signed(names).unwrap();
        self.certificates = vec![certified.cert.der().clone()];
        self
    }

    /// Fails certificate validation for `host`.
    pub fn untrusted(mut self, host: &str) -> Self {
        self.untrusted_hosts.push(host.to_string());
        self
    }
}

impl TlsProvider for FakeTls {
    fn handshake<'a>(
        &'a self,
        io: BoxedIo,
        host: &'a str,
        protocols: &'a [Protocol],
    ) -> BoxFuture<'a, Result<(BoxedIo, Handshake), TlsError>> {
        Box::pin(async move {
            if self.untrusted_hosts.iter().any(|untrusted| untrusted == host) {
                return Err(TlsError::Certificate(format!("{host}: untrusted")));
            }
            let protocol = self.alpn.filter(|alpn| protocols.contains(alpn));
            let handshake = Handshake::new(
                "TLSv1_3",
                "TLS13_AES_128_GCM_SHA256",
                self.certificates.clone(),
                protocol,
            );
            Ok((io, handshake))
        })
    }
}

/// Records event names in order.
#[derive(Default)]
pub struct RecordingEventListener {
    events: Mutex<Vec<String>>,
}

impl RecordingEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.split(' ').next().unwrap_or_default().to_string())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.names().iter().filter(|event| *event == name).count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

fn target_of(route: &Route) -> String {
    route.target().to_string()
}

impl EventListener for RecordingEventListener {
    fn call_start(&self, _request: &HttpRequest) {
        self.push("call_start".into());
    }

    fn dns_start(&self, host: &str) {
        self.push(format!("dns_start {host}"));
    }

    fn dns_end(&self, host: &str, _addresses: &[IpAddr]) {
        self.push(format!("dns_end {host}"));
    }

    fn connect_start(&self, route: &Route) {
        self.push(format!("connect_start {}", target_of(route)));
    }

    fn secure_connect_start(&self, route: &Route) {
        self.push(format!("secure_connect_start {}", target_of(route)));
    }

    fn secure_connect_end(&self, route: &Route, _handshake: &Handshake) {
        self.push(format!("secure_connect_end {}", target_of(route)));
    }

    fn connect_end(&self, route: &Route, protocol: Protocol) {
        self.push(format!("connect_end {} {protocol}", target_of(route)));
    }

    fn connect_failed(&self, route: &Route, _error: &Error) {
        self.push(format!("connect_failed {}", target_of(route)));
    }

    fn connection_acquired(&self, connection: &RealConnection) {
        self.push(format!("connection_acquired {}", connection.id()));
    }

    fn connection_released(&self, connection: &RealConnection) {
        self.push(format!("connection_released {}", connection.id()));
    }

    fn call_end(&self, _response: &HttpResponse) {
        self.push("call_end".into());
    }

    fn call_failed(&self, _error: &Error) {
        self.push("call_failed".into());
    }

    fn canceled(&self) {
        self.push("canceled".into());
    }
}

/// One scripted codec outcome.
pub enum Step {
    Respond(u16),
    Refuse,
    GoAway,
    Broken,
    /// Signals `entered`, then waits for `release` before responding.
    Hold {
        entered: Arc<Notify>,
        release: Arc<Notify>,
        status: u16,
    },
}

/// Plays back scripted outcomes; responds 200 once the script runs out.
#[derive(Default)]
pub struct ScriptedCodec {
    steps: Mutex<VecDeque<Step>>,
    connections: Mutex<Vec<u64>>,
}

impl ScriptedCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().unwrap().push_back(step);
    }

    /// Connection ids in exchange order.
    pub fn connections(&self) -> Vec<u64> {
        self.connections.lock().unwrap().clone()
    }
}

impl ExchangeCodec for ScriptedCodec {
    fn exchange<'a>(
        &'a self,
        exchange: &'a Exchange,
        _request: &'a HttpRequest,
    ) -> BoxFuture<'a, Result<HttpResponse, StreamError>> {
        self.connections
            .lock()
            .unwrap()
            .push(exchange.connection().id());
        let step = self.steps.lock().unwrap().pop_front();
        Box::pin(async move {
            match step.unwrap_or(Step::Respond(200)) {
                Step::Respond(status) => Ok(response(status)),
                Step::Refuse => Err(StreamError::RefusedStream),
                Step::GoAway => Err(StreamError::ConnectionShutdown),
                Step::Broken => Err(io::Error::from(io::ErrorKind::ConnectionReset).into()),
                Step::Hold {
                    entered,
                    release,
                    status,
                } => {
                    let released = release.notified();
                    entered.notify_one();
                    released.await;
                    Ok(response(status))
                }
            }
        })
    }
}

fn response(status: u16) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(status).unwrap())
}

/// A client wired to fakes.
pub struct Harness {
    pub client: HttpClient,
    pub dns: Arc<FakeDns>,
    pub sockets: Arc<FakeSocketFactory>,
    pub events: Arc<RecordingEventListener>,
    pub codec: Arc<ScriptedCodec>,
}

impl Harness {
    pub fn build(
        dns: FakeDns,
        sockets: FakeSocketFactory,
        tls: FakeTls,
        configure: impl FnOnce(HttpClientBuilder) -> HttpClientBuilder,
    ) -> Self {
        let dns = Arc::new(dns);
        let sockets = Arc::new(sockets);
        let events = Arc::new(RecordingEventListener::new());
        let codec = Arc::new(ScriptedCodec::new());

        let builder = HttpClient::builder()
            .dns(dns.clone())
            .socket_factory(sockets.clone())
            .tls_provider(Arc::new(tls))
            .codec(codec.clone())
            .event_listener(events.clone());
        let client = configure(builder).build().unwrap();

        Self {
            client,
            dns,
            sockets,
            events,
            codec,
        }
    }

    pub async fn get(&self, url: &str) -> hopwire_client::Result<HttpResponse> {
        let request = HttpRequest::get(url)?;
        self.client.new_call(request).execute().await
    }
}

pub fn socket(address: &str, port: u16) -> SocketAddr {
    SocketAddr::new(ip(address), port)
}
