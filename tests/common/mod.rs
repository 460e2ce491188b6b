//! Shared helpers for integration tests
//!
//! Mock servers, an instrumented transport and a real-server launcher.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fwmover::client::{Endpoint, TcpTransport, Transport};
use fwmover::config::Config;
use fwmover::server::{Server, ShutdownHandle};
use fwmover::wheel::SimulatedWheel;

// =============================================================================
// Instrumented Transport
// =============================================================================

/// TCP transport that counts connect attempts and stream releases
#[derive(Default, Clone)]
pub struct CountingTransport {
    pub connects: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl CountingTransport {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

pub struct CountedStream {
    stream: TcpStream,
    releases: Arc<AtomicUsize>,
}

impl Read for CountedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for CountedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Drop for CountedStream {
    fn drop(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transport for CountingTransport {
    type Stream = CountedStream;

    fn connect(&mut self, endpoint: &Endpoint, timeout: Duration) -> io::Result<CountedStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let stream = TcpTransport.connect(endpoint, timeout)?;
        Ok(CountedStream {
            stream,
            releases: Arc::clone(&self.releases),
        })
    }
}

// =============================================================================
// Mock Servers
// =============================================================================

fn listen() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Accepts one connection, records the request, sends `reply`
pub fn reply_once(reply: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).unwrap();
        stream.write_all(reply.as_bytes()).unwrap();
        String::from_utf8_lossy(&buf[..n]).into_owned()
    });
    (addr, handle)
}

/// Accepts one connection and holds it open without replying
pub fn silent_server(hold: Duration) -> SocketAddr {
    let (listener, addr) = listen();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(hold);
        drop(stream);
    });
    addr
}

/// Accepts one connection and closes it immediately
pub fn closing_server() -> (SocketAddr, JoinHandle<()>) {
    let (listener, addr) = listen();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });
    (addr, handle)
}

/// A port with nothing listening on it
pub fn unused_port() -> u16 {
    let (listener, addr) = listen();
    drop(listener);
    addr.port()
}

pub fn endpoint_for(addr: SocketAddr) -> Endpoint {
    Endpoint::new(addr.ip().to_string(), addr.port()).unwrap()
}

/// Client config pointed at `addr`
pub fn client_config(addr: SocketAddr, timeout_ms: u64) -> Config {
    Config::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .timeout_ms(timeout_ms)
        .build()
}

// =============================================================================
// Real Server
// =============================================================================

pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: ShutdownHandle,
    pub thread: JoinHandle<fwmover::Result<()>>,
}

impl RunningServer {
    /// Wait up to `limit` for `run()` to return
    pub fn stopped_within(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if self.thread.is_finished() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        self.thread.is_finished()
    }
}

/// Start a server on an ephemeral port with an instant-moving wheel
pub fn start_server(filters: &[&str], slots: usize) -> RunningServer {
    start_server_with_read_timeout(filters, slots, 2000)
}

/// Like [`start_server`]; `read_timeout_ms` of 0 means connections never idle out
pub fn start_server_with_read_timeout(
    filters: &[&str],
    slots: usize,
    read_timeout_ms: u64,
) -> RunningServer {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .workers(2)
        .read_timeout_ms(read_timeout_ms)
        .move_timeout_ms(2000)
        .slots(slots)
        .filters(filters.iter().copied())
        .log_file(None)
        .build();

    let wheel = Arc::new(SimulatedWheel::new(slots, Duration::ZERO));
    let server = Server::bind(config, wheel).unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let thread = thread::spawn(move || server.run());

    RunningServer {
        addr,
        shutdown,
        thread,
    }
}
