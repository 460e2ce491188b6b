//! Server Tests
//!
//! End-to-end tests against a running server with a simulated wheel.

#[path = "../common/mod.rs"]
mod common;

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use common::{client_config, start_server, start_server_with_read_timeout, RunningServer};
use fwmover::client::{self, Dispatch, TcpTransport};
use fwmover::Outcome;

const FILTERS: [&str; 4] = ["Clear", "Red", "Green", "Blue"];

fn exchange(stream: &mut TcpStream, request: &str) -> String {
    stream.write_all(request.as_bytes()).unwrap();
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).unwrap();
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

fn request(addr: SocketAddr, text: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    exchange(&mut stream, text)
}

fn stop(server: RunningServer) {
    server.shutdown.shutdown();
    server.thread.join().unwrap().unwrap();
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_get_initial_position() {
    let server = start_server(&FILTERS, 4);

    assert_eq!(
        request(server.addr, "get"),
        "Filter Wheel Position is 0. This is the Clear filter."
    );

    stop(server);
}

#[test]
fn test_set_then_get() {
    let server = start_server(&FILTERS, 4);

    assert_eq!(
        request(server.addr, "set 2"),
        "Filter Wheel set to position 2. This is the Green filter."
    );
    assert_eq!(
        request(server.addr, "get"),
        "Filter Wheel Position is 2. This is the Green filter."
    );

    stop(server);
}

#[test]
fn test_set_out_of_range() {
    let server = start_server(&FILTERS, 4);

    assert_eq!(
        request(server.addr, "set 4"),
        "Enter a valid filter position (0-3)"
    );
    assert_eq!(
        request(server.addr, "set -1"),
        "Enter a valid filter position (0-3)"
    );

    stop(server);
}

#[test]
fn test_set_not_a_number() {
    let server = start_server(&FILTERS, 4);

    assert_eq!(request(server.addr, "set two"), "Input was not a number");

    stop(server);
}

#[test]
fn test_filter_table() {
    let server = start_server(&FILTERS, 4);

    let expected = "\n0: Clear\n1: Red\n2: Green\n3: Blue\n";
    assert_eq!(request(server.addr, "filters"), expected);
    assert_eq!(request(server.addr, "filter_list"), expected);

    stop(server);
}

#[test]
fn test_filter_table_limited_to_slots() {
    let server = start_server(&FILTERS, 2);

    assert_eq!(request(server.addr, "filters"), "\n0: Clear\n1: Red\n");

    stop(server);
}

#[test]
fn test_unknown_verb() {
    let server = start_server(&FILTERS, 4);

    assert_eq!(request(server.addr, "spin"), "Invalid input");

    stop(server);
}

#[test]
fn test_server_help() {
    let server = start_server(&FILTERS, 4);

    let help = request(server.addr, "help");
    assert!(help.contains("Available commands:"));
    assert!(help.contains("server_shutdown"));

    stop(server);
}

#[test]
fn test_several_requests_on_one_connection() {
    let server = start_server(&FILTERS, 4);

    let mut stream = TcpStream::connect(server.addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    assert_eq!(
        exchange(&mut stream, "set 1"),
        "Filter Wheel set to position 1. This is the Red filter."
    );
    assert_eq!(
        exchange(&mut stream, "get"),
        "Filter Wheel Position is 1. This is the Red filter."
    );
    drop(stream);

    stop(server);
}

#[test]
fn test_wheel_names_used_without_configured_filters() {
    let server = start_server(&[], 3);

    assert_eq!(
        request(server.addr, "filters"),
        "\n0: Filter 0\n1: Filter 1\n2: Filter 2\n"
    );

    stop(server);
}

// =============================================================================
// Client Against Server
// =============================================================================

#[test]
fn test_client_sets_position() {
    let server = start_server(&FILTERS, 4);
    let config = client_config(server.addr, 5000);

    match client::dispatch(&mut TcpTransport, &config, &["set", "3"]).unwrap() {
        Dispatch::Sent { outcome, .. } => assert_eq!(
            outcome,
            Outcome::Delivered("Filter Wheel set to position 3. This is the Blue filter.".to_string())
        ),
        Dispatch::Usage => panic!("Expected a session to run"),
    }

    stop(server);
}

// =============================================================================
// Shutdown Tests
// =============================================================================

#[test]
fn test_remote_shutdown_stops_run() {
    let server = start_server(&FILTERS, 4);

    assert_eq!(
        request(server.addr, "server_shutdown"),
        "Shutting down server..."
    );

    server.thread.join().unwrap().unwrap();
    assert!(server.shutdown.is_shutdown());
}

#[test]
fn test_shutdown_handle_stops_run() {
    let server = start_server(&FILTERS, 4);
    assert!(!server.shutdown.is_shutdown());
    stop(server);
}

#[test]
fn test_remote_shutdown_closes_idle_connections() {
    // No read timeout: an idle client would otherwise pin its worker forever.
    let server = start_server_with_read_timeout(&FILTERS, 4, 0);

    let mut idle = TcpStream::connect(server.addr).unwrap();
    idle.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    assert!(exchange(&mut idle, "get").starts_with("Filter Wheel Position is 0"));

    assert_eq!(
        request(server.addr, "server_shutdown"),
        "Shutting down server..."
    );

    assert!(server.stopped_within(Duration::from_secs(2)));
    server.thread.join().unwrap().unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(idle.read(&mut buf).unwrap_or(0), 0);
}

#[test]
fn test_remote_shutdown_stops_busy_connections() {
    let server = start_server_with_read_timeout(&FILTERS, 4, 5000);

    let mut chatty = TcpStream::connect(server.addr).unwrap();
    chatty
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    assert!(exchange(&mut chatty, "get").starts_with("Filter Wheel Position is"));

    let client = thread::spawn(move || {
        let mut buf = [0u8; 4096];
        for _ in 0..50 {
            thread::sleep(Duration::from_millis(100));
            if chatty.write_all(b"get").is_err() {
                return;
            }
            match chatty.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            }
        }
    });

    assert_eq!(
        request(server.addr, "server_shutdown"),
        "Shutting down server..."
    );

    assert!(server.stopped_within(Duration::from_secs(2)));
    server.thread.join().unwrap().unwrap();
    client.join().unwrap();
}
