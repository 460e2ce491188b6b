//! Session Tests
//!
//! Drives the client against mock servers on loopback.

#[path = "../common/mod.rs"]
mod common;

use std::time::{Duration, Instant};

use common::{
    client_config, closing_server, endpoint_for, reply_once, silent_server, unused_port,
    CountingTransport,
};
use fwmover::client::{self, Dispatch, Session, SessionState};
use fwmover::{MoverError, Outcome};

fn sent(dispatch: Dispatch) -> Outcome {
    match dispatch {
        Dispatch::Sent { outcome, .. } => outcome,
        Dispatch::Usage => panic!("Expected a session to run"),
    }
}

// =============================================================================
// Delivery Tests
// =============================================================================

#[test]
fn test_set_is_delivered() {
    let (addr, server) = reply_once("OK: 3");
    let config = client_config(addr, 2000);
    let mut transport = CountingTransport::default();

    let outcome = sent(client::dispatch(&mut transport, &config, &["set", "3"]).unwrap());

    assert_eq!(outcome, Outcome::Delivered("OK: 3".to_string()));
    assert_eq!(server.join().unwrap(), "set 3");
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.releases(), 1);
}

#[test]
fn test_get_sends_bare_keyword() {
    let (addr, server) = reply_once("Filter Wheel Position is 2.");
    let config = client_config(addr, 2000);
    let mut transport = CountingTransport::default();

    let outcome = sent(client::dispatch(&mut transport, &config, &["get"]).unwrap());

    assert!(outcome.is_delivered());
    assert_eq!(server.join().unwrap(), "get");
}

#[test]
fn test_filter_list_alias_is_sent_as_filters() {
    let (addr, server) = reply_once("\n0: Red\n");
    let config = client_config(addr, 2000);
    let mut transport = CountingTransport::default();

    sent(client::dispatch(&mut transport, &config, &["filter_list"]).unwrap());

    assert_eq!(server.join().unwrap(), "filters");
}

#[test]
fn test_override_host_and_port() {
    let (addr, server) = reply_once("done");
    // Config points at a dead port; the command line wins.
    let mut config = client_config(addr, 2000);
    config.port = unused_port();
    let mut transport = CountingTransport::default();

    let port = addr.port().to_string();
    let args = ["get", "127.0.0.1", port.as_str()];
    match client::dispatch(&mut transport, &config, &args).unwrap() {
        Dispatch::Sent { endpoint, outcome } => {
            assert_eq!(endpoint.port, addr.port());
            assert_eq!(outcome, Outcome::Delivered("done".to_string()));
        }
        Dispatch::Usage => panic!("Expected a session to run"),
    }
    server.join().unwrap();
}

// =============================================================================
// Validation Tests (no connection attempted)
// =============================================================================

#[test]
fn test_invalid_position_never_connects() {
    let config = client_config("127.0.0.1:9".parse().unwrap(), 2000);
    let mut transport = CountingTransport::default();

    let result = client::dispatch(&mut transport, &config, &["set", "abc"]);

    assert!(matches!(result, Err(MoverError::InvalidArgument(_))));
    assert_eq!(transport.connects(), 0);
}

#[test]
fn test_missing_command_never_connects() {
    let config = client_config("127.0.0.1:9".parse().unwrap(), 2000);
    let mut transport = CountingTransport::default();
    let empty: [&str; 0] = [];

    let result = client::dispatch(&mut transport, &config, &empty);

    assert!(matches!(result, Err(MoverError::MissingCommand)));
    assert_eq!(transport.connects(), 0);
}

#[test]
fn test_help_never_connects() {
    let config = client_config("127.0.0.1:9".parse().unwrap(), 2000);
    let mut transport = CountingTransport::default();

    let result = client::dispatch(&mut transport, &config, &["help"]).unwrap();

    assert_eq!(result, Dispatch::Usage);
    assert_eq!(transport.connects(), 0);
}

#[test]
fn test_malformed_request_never_connects() {
    let endpoint = endpoint_for("127.0.0.1:9".parse().unwrap());
    let mut transport = CountingTransport::default();

    let outcome = client::run(&mut transport, &endpoint, "   ", Duration::from_secs(1));

    assert!(matches!(outcome, Outcome::MalformedCommand(_)));
    assert_eq!(transport.connects(), 0);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_silent_server_times_out() {
    let timeout = Duration::from_millis(1000);
    let addr = silent_server(Duration::from_secs(3));
    let endpoint = endpoint_for(addr);
    let mut transport = CountingTransport::default();

    let started = Instant::now();
    let outcome = client::run(&mut transport, &endpoint, "get", timeout);
    let elapsed = started.elapsed();

    assert_eq!(outcome, Outcome::TimedOut);
    assert!(elapsed >= timeout - Duration::from_millis(5), "{elapsed:?}");
    assert!(elapsed < timeout + Duration::from_millis(100), "{elapsed:?}");
    assert_eq!(transport.releases(), 1);
}

#[test]
fn test_closed_without_reply() {
    let (addr, server) = closing_server();
    let endpoint = endpoint_for(addr);
    let mut transport = CountingTransport::default();

    let outcome = client::run(&mut transport, &endpoint, "get", Duration::from_secs(2));
    server.join().unwrap();

    match &outcome {
        Outcome::ConnectionFailed(_) => {}
        Outcome::Delivered(text) => assert!(text.is_empty(), "{outcome:?}"),
        other => panic!("Expected ConnectionFailed, got {other:?}"),
    }
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.releases(), 1);
}

#[test]
fn test_refused_connection() {
    let endpoint = endpoint_for(format!("127.0.0.1:{}", unused_port()).parse().unwrap());
    let mut transport = CountingTransport::default();

    let outcome = client::run(&mut transport, &endpoint, "get", Duration::from_secs(2));

    assert!(matches!(outcome, Outcome::ConnectionFailed(_)), "{outcome:?}");
    assert_eq!(transport.connects(), 1);
    assert_eq!(transport.releases(), 0);
}

// =============================================================================
// Session State Tests
// =============================================================================

#[test]
fn test_session_ends_in_terminal_state() {
    let (addr, server) = reply_once("OK");
    let endpoint = endpoint_for(addr);
    let mut transport = CountingTransport::default();

    let mut session = Session::new(&endpoint, "get", Duration::from_secs(2));
    assert_eq!(session.state(), SessionState::Idle);

    let outcome = session.execute(&mut transport);
    server.join().unwrap();

    assert!(outcome.is_delivered());
    assert_eq!(session.state(), SessionState::Delivered);
    assert!(session.state().is_terminal());
}

#[test]
fn test_outcome_messages() {
    assert_eq!(
        Outcome::Delivered("OK: 3".to_string()).to_string(),
        "Server response: OK: 3"
    );
    assert_eq!(
        Outcome::TimedOut.to_string(),
        "Timeout occurred. No response received."
    );
}
