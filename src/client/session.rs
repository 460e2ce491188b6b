//! Client session
//!
//! Exactly one request/response exchange over exactly one connection.
//!
//! ```text
//! Idle → Connecting → Sending → AwaitingResponse → Delivered
//!           │            │             ├─────────→ TimedOut
//!           └────────────┴─────────────┴─────────→ Failed
//! ```
//!
//! No retries, no reconnects. The connection is dropped on every exit path.

use std::fmt;
use std::io;
use std::time::{Duration, Instant};

use crate::error::MoverError;
use crate::protocol::{decode_request, read_response, write_request, Command};

use super::{Endpoint, Transport};

/// Where a session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Sending,
    AwaitingResponse,
    Delivered,
    TimedOut,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Delivered | SessionState::TimedOut | SessionState::Failed
        )
    }
}

/// Result of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The server answered; the text is the (lossily decoded) response
    Delivered(String),

    /// Connected and sent, but nothing came back before the deadline
    TimedOut,

    /// Could not connect, send or read
    ConnectionFailed(String),

    /// The request was rejected before any connection was opened
    MalformedCommand(String),
}

impl Outcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered(_))
    }

    /// Short label used in the session event
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Delivered(_) => "delivered",
            Outcome::TimedOut => "timed_out",
            Outcome::ConnectionFailed(_) => "connection_failed",
            Outcome::MalformedCommand(_) => "malformed_command",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Delivered(text) => write!(f, "Server response: {text}"),
            Outcome::TimedOut => f.write_str("Timeout occurred. No response received."),
            Outcome::ConnectionFailed(reason) => write!(f, "Error: {reason}"),
            Outcome::MalformedCommand(reason) => write!(f, "Malformed command: {reason}"),
        }
    }
}

/// Run one command against one endpoint
pub fn run<T: Transport>(
    transport: &mut T,
    endpoint: &Endpoint,
    request: &str,
    timeout: Duration,
) -> Outcome {
    let mut session = Session::new(endpoint, request, timeout);
    session.execute(transport)
}

/// A single exchange. Not reusable: `execute` consumes the Idle state.
pub struct Session<'a> {
    endpoint: &'a Endpoint,
    request: &'a str,
    timeout: Duration,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub fn new(endpoint: &'a Endpoint, request: &'a str, timeout: Duration) -> Self {
        Self {
            endpoint,
            request,
            // Zero would mean "block forever" to the socket layer.
            timeout: timeout.max(Duration::from_millis(1)),
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to a terminal state and report it
    pub fn execute<T: Transport>(&mut self, transport: &mut T) -> Outcome {
        let started = Instant::now();
        let outcome = self.drive(transport);
        self.report(&outcome, started.elapsed());
        outcome
    }

    fn drive<T: Transport>(&mut self, transport: &mut T) -> Outcome {
        if self.state != SessionState::Idle {
            return Outcome::MalformedCommand("session already used".to_string());
        }

        if let Err(reason) = validate_request(self.request) {
            self.transition(SessionState::Failed);
            return Outcome::MalformedCommand(reason);
        }

        self.transition(SessionState::Connecting);
        let mut stream = match transport.connect(self.endpoint, self.timeout) {
            Ok(stream) => stream,
            Err(e) => {
                self.transition(SessionState::Failed);
                return Outcome::ConnectionFailed(self.describe_connect_error(&e));
            }
        };

        let outcome = self.exchange(&mut stream);
        self.close(stream);
        outcome
    }

    /// Send the request, then wait for the first receive
    fn exchange<S: io::Read + io::Write>(&mut self, stream: &mut S) -> Outcome {
        self.transition(SessionState::Sending);
        if let Err(e) = write_request(stream, self.request) {
            self.transition(SessionState::Failed);
            return Outcome::ConnectionFailed(format!("sending to {} failed: {}", self.endpoint, e));
        }

        self.transition(SessionState::AwaitingResponse);
        match read_response(stream) {
            Ok(Some(response)) => {
                self.transition(SessionState::Delivered);
                Outcome::Delivered(response.to_text())
            }
            Ok(None) => {
                self.transition(SessionState::Failed);
                Outcome::ConnectionFailed(format!(
                    "{} closed the connection without responding",
                    self.endpoint
                ))
            }
            Err(MoverError::Io(ref e)) if is_timeout(e) => {
                self.transition(SessionState::TimedOut);
                Outcome::TimedOut
            }
            Err(e) => {
                self.transition(SessionState::Failed);
                Outcome::ConnectionFailed(format!("reading from {} failed: {}", self.endpoint, e))
            }
        }
    }

    fn close<S>(&self, stream: S) {
        drop(stream);
        tracing::trace!("connection to {} released", self.endpoint);
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!("session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn describe_connect_error(&self, e: &io::Error) -> String {
        if is_timeout(e) {
            format!("connecting to {} timed out after {:?}", self.endpoint, self.timeout)
        } else {
            format!("could not connect to {}: {}", self.endpoint, e)
        }
    }

    /// The one structured event per session
    fn report(&self, outcome: &Outcome, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match outcome {
            Outcome::Delivered(response) => tracing::info!(
                command = %self.request,
                endpoint = %self.endpoint,
                outcome = outcome.label(),
                elapsed_ms,
                response = %response,
                "session finished"
            ),
            Outcome::TimedOut => tracing::warn!(
                command = %self.request,
                endpoint = %self.endpoint,
                outcome = outcome.label(),
                elapsed_ms,
                timeout_ms = self.timeout.as_millis() as u64,
                "session finished"
            ),
            Outcome::ConnectionFailed(reason) | Outcome::MalformedCommand(reason) => {
                tracing::error!(
                    command = %self.request,
                    endpoint = %self.endpoint,
                    outcome = outcome.label(),
                    elapsed_ms,
                    reason = %reason,
                    "session finished"
                )
            }
        }
    }
}

/// Check a request before anything touches the network
fn validate_request(request: &str) -> std::result::Result<(), String> {
    match decode_request(request) {
        Ok(Command::Help) => Err("help is answered locally, not sent".to_string()),
        Ok(_) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Read timeouts surface as WouldBlock on Unix and TimedOut on Windows
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
