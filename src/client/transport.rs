//! Client transport
//!
//! The session only needs "give me a connected byte stream". Keeping that
//! behind a trait lets tests observe connects and releases.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use super::Endpoint;

/// Opens connections for a session
pub trait Transport {
    /// Connected stream. Dropping it releases the connection.
    type Stream: Read + Write;

    /// Open one connection to `endpoint`
    ///
    /// Both the connect and every later read/write on the returned stream
    /// must be bounded by `timeout`.
    fn connect(&mut self, endpoint: &Endpoint, timeout: Duration) -> io::Result<Self::Stream>;
}

/// Plain TCP transport
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    type Stream = TcpStream;

    fn connect(&mut self, endpoint: &Endpoint, timeout: Duration) -> io::Result<TcpStream> {
        let deadline = Instant::now() + timeout;
        let mut last_err = None;

        // A host may resolve to several addresses (e.g. ::1 and 127.0.0.1);
        // they share one deadline.
        for addr in endpoint.resolve()? {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    stream.set_read_timeout(Some(timeout))?;
                    stream.set_write_timeout(Some(timeout))?;
                    tracing::trace!("connected to {} via {}", endpoint, addr);
                    return Ok(stream);
                }
                Err(e) => {
                    tracing::debug!("connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {endpoint} timed out"),
            )
        }))
    }
}
