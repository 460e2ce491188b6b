//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{MoverError, Result};
use crate::protocol::{read_request, write_response, Response};

use super::handler::Handler;
use super::server::ShutdownHandle;

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Client went away, idled past the read timeout, or the server is stopping
    Closed,

    /// Client asked the server to stop
    Shutdown,
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader. Unbuffered: one receive is one request.
    reader: TcpStream,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared request handler
    handler: Arc<Handler>,

    /// Server-wide stop flag, checked between requests
    shutdown: ShutdownHandle,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        handler: Arc<Handler>,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: read_stream,
            writer: BufWriter::new(write_stream),
            handler,
            shutdown,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = no timeout)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses.
    pub fn handle(&mut self) -> Result<ConnectionEnd> {
        tracing::info!("Client connected: {}", self.peer_addr);

        loop {
            if self.shutdown.is_shutdown() {
                tracing::info!("Server stopping, closing {}", self.peer_addr);
                self.close();
                return Ok(ConnectionEnd::Closed);
            }

            let request = match read_request(&mut self.reader) {
                Ok(Some(request)) => request,
                Ok(None) => {
                    tracing::info!("Client {} disconnected", self.peer_addr);
                    return Ok(ConnectionEnd::Closed);
                }
                Err(MoverError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} ended: {}", self.peer_addr, e);
                    return Ok(ConnectionEnd::Closed);
                }
                Err(MoverError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(ConnectionEnd::Closed);
                }
                Err(e) if self.shutdown.is_shutdown() => {
                    tracing::debug!("Read from {} ended by shutdown: {}", self.peer_addr, e);
                    return Ok(ConnectionEnd::Closed);
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::info!("Data received from {}: {:?}", self.peer_addr, request);
            let reply = self.handler.handle(&request);

            if let Err(e) = self.send_response(&reply.response) {
                if let MoverError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(if reply.shutdown {
                            ConnectionEnd::Shutdown
                        } else {
                            ConnectionEnd::Closed
                        });
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            if reply.shutdown {
                self.close();
                return Ok(ConnectionEnd::Shutdown);
            }
        }
    }

    fn send_response(&mut self, response: &Response) -> Result<()> {
        write_response(&mut self.writer, response)
    }

    fn close(&mut self) {
        if let Err(e) = self.reader.shutdown(std::net::Shutdown::Both) {
            tracing::debug!("Shutdown of {} failed: {}", self.peer_addr, e);
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
