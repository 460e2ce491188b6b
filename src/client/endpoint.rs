//! Server endpoint
//!
//! A host/port pair, resolved once per session.

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

use crate::config::Config;
use crate::error::{MoverError, Result};
use crate::protocol::Invocation;

/// Where a command is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint, rejecting port 0 and empty hosts
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(MoverError::InvalidArgument("host must not be empty".to_string()));
        }
        if port == 0 {
            return Err(MoverError::InvalidArgument("port must be in 1..=65535".to_string()));
        }
        Ok(Self { host, port })
    }

    /// Configured defaults, overridden by whatever the command line supplied
    pub fn from_invocation(invocation: &Invocation, config: &Config) -> Result<Self> {
        let host = invocation.host.clone().unwrap_or_else(|| config.host.clone());
        let port = invocation.port.unwrap_or(config.port);
        Self::new(host, port)
    }

    /// Resolve to socket addresses (DNS lookup happens here)
    pub fn resolve(&self) -> io::Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{self} resolved to no addresses"),
            ));
        }
        Ok(addrs)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
