//! Error types for fwmover
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using MoverError
pub type Result<T> = std::result::Result<T, MoverError>;

/// Unified error type for fwmover operations
#[derive(Debug, Error)]
pub enum MoverError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Argument Errors (always raised before any network I/O)
    // -------------------------------------------------------------------------
    #[error("No command given")]
    MissingCommand,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Too many arguments: {0} unexpected")]
    TooManyArguments(usize),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timed out after {0:?} with no response")]
    TimedOut(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Device Errors
    // -------------------------------------------------------------------------
    #[error("Filter wheel error: {0}")]
    Wheel(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Property {name} expects a {expected} value")]
    PropertyType { name: String, expected: &'static str },

    #[error("Property {0} is read-only")]
    ReadOnlyProperty(String),
}

impl MoverError {
    /// True for errors raised while validating command-line input
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            MoverError::MissingCommand
                | MoverError::InvalidArgument(_)
                | MoverError::TooManyArguments(_)
        )
    }
}
