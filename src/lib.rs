//! # fwmover
//!
//! Remote control for an observatory filter wheel:
//! - Plain-text command protocol (`get`, `set <n>`, `filters`, `server_shutdown`)
//! - Single-shot CLI client with a bounded response wait
//! - Threaded control server driving a filter wheel
//! - Pulse-guide telescope device with per-property locking
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐                 ┌──────────────────────────────┐
//! │     fwmover-cli      │   "set 3"       │        fwmover-server        │
//! │                      │ ──────────────► │                              │
//! │ parse_args → Session │                 │ acceptor → worker pool       │
//! │   (one connection)   │ ◄────────────── │        → Handler             │
//! └──────────────────────┘  "Filter Wheel  └──────────────┬───────────────┘
//!                            set to ..."                  │
//!                                                         ▼
//!                                                 ┌──────────────┐
//!                                                 │ FilterWheel  │
//!                                                 └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod logging;

pub mod protocol;
pub mod client;
pub mod server;
pub mod wheel;
pub mod telescope;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MoverError, Result};
pub use config::{Config, ConfigSource};
pub use client::{Endpoint, Outcome};
pub use protocol::Command;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of fwmover
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
