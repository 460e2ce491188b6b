//! Server Module
//!
//! TCP server that executes protocol commands against a filter wheel.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls the shutdown flag)
//! - Worker thread pool fed through a bounded crossbeam channel
//! - Requests routed through one shared [`Handler`]
//! - On shutdown, open connections are closed so workers can be joined

mod connection;
mod handler;
#[allow(clippy::module_inception)]
mod server;

pub use connection::{Connection, ConnectionEnd};
pub use handler::{Handler, Reply, INVALID_INPUT, NOT_A_NUMBER, SHUTDOWN_MESSAGE};
pub use server::{Server, ShutdownHandle};
