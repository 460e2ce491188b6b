//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (plain text)
//!
//! One request, one response. No length prefix and no terminator: the
//! receiver takes whatever a single receive returns.
//!
//! ### Requests
//! - `get`              - current wheel position
//! - `set <n>`          - move to slot `n`
//! - `filters`          - slot/name table (`filter_list` is an alias)
//! - `server_shutdown`  - stop the server
//!
//! Unknown verbs are forwarded untouched; the server answers `Invalid input`.
//!
//! ### Responses
//! Free-form UTF-8 text.

mod command;
mod response;
mod codec;

pub use command::{Command, FILTERS, FILTER_LIST, GET, HELP, SERVER_SHUTDOWN, SET};
pub use response::Response;
pub use codec::{
    decode_request, encode_command, parse_args, parse_port, read_request, read_response,
    write_request, write_response, Invocation, MAX_OVERRIDES, REQUEST_BUFFER_SIZE,
    RESPONSE_BUFFER_SIZE,
};
