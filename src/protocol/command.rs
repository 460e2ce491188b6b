//! Command definitions
//!
//! Represents commands sent by clients.

use std::fmt;

/// Wire keyword for [`Command::Get`]
pub const GET: &str = "get";
/// Wire keyword for [`Command::Set`]
pub const SET: &str = "set";
/// Wire keyword for [`Command::ListFilters`]
pub const FILTERS: &str = "filters";
/// Older name for `filters`, still accepted
pub const FILTER_LIST: &str = "filter_list";
/// Wire keyword for [`Command::ShutdownServer`]
pub const SERVER_SHUTDOWN: &str = "server_shutdown";
/// Client-local keyword for [`Command::Help`]
pub const HELP: &str = "help";

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report the current wheel position
    Get,

    /// Move the wheel to a slot. The value is not range-checked here.
    Set(i64),

    /// List slot numbers with their filter names
    ListFilters,

    /// Stop the server
    ShutdownServer,

    /// Print usage. Handled locally by the client.
    Help,

    /// Unrecognized verb, passed through for the server to judge
    Other(String),
}

impl Command {
    /// Map a keyword to a payload-free command.
    ///
    /// Returns `None` for `set` and for unknown verbs.
    pub fn from_keyword(word: &str) -> Option<Command> {
        match word {
            GET => Some(Command::Get),
            FILTERS | FILTER_LIST => Some(Command::ListFilters),
            SERVER_SHUTDOWN => Some(Command::ShutdownServer),
            HELP => Some(Command::Help),
            _ => None,
        }
    }

    /// The verb this command is sent as
    pub fn keyword(&self) -> &str {
        match self {
            Command::Get => GET,
            Command::Set(_) => SET,
            Command::ListFilters => FILTERS,
            Command::ShutdownServer => SERVER_SHUTDOWN,
            Command::Help => HELP,
            Command::Other(verb) => verb,
        }
    }

    /// Whether the command ever goes over the wire
    pub fn is_remote(&self) -> bool {
        !matches!(self, Command::Help)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set(position) => write!(f, "{SET} {position}"),
            other => f.write_str(other.keyword()),
        }
    }
}
