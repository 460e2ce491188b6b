//! Client Module
//!
//! Turns a command line into one session against the filter-wheel server.
//!
//! ## Flow
//! 1. `parse_args` validates the command line (no I/O)
//! 2. `help` prints usage locally
//! 3. Anything else is encoded and sent through a single [`Session`]

mod endpoint;
mod session;
mod transport;

pub use endpoint::Endpoint;
pub use session::{run, Outcome, Session, SessionState};
pub use transport::{TcpTransport, Transport};

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{encode_command, parse_args, Command};

/// What the client did with a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// `help` was requested; nothing was sent
    Usage,

    /// A session ran against `endpoint`
    Sent { endpoint: Endpoint, outcome: Outcome },
}

/// Validate `args` and, unless it is `help`, run one session
///
/// Argument errors are returned before the transport is touched.
pub fn dispatch<T, S>(transport: &mut T, config: &Config, args: &[S]) -> Result<Dispatch>
where
    T: Transport,
    S: AsRef<str>,
{
    let invocation = parse_args(args)?;
    if invocation.command == Command::Help {
        return Ok(Dispatch::Usage);
    }

    let endpoint = Endpoint::from_invocation(&invocation, config)?;
    let request = encode_command(&invocation.command)?;

    tracing::debug!("sending {:?} to {}", request, endpoint);
    let outcome = run(transport, &endpoint, &request, config.timeout());

    Ok(Dispatch::Sent { endpoint, outcome })
}

/// Usage text shown for `help` and after argument errors
pub fn usage(program: &str) -> String {
    format!(
        "Available commands:\n\
         get - Gets the current filter wheel position.\n\
         set <number> - Sets the filter wheel position to the given number.\n\
         filters - Prints the filter wheel positions and their filter names (alias: filter_list).\n\
         server_shutdown - Shuts down the server.\n\
         help - Prints this help message.\n\
         \n\
         Usage: {program} <command> [<number>] [<host>] [<port>]"
    )
}
