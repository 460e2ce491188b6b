//! Protocol codec
//!
//! Encoding, decoding and argument validation for the text protocol.
//!
//! ## Request Grammar
//! ```text
//! request  := "get" | "set" SP integer | "filters" | "filter_list"
//!           | "server_shutdown" | other-verb
//! integer  := ["-" | "+"] digit+
//! ```
//!
//! ## Command Line Grammar
//! ```text
//! <command> [<number>] [<host>] [<port>]
//! ```
//! `<number>` is only consumed by `set`. Whatever follows the command (and its
//! payload) is read as a host override, then a port override.

use std::io::{ErrorKind, Read, Write};

use crate::error::{MoverError, Result};
use super::command::SET;
use super::{Command, Response};

/// Size of the single receive used for a response
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

/// Size of the server-side receive buffer for a request
pub const REQUEST_BUFFER_SIZE: usize = 4096;

/// Maximum number of positional overrides (host, port)
pub const MAX_OVERRIDES: usize = 2;

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a command to its wire text
///
/// `help` never leaves the client, so it has no encoding.
pub fn encode_command(command: &Command) -> Result<String> {
    match command {
        Command::Help => Err(MoverError::Protocol(
            "help is handled locally and has no wire form".to_string(),
        )),
        Command::Other(verb) if verb.trim().is_empty() => {
            Err(MoverError::Protocol("empty command".to_string()))
        }
        other => Ok(other.to_string()),
    }
}

/// Decode request text into a command
///
/// Surrounding whitespace (including a trailing newline) is ignored.
pub fn decode_request(text: &str) -> Result<Command> {
    let text = text.trim();
    let mut tokens = text.split_whitespace();

    let verb = tokens
        .next()
        .ok_or_else(|| MoverError::Protocol("empty request".to_string()))?;

    if verb == SET {
        let value = tokens
            .next()
            .ok_or_else(|| MoverError::Protocol("set: missing position".to_string()))?;
        let position = parse_position(value)
            .map_err(|_| MoverError::Protocol(format!("set: {value:?} is not a number")))?;
        if let Some(extra) = tokens.next() {
            return Err(MoverError::Protocol(format!(
                "set: unexpected argument {extra:?}"
            )));
        }
        return Ok(Command::Set(position));
    }

    match Command::from_keyword(verb) {
        Some(command) => {
            if let Some(extra) = tokens.next() {
                return Err(MoverError::Protocol(format!(
                    "{verb}: unexpected argument {extra:?}"
                )));
            }
            Ok(command)
        }
        None => Ok(Command::Other(text.to_string())),
    }
}

/// Parse a base-10, optionally signed, integer
fn parse_position(token: &str) -> std::result::Result<i64, std::num::ParseIntError> {
    token.parse::<i64>()
}

// =============================================================================
// Command Line Parsing
// =============================================================================

/// A validated command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,

    /// Host override, if one was given
    pub host: Option<String>,

    /// Port override, if one was given
    pub port: Option<u16>,
}

/// Validate a command line (without the program name)
///
/// Every error here is raised before any connection is attempted.
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Invocation> {
    let mut tokens = args.iter().map(AsRef::as_ref);

    let verb = tokens
        .next()
        .filter(|v| !v.trim().is_empty())
        .ok_or(MoverError::MissingCommand)?;

    let command = if verb == SET {
        let value = tokens.next().ok_or_else(|| {
            MoverError::InvalidArgument("set requires a filter position".to_string())
        })?;
        let position = parse_position(value).map_err(|_| {
            MoverError::InvalidArgument(format!("{value:?} is not a valid filter position"))
        })?;
        Command::Set(position)
    } else {
        Command::from_keyword(verb).unwrap_or_else(|| Command::Other(verb.to_string()))
    };

    let overrides: Vec<&str> = tokens.collect();
    if overrides.len() > MAX_OVERRIDES {
        return Err(MoverError::TooManyArguments(overrides.len() - MAX_OVERRIDES));
    }

    let host = overrides.first().map(|h| h.to_string());
    let port = overrides.get(1).map(|p| parse_port(p)).transpose()?;

    Ok(Invocation {
        command,
        host,
        port,
    })
}

/// Parse a TCP port in 1..=65535
pub fn parse_port(token: &str) -> Result<u16> {
    match token.parse::<u16>() {
        Ok(0) | Err(_) => Err(MoverError::InvalidArgument(format!(
            "{token:?} is not a valid port"
        ))),
        Ok(port) => Ok(port),
    }
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Write an encoded request as a single unit
pub fn write_request<W: Write>(writer: &mut W, request: &str) -> Result<()> {
    writer.write_all(request.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Read a response with a single receive
///
/// Returns `Ok(None)` when the peer closed without sending anything.
/// There is no framing: whatever the first receive yields is the response.
pub fn read_response<R: Read>(reader: &mut R) -> Result<Option<Response>> {
    let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
    let n = read_retrying_interrupts(reader, &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(Response::from_bytes(buf[..n].to_vec())))
}

/// Read one request on the server side
///
/// Returns `Ok(None)` on a clean disconnect.
pub fn read_request<R: Read>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = [0u8; REQUEST_BUFFER_SIZE];
    let n = read_retrying_interrupts(reader, &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf[..n]).into_owned()))
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(response.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn read_retrying_interrupts<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
