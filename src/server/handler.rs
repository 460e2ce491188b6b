//! Request Handler
//!
//! Turns request text into a response by driving the filter wheel.
//!
//! ## Responses
//! - `get`      → `Filter Wheel Position is <p>. This is the <name> filter.`
//! - `set <n>`  → `Filter Wheel set to position <n>. This is the <name> filter.`
//! - `filters`  → one `<i>: <name>` line per slot
//! - anything unparseable → `Invalid input` / `Input was not a number`

use std::fmt::Write as _;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::Config;
use crate::protocol::{decode_request, Command, Response, SET};
use crate::wheel::{FilterWheel, MOVING};

/// Interval between position checks while a move is in progress
pub const MOVE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const SHUTDOWN_MESSAGE: &str = "Shutting down server...";
pub const INVALID_INPUT: &str = "Invalid input";
pub const NOT_A_NUMBER: &str = "Input was not a number";

/// Response plus whether the server should stop after sending it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub response: Response,
    pub shutdown: bool,
}

impl Reply {
    fn text(message: impl Into<String>) -> Self {
        Self {
            response: Response::text(message),
            shutdown: false,
        }
    }
}

/// Executes requests against a shared wheel
pub struct Handler {
    wheel: Arc<dyn FilterWheel>,

    /// Names by slot (configured list, or the wheel's own names)
    filters: Vec<String>,

    move_timeout: Duration,

    /// Serializes moves; two clients must not drive the wheel at once
    move_lock: Mutex<()>,
}

impl Handler {
    pub fn new(wheel: Arc<dyn FilterWheel>, config: &Config) -> Self {
        let filters = if config.filters.is_empty() {
            tracing::warn!("No filter list provided, using the names reported by the wheel");
            wheel.names()
        } else {
            config.filters.clone()
        };

        Self {
            wheel,
            filters,
            move_timeout: config.move_timeout(),
            move_lock: Mutex::new(()),
        }
    }

    /// Handle one raw request
    pub fn handle(&self, raw: &str) -> Reply {
        let command = match decode_request(raw) {
            Ok(command) => command,
            Err(e) => {
                tracing::error!("Rejected request {:?}: {}", raw, e);
                let is_set = raw.split_whitespace().next() == Some(SET);
                return Reply::text(if is_set { NOT_A_NUMBER } else { INVALID_INPUT });
            }
        };

        match command {
            Command::Get => Reply::text(self.describe_position()),
            Command::Set(position) => Reply::text(self.set_position(position)),
            Command::ListFilters => Reply::text(self.filter_table()),
            Command::Help => Reply::text(server_help()),
            Command::ShutdownServer => {
                tracing::info!("{}", SHUTDOWN_MESSAGE);
                Reply {
                    response: Response::text(SHUTDOWN_MESSAGE),
                    shutdown: true,
                }
            }
            Command::Other(verb) => {
                tracing::error!("{}: {:?}", INVALID_INPUT, verb);
                Reply::text(INVALID_INPUT)
            }
        }
    }

    fn describe_position(&self) -> String {
        let position = match self.wheel.position() {
            Ok(MOVING) => return "Filter Wheel is moving".to_string(),
            Ok(position) => position,
            Err(e) => {
                tracing::error!("Reading wheel position failed: {}", e);
                return format!("Error reading filter wheel position: {e}");
            }
        };

        let message = match self.filter_name(position) {
            Some(name) => format!("Filter Wheel Position is {position}. This is the {name} filter."),
            None => format!("Filter Wheel Position is {position}"),
        };
        tracing::info!("{}", message);
        message
    }

    fn set_position(&self, requested: i64) -> String {
        let slots = self.wheel.slot_count();
        let position = match i32::try_from(requested) {
            Ok(p) if p >= 0 && (p as usize) < slots => p,
            _ => {
                let message = format!(
                    "Enter a valid filter position (0-{})",
                    slots.saturating_sub(1)
                );
                tracing::error!("{} (got {})", message, requested);
                return message;
            }
        };

        if !self.move_and_wait(position) {
            let message = format!("Error setting filter wheel to position {position}");
            tracing::error!("{}", message);
            return message;
        }

        let message = match self.filter_name(position) {
            Some(name) => format!(
                "Filter Wheel set to position {position}. This is the {name} filter."
            ),
            None => format!("Filter Wheel set to position {position}"),
        };
        tracing::info!("{}", message);
        message
    }

    /// Start a move and poll until it lands or the move timeout passes
    fn move_and_wait(&self, position: i32) -> bool {
        let _guard = self.move_lock.lock();

        if let Err(e) = self.wheel.begin_move(position) {
            tracing::error!("Starting move to {} failed: {}", position, e);
            return false;
        }
        tracing::info!("Setting filter wheel to position {}...", position);

        let started = Instant::now();
        loop {
            thread::sleep(MOVE_POLL_INTERVAL);
            match self.wheel.position() {
                Ok(p) if p == position => return true,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("Polling wheel position failed: {}", e);
                    return false;
                }
            }
            if started.elapsed() > self.move_timeout {
                return false;
            }
        }
    }

    fn filter_table(&self) -> String {
        let len = self.wheel.slot_count().min(self.filters.len());
        let mut table = String::from("\n");
        for (i, name) in self.filters.iter().take(len).enumerate() {
            let _ = writeln!(table, "{i}: {name}");
        }
        table
    }

    fn filter_name(&self, position: i32) -> Option<&str> {
        let name = usize::try_from(position)
            .ok()
            .and_then(|i| self.filters.get(i))
            .map(String::as_str);
        if name.is_none() {
            tracing::warn!(
                "No filter name for position {}; the configured list is too short",
                position
            );
        }
        name
    }
}

fn server_help() -> String {
    [
        "",
        "Available commands:",
        "get - Gets the current filter wheel position.",
        "set <number> - Sets the filter wheel position to the given number.",
        "server_shutdown - Shuts down the server.",
        "filters - Prints the filter wheel positions and their corresponding filter names.",
        "help - Prints this help message.",
        "",
    ]
    .join("\n")
}
