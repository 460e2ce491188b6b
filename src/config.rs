//! Configuration for fwmover
//!
//! Centralized configuration with sensible defaults.
//!
//! ## Sources (in priority order)
//! 1. Environment: `FWMOVER_HOST`, `FWMOVER_PORT`, `FWMOVER_TIMEOUT_MS`
//! 2. TOML file: `--config <path>`, else `./fwmover.toml` if present
//! 3. Built-in defaults
//!
//! ## File Format
//! ```toml
//! [client]
//! host = "localhost"
//! port = 8080
//! timeout_ms = 60000
//!
//! [server]
//! listen_addr = "127.0.0.1:8080"
//! workers = 4
//! slots = 10
//! filters = ["Clear", "Red", "Green", "Blue"]
//! log_file = "server_log.txt"
//! max_log_lines = 5000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{MoverError, Result};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "fwmover.toml";

pub const ENV_HOST: &str = "FWMOVER_HOST";
pub const ENV_PORT: &str = "FWMOVER_PORT";
pub const ENV_TIMEOUT_MS: &str = "FWMOVER_TIMEOUT_MS";

/// Main configuration, built once at process start and passed down
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Default server host when none is given on the command line
    pub host: String,

    /// Default server port when none is given on the command line
    pub port: u16,

    /// Bound on both the connect and the response wait (milliseconds)
    pub timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Number of connection worker threads
    pub workers: usize,

    /// Per-connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// How long a `set` may take before it is reported as failed (milliseconds)
    pub move_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Filter Wheel Configuration
    // -------------------------------------------------------------------------
    /// Number of slots on the (simulated) wheel
    pub slots: usize,

    /// Filter names by slot. Empty means "ask the wheel".
    pub filters: Vec<String>,

    // -------------------------------------------------------------------------
    // Logging Configuration
    // -------------------------------------------------------------------------
    /// Server log file; `None` disables file logging
    pub log_file: Option<PathBuf>,

    /// Line count at which the log file is refreshed
    pub max_log_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
            timeout_ms: 60_000,
            listen_addr: "127.0.0.1:8080".to_string(),
            workers: 4,
            read_timeout_ms: 5000,
            move_timeout_ms: 60_000,
            slots: 10,
            filters: Vec::new(),
            log_file: Some(PathBuf::from("server_log.txt")),
            max_log_lines: 5000,
        }
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),

    /// No file found, built-in defaults in use
    Defaults,
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Client timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn move_timeout(&self) -> Duration {
        Duration::from_millis(self.move_timeout_ms)
    }

    /// Load configuration from a file (if any) and the process environment
    pub fn load(path: Option<&Path>) -> Result<(Config, ConfigSource)> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load configuration with an explicit environment lookup
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<(Config, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (mut config, source) = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(MoverError::Config(format!(
                        "config file {} does not exist",
                        path.display()
                    )));
                }
                (Self::from_file(path)?, ConfigSource::File(path.to_path_buf()))
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    (
                        Self::from_file(default_path)?,
                        ConfigSource::File(default_path.to_path_buf()),
                    )
                } else {
                    (Config::default(), ConfigSource::Defaults)
                }
            }
        };

        config.apply_env(env)?;
        config.validate()?;

        tracing::debug!(source = ?source, "configuration loaded");
        Ok((config, source))
    }

    /// Parse a TOML config file, filling unset keys with defaults
    pub fn from_file(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Config> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| MoverError::Config(e.to_string()))?;
        Ok(file.into_config())
    }

    /// Apply `FWMOVER_*` overrides
    pub fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = env(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = env(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| MoverError::Config(format!("{ENV_PORT}={port} is not a valid port")))?;
        }
        if let Some(timeout) = env(ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout.trim().parse().map_err(|_| {
                MoverError::Config(format!("{ENV_TIMEOUT_MS}={timeout} is not a number"))
            })?;
        }
        Ok(())
    }

    /// Reject values that would make the client or server unusable
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(MoverError::Config("port must be in 1..=65535".to_string()));
        }
        if self.host.trim().is_empty() {
            return Err(MoverError::Config("host must not be empty".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(MoverError::Config("timeout_ms must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(MoverError::Config("workers must be at least 1".to_string()));
        }
        if self.slots == 0 {
            return Err(MoverError::Config("slots must be at least 1".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// File Representation
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    client: ClientSection,
    server: ServerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ClientSection {
    host: Option<String>,
    port: Option<u16>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    listen_addr: Option<String>,
    workers: Option<usize>,
    read_timeout_ms: Option<u64>,
    move_timeout_ms: Option<u64>,
    slots: Option<usize>,
    filters: Option<Vec<String>>,
    log_file: Option<PathBuf>,
    max_log_lines: Option<usize>,
}

impl ConfigFile {
    fn into_config(self) -> Config {
        let defaults = Config::default();
        let ConfigFile { client, server } = self;

        Config {
            host: client.host.unwrap_or(defaults.host),
            port: client.port.unwrap_or(defaults.port),
            timeout_ms: client.timeout_ms.unwrap_or(defaults.timeout_ms),
            listen_addr: server.listen_addr.unwrap_or(defaults.listen_addr),
            workers: server.workers.unwrap_or(defaults.workers),
            read_timeout_ms: server.read_timeout_ms.unwrap_or(defaults.read_timeout_ms),
            move_timeout_ms: server.move_timeout_ms.unwrap_or(defaults.move_timeout_ms),
            slots: server.slots.unwrap_or(defaults.slots),
            filters: server.filters.unwrap_or(defaults.filters),
            log_file: server.log_file.or(defaults.log_file),
            max_log_lines: server.max_log_lines.unwrap_or(defaults.max_log_lines),
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the default server host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the default server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the client timeout (in milliseconds)
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the server read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the move timeout (in milliseconds)
    pub fn move_timeout_ms(mut self, ms: u64) -> Self {
        self.config.move_timeout_ms = ms;
        self
    }

    pub fn slots(mut self, slots: usize) -> Self {
        self.config.slots = slots;
        self
    }

    pub fn filters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set (or disable) the server log file
    pub fn log_file(mut self, path: Option<PathBuf>) -> Self {
        self.config.log_file = path;
        self
    }

    pub fn max_log_lines(mut self, lines: usize) -> Self {
        self.config.max_log_lines = lines;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
