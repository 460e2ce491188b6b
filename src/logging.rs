//! Logging setup
//!
//! Both binaries log through `tracing`. The server also mirrors its log to a
//! plain-text file that is truncated and started over once it reaches
//! `max_log_lines` lines.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::error::{MoverError, Result};

pub const REFRESH_NOTICE: &str = "Log file has been refreshed\n";

/// Install the client subscriber (stderr only)
pub fn init_client(verbose: bool) {
    let default = if verbose { "debug" } else { "warn,fwmover=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Install the server subscriber: stdout plus the optional capped log file
pub fn init_server(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fwmover=debug"));

    let file_layer = match &config.log_file {
        Some(path) => {
            let log = LogFile::open(path, config.max_log_lines)?;
            Some(fmt::layer().with_ansi(false).with_writer(log))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(file_layer)
        .try_init()
        .map_err(|e| MoverError::Config(format!("logging already initialized: {e}")))
}

// =============================================================================
// Line-capped log file
// =============================================================================

#[derive(Debug)]
struct LogFileInner {
    path: PathBuf,
    file: File,
    lines: usize,
    max_lines: usize,
}

/// Append-only log file that starts over after `max_lines` lines
///
/// An existing file is appended to and its lines count toward the cap.
#[derive(Debug, Clone)]
pub struct LogFile {
    inner: Arc<Mutex<LogFileInner>>,
}

impl LogFile {
    pub fn open(path: impl AsRef<Path>, max_lines: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let lines = if path.exists() {
            BufReader::new(File::open(&path)?).lines().count()
        } else {
            0
        };
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(LogFileInner {
                path,
                file,
                lines,
                max_lines: max_lines.max(1),
            })),
        })
    }

    /// Lines written since the file was (re)started
    pub fn line_count(&self) -> usize {
        self.inner.lock().lines
    }
}

impl LogFileInner {
    fn refresh(&mut self) -> io::Result<()> {
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file.write_all(REFRESH_NOTICE.as_bytes())?;
        self.lines = 1;
        Ok(())
    }
}

/// Writer handed out per event
pub struct LogFileWriter {
    inner: Arc<Mutex<LogFileInner>>,
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock();
        if inner.lines >= inner.max_lines {
            inner.refresh()?;
        }
        inner.file.write_all(buf)?;
        inner.lines += buf.iter().filter(|&&b| b == b'\n').count();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}
