//! fwmover Server Binary
//!
//! Starts the filter-wheel control server on a simulated wheel.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use fwmover::server::Server;
use fwmover::wheel::SimulatedWheel;
use fwmover::{logging, Config, ConfigSource};

/// fwmover Server
#[derive(Parser, Debug)]
#[command(name = "fwmover-server")]
#[command(about = "Filter wheel control server")]
#[command(version)]
struct Args {
    /// Config file (defaults to ./fwmover.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port), overrides the config file
    #[arg(short, long)]
    listen: Option<String>,

    /// Number of wheel slots, overrides the config file
    #[arg(short, long)]
    slots: Option<usize>,

    /// Simulated travel time per slot, in milliseconds
    #[arg(long, default_value = "500")]
    travel_ms: u64,

    /// Do not write a log file
    #[arg(long)]
    no_log_file: bool,
}

fn main() {
    let args = Args::parse();

    let (mut config, source) = match Config::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    apply_overrides(&mut config, &args);

    if let Err(e) = logging::init_server(&config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    tracing::info!("fwmover server v{}", fwmover::VERSION);
    match source {
        ConfigSource::File(path) => tracing::info!("Config file: {}", path.display()),
        ConfigSource::Defaults => tracing::warn!("No config file found, using built-in defaults"),
    }

    let wheel = Arc::new(SimulatedWheel::new(
        config.slots,
        Duration::from_millis(args.travel_ms),
    ));
    tracing::info!("Simulated filter wheel with {} slots", config.slots);

    let server = match Server::bind(config, wheel) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Error initializing socket: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(listen) = &args.listen {
        config.listen_addr = listen.clone();
    }
    if let Some(slots) = args.slots {
        config.slots = slots.max(1);
    }
    if args.no_log_file {
        config.log_file = None;
    }
}
