//! fwmover CLI Client
//!
//! Sends one command to the filter-wheel server and prints the reply.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fwmover::client::{self, Dispatch, TcpTransport};
use fwmover::{logging, Config, ConfigSource};

const PROGRAM: &str = "fwmover-cli";

/// fwmover CLI
#[derive(Parser, Debug)]
#[command(name = PROGRAM)]
#[command(about = "Send a command to the filter wheel server")]
#[command(version)]
struct Args {
    /// Config file (defaults to ./fwmover.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long)]
    verbose: bool,

    /// <command> [<number>] [<host>] [<port>]
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_client(args.verbose);

    let (config, source) = match Config::load(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{e}");
            return ExitCode::from(1);
        }
    };

    if source == ConfigSource::Defaults {
        tracing::warn!(
            "No config file found, using defaults ({}:{}, {} ms timeout)",
            config.host,
            config.port,
            config.timeout_ms
        );
    }

    match client::dispatch(&mut TcpTransport, &config, &args.args) {
        Ok(Dispatch::Usage) => {
            println!("{}", client::usage(PROGRAM));
            ExitCode::SUCCESS
        }
        Ok(Dispatch::Sent { outcome, .. }) => {
            if outcome.is_delivered() {
                println!("{outcome}");
                ExitCode::SUCCESS
            } else {
                eprintln!("{outcome}");
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("{e}");
            if e.is_usage_error() {
                eprintln!();
                eprintln!("{}", client::usage(PROGRAM));
            }
            ExitCode::from(1)
        }
    }
}
