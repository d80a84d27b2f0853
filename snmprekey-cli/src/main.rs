//! Command line front end: load the inventory, run the fleet, print the
//! report.
//!
//! Per-device failures are reported, not fatal: the process exits 0 as
//! long as the run itself could start, so operators can re-run against
//! the failed subset. Only a setup fault (unreadable inventory) exits
//! non-zero.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, warn};
use tokio_util::sync::CancellationToken;

use snmprekey::{FleetOrchestrator, PingProbe, Rotation, SshGateway, inventory};

/// Rotate deprecated SNMP community strings across a device fleet.
#[derive(Debug, Parser)]
#[command(name = "snmprekey", version, about)]
struct Args {
    /// Inventory file: one `address:dialect:username:password:enable_secret` per line.
    #[arg(long, default_value = "devices.txt")]
    inventory: PathBuf,

    /// Maximum number of concurrently open device sessions.
    #[arg(long, default_value_t = snmprekey::DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,

    /// SSH connect timeout, in seconds.
    #[arg(long, default_value_t = 15)]
    connect_timeout: u64,

    /// Per-command timeout, in seconds.
    #[arg(long, default_value_t = 30)]
    command_timeout: u64,

    /// Emit the report as JSON instead of the plain listing.
    #[arg(long)]
    json: bool,

    /// Append log events to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_file.as_deref());

    println!("snmprekey {} (SNMP community rotation)", env!("CARGO_PKG_VERSION"));

    let devices = match inventory::load(&args.inventory) {
        Ok(devices) => devices,
        Err(err) => {
            error!("{err}");
            eprintln!("fatal: {err}");
            return ExitCode::FAILURE;
        }
    };
    if devices.is_empty() {
        println!("inventory {} lists no devices", args.inventory.display());
        return ExitCode::SUCCESS;
    }
    println!("{} device(s) loaded from {}", devices.len(), args.inventory.display());

    let gateway = SshGateway::new(
        Duration::from_secs(args.connect_timeout),
        Duration::from_secs(args.command_timeout),
    );
    let orchestrator = FleetOrchestrator::new(
        Arc::new(PingProbe::default()),
        Arc::new(gateway),
        Rotation::default(),
    )
    .with_max_sessions(args.max_sessions);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling in-flight work");
                cancel.cancel();
            }
        });
    }

    let report = orchestrator.run(devices, cancel).await;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("fatal: cannot encode report: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", report.render());
    }

    ExitCode::SUCCESS
}

fn init_logging(log_file: Option<&Path>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(err) => eprintln!("cannot open log file {}: {err}", path.display()),
        }
    }

    builder.init();
}
