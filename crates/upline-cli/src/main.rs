//! upline-admin
//!
//! Operator tool over an upline data directory: register participants,
//! post events, inspect roll-ups, and run reconciliation or a ledger audit.

mod command;
mod config;
mod ops;

use std::sync::Arc;

use command::Command;
use config::AdminConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upline_engine::Engine;
use upline_ledger::RocksStore;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| command::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cmd = match command::parse(&args) {
        Ok(Command::Help) => {
            command::print_usage();
            std::process::exit(0);
        }
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error: {}", e);
            command::print_usage();
            std::process::exit(1);
        }
    };

    let mut stdout = std::io::stdout().lock();
    let result = if cmd.needs_store() {
        let config = AdminConfig::from_env();
        tracing::debug!(data_dir = ?config.data_dir, "opening store");
        match RocksStore::open(&config.data_dir) {
            Ok(store) => {
                let engine = Engine::new(Arc::new(store));
                ops::run(cmd, &engine, &mut stdout)
            }
            Err(e) => Err(format!("Failed to open store at {:?}: {}", config.data_dir, e).into()),
        }
    } else {
        ops::run_pure(&cmd, &mut stdout)
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
