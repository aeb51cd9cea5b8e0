//! servoctl - operator tool for servo drive fleets
//!
//! Exercises the servo-bus engine from the command line: enumerate serial
//! ports, scan the bus, read and write single registers, back up and restore
//! profiles, commit parameters to EEPROM and compare parameter state across
//! drives.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "servoctl",
    version,
    about = "Manage servo drives on a shared ModBus RTU bus"
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "servoctl.toml")]
    config: PathBuf,

    /// Serial port override
    #[arg(long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List serial ports available on this machine
    Ports,

    /// Probe the bus for connected drives
    Scan {
        /// Highest unit identifier to probe
        #[arg(long)]
        max: Option<u8>,
    },

    /// Read one register from one drive
    Read {
        /// Drive unit identifier
        address: u8,
        /// Register number, e.g. 65 for Pn0065
        register: u16,
    },

    /// Write one register on one drive
    Write {
        address: u8,
        register: u16,
        value: u16,
    },

    /// Save a drive's parameters to a profile file
    Backup {
        address: u8,
        /// Output file; defaults to <timestamp>-<address>-backup.json
        #[arg(long)]
        file: Option<PathBuf>,
        /// Profile name stored in the file
        #[arg(long, default_value = "")]
        name: String,
        /// Profile author stored in the file
        #[arg(long, default_value = "")]
        author: String,
        /// Profile version stored in the file
        #[arg(long, default_value = "")]
        version: String,
        /// Free-form profile notes
        #[arg(long, default_value = "")]
        info: String,
    },

    /// Transfer a profile file to one or more drives
    Restore {
        /// Profile file to transfer
        file: PathBuf,
        /// Target drive unit identifiers
        #[arg(required = true)]
        addresses: Vec<u8>,
        /// Commit each drive's parameters to EEPROM after the transfer
        #[arg(long)]
        permanent: bool,
        /// Also write the identity register (single target only)
        #[arg(long)]
        overwrite_identity: bool,
    },

    /// Commit drive parameters to EEPROM (about 5 seconds per drive)
    Persist {
        #[arg(required = true)]
        addresses: Vec<u8>,
    },

    /// Compare parameter values across a selection of drives
    Reconcile {
        #[arg(required = true)]
        addresses: Vec<u8>,
        /// Parameter catalog file (overrides the configured one)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut config = config::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.bus.serial.port = port;
    }

    commands::run(cli.command, config).await
}
