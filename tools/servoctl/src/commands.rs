//! Subcommand handlers
//!
//! Every bus-touching command goes through the engine's single-worker queue:
//! build the RTU transport, spawn the worker, connect, run the operation,
//! disconnect. `ports` is the only command that never opens the bus.

use anyhow::{bail, Context, Result};
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

use servo_bus::{BusHandle, BusWorker, EventBus, KeyState, RtuTransport};
use servo_model::{DeviceAddress, ParameterCatalog, Profile, ProfileMeta, RegisterKey};

use crate::config::CtlConfig;
use crate::Commands;

pub async fn run(command: Commands, config: CtlConfig) -> Result<()> {
    if matches!(command, Commands::Ports) {
        return list_ports();
    }

    let (handle, worker) = BusWorker::new(Box::new(RtuTransport::new()), EventBus::default());
    tokio::spawn(worker.run());

    handle.connect(config.bus.serial.clone()).await?;
    let result = dispatch(command, &handle, &config).await;
    let _ = handle.disconnect().await;
    result
}

fn list_ports() -> Result<()> {
    let ports = tokio_serial::available_ports().context("could not enumerate serial ports")?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        println!("{}", port.port_name);
    }
    Ok(())
}

async fn dispatch(command: Commands, handle: &BusHandle, config: &CtlConfig) -> Result<()> {
    match command {
        Commands::Ports => unreachable!("handled before connecting"),

        Commands::Scan { max } => {
            let max = max.unwrap_or(config.bus.max_address);
            let found = handle.search(max).await?;
            if found.is_empty() {
                println!("no drives found");
            }
            for address in found {
                println!("drive at address {address}");
            }
            Ok(())
        }

        Commands::Read { address, register } => {
            let key = RegisterKey::new(register);
            let value = handle
                .read_register(DeviceAddress::new(address)?, key)
                .await?;
            println!("{key} = {value}");
            Ok(())
        }

        Commands::Write {
            address,
            register,
            value,
        } => {
            let key = RegisterKey::new(register);
            let outcome = handle
                .write_register(DeviceAddress::new(address)?, key, value)
                .await?;
            match outcome {
                servo_bus::WriteOutcome::Written => println!("{key} = {value}"),
                servo_bus::WriteOutcome::Unchanged => {
                    println!("{key} already {value}, nothing written")
                }
            }
            Ok(())
        }

        Commands::Backup {
            address,
            file,
            name,
            author,
            version,
            info,
        } => {
            let target = DeviceAddress::new(address)?;
            let meta = ProfileMeta {
                name,
                author,
                version,
                info,
            };
            let range = (config.bus.backup_range_start, config.bus.backup_range_end);
            let profile = handle.backup_profile(target, range, meta).await?;

            let path = file.unwrap_or_else(|| {
                let file_name = format!(
                    "{}-{}-backup.json",
                    Local::now().format("%Y%m%d%H%M"),
                    target
                );
                match &config.profile_dir {
                    Some(dir) => dir.join(file_name),
                    None => PathBuf::from(file_name),
                }
            });
            profile.save(&path)?;
            println!(
                "saved {} registers from drive {target} to {}",
                profile.len(),
                path.display()
            );
            Ok(())
        }

        Commands::Restore {
            file,
            addresses,
            permanent,
            overwrite_identity,
        } => {
            let profile =
                Profile::load(&file).with_context(|| format!("loading {}", file.display()))?;
            let targets = parse_addresses(&addresses)?;

            if overwrite_identity {
                if targets.len() != 1 {
                    bail!("--overwrite-identity needs exactly one target drive");
                }
                let outcome = handle
                    .write_profile(targets[0], profile, true)
                    .await?;
                println!(
                    "drive {}: {} written, {} unchanged, {} failed",
                    targets[0], outcome.written, outcome.unchanged, outcome.failed
                );
                if permanent {
                    handle.persist(targets[0]).await?;
                }
                return Ok(());
            }

            let results = handle
                .transfer_to_many(profile, targets, permanent)
                .await?;
            for (address, outcome) in results {
                println!(
                    "drive {address}: {} written, {} unchanged, {} omitted, {} failed",
                    outcome.written, outcome.unchanged, outcome.omitted, outcome.failed
                );
            }
            Ok(())
        }

        Commands::Persist { addresses } => {
            let targets = parse_addresses(&addresses)?;
            let mut failures = 0usize;
            for address in targets {
                if let Err(e) = handle.persist(address).await {
                    eprintln!("drive {address}: {e}");
                    failures += 1;
                } else {
                    println!("drive {address}: parameters committed to EEPROM");
                }
            }
            if failures > 0 {
                bail!("{failures} drive(s) failed to persist");
            }
            Ok(())
        }

        Commands::Reconcile { addresses, catalog } => {
            let catalog_path = catalog
                .or_else(|| config.catalog.clone())
                .context("no parameter catalog configured; pass --catalog or set it in servoctl.toml")?;
            let catalog = Arc::new(
                ParameterCatalog::load(&catalog_path)
                    .with_context(|| format!("loading {}", catalog_path.display()))?,
            );
            let targets = parse_addresses(&addresses)?;

            let snapshot = handle.reconcile(Arc::clone(&catalog), targets).await?;
            let mut uniform = 0usize;
            for definition in &catalog.parameters {
                match snapshot.state(definition.key) {
                    KeyState::Uniform(value) => {
                        uniform += 1;
                        println!("{} {} = {value}", definition.key, definition.name);
                    }
                    KeyState::Divergent => {
                        println!("{} {} DIVERGES", definition.key, definition.name);
                    }
                    KeyState::Unavailable => {
                        println!("{} {} unavailable", definition.key, definition.name);
                    }
                }
            }
            println!(
                "{uniform}/{} parameters uniform, {} divergent",
                catalog.len(),
                snapshot.divergent_count()
            );
            Ok(())
        }
    }
}

fn parse_addresses(raw: &[u8]) -> Result<Vec<DeviceAddress>> {
    raw.iter()
        .map(|&n| DeviceAddress::new(n).map_err(Into::into))
        .collect()
}
