//! Device link
//!
//! Owns the transport behind a mutex (one shared half-duplex bus, strictly
//! serialized access) and layers the drive-specific write discipline on top:
//! read-before-write so unchanged values never hit the bus, and the
//! mandatory settle delay after every write that actually happens. All
//! faults surface to the caller; nothing is retried here.

use tokio::sync::Mutex;

use servo_model::{DeviceAddress, RegisterKey};

use crate::config::SerialConfig;
use crate::constants::WRITE_SETTLE;
use crate::error::{Result, ServoBusError};
use crate::events::EventBus;
use crate::transport::Transport;

/// What a `write_register` call actually did on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Value differed; one transport write was issued and settled
    Written,
    /// Drive already held the requested value; no write was issued
    Unchanged,
}

/// Serialized access to one RTU bus
pub struct DeviceLink {
    transport: Mutex<Box<dyn Transport>>,
    events: EventBus,
}

impl DeviceLink {
    pub fn new(transport: Box<dyn Transport>, events: EventBus) -> Self {
        DeviceLink {
            transport: Mutex::new(transport),
            events,
        }
    }

    /// Event stream publisher shared by all operations on this link
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Open the serial port. A failure is reported once and never retried.
    pub async fn connect(&self, config: &SerialConfig) -> Result<()> {
        self.events.info(format!(
            "connecting to {} ({} baud)",
            config.port, config.baud_rate
        ));
        let mut transport = self.transport.lock().await;
        match transport.connect(config).await {
            Ok(()) => {
                self.events.info("connected");
                Ok(())
            }
            Err(e) => {
                self.events
                    .error(format!("could not connect to {}: {e}", config.port));
                Err(e)
            }
        }
    }

    /// Close the serial port.
    ///
    /// Returns false when there was nothing to close. Disconnect failures
    /// are logged, not fatal.
    pub async fn disconnect(&self) -> bool {
        let mut transport = self.transport.lock().await;
        if !transport.is_connected() {
            return false;
        }
        if let Err(e) = transport.disconnect().await {
            self.events.error(format!("disconnect failed: {e}"));
        } else {
            self.events.info("disconnected");
        }
        true
    }

    /// Whether a transport session is currently open
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    /// Read one register from one drive
    pub async fn read_register(&self, address: DeviceAddress, key: RegisterKey) -> Result<u16> {
        let mut transport = self.transport.lock().await;
        match transport.read_holding(address, key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.events.error(e.to_string());
                Err(e)
            }
        }
    }

    /// Write one register on one drive.
    ///
    /// Reads the current value first and skips the write when it already
    /// matches - an idempotent no-op that spares bus traffic and EEPROM
    /// wear signaling. An actual write is followed by the fixed settle
    /// delay; the drive silently ignores writes spaced closer than that.
    pub async fn write_register(
        &self,
        address: DeviceAddress,
        key: RegisterKey,
        value: u16,
    ) -> Result<WriteOutcome> {
        let mut transport = self.transport.lock().await;

        let current = transport
            .read_holding(address, key)
            .await
            .map_err(|e| self.write_fault(address, key, e))?;

        if current == value {
            self.events.info(format!(
                "drive {address} {key} already {value}, write skipped"
            ));
            return Ok(WriteOutcome::Unchanged);
        }

        transport
            .write_single(address, key, value)
            .await
            .map_err(|e| self.write_fault(address, key, e))?;

        // Settle while still holding the bus; the next write must not land
        // inside the drive's commit window.
        tokio::time::sleep(WRITE_SETTLE).await;

        self.events
            .info(format!("drive {address} {key} = {value} (was {current})"));
        Ok(WriteOutcome::Written)
    }

    /// Fold transport faults during a write sequence into a WriteError,
    /// keeping connection loss distinguishable for bulk callers.
    fn write_fault(
        &self,
        address: DeviceAddress,
        key: RegisterKey,
        err: ServoBusError,
    ) -> ServoBusError {
        let err = if err.is_connection_fault() {
            err
        } else {
            ServoBusError::Write {
                address,
                key,
                reason: err.to_string(),
            }
        };
        self.events.error(err.to_string());
        err
    }
}
