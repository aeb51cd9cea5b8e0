//! Vendor transport seam
//!
//! The engine never frames ModBus itself; it talks through the [`Transport`]
//! trait, implemented in production by [`RtuTransport`] on top of
//! tokio-modbus + tokio-serial. The drive address is an explicit parameter on
//! every call - there is no "current target" state to leave behind - and the
//! RTU implementation selects the slave immediately before each request under
//! the same exclusive borrow, so two logical operations cannot interleave on
//! one address slot.

use async_trait::async_trait;
use std::time::Duration;
use tokio_modbus::client::{rtu, Context};
use tokio_modbus::prelude::*;
use tokio_serial::SerialStream;

use servo_model::{DeviceAddress, RegisterKey};

use crate::config::SerialConfig;
use crate::error::{Result, ServoBusError};

/// ModBus RTU master abstraction bound to one serial port.
///
/// One outstanding request at a time; the half-duplex bus has no concept of
/// concurrent access.
#[async_trait]
pub trait Transport: Send {
    /// Open the serial port. Never retried internally.
    async fn connect(&mut self, config: &SerialConfig) -> Result<()>;

    /// Close the serial port. No-op when not connected.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether a transport session is currently open
    fn is_connected(&self) -> bool;

    /// Read one holding register from the given drive
    async fn read_holding(&mut self, address: DeviceAddress, key: RegisterKey) -> Result<u16>;

    /// Write one holding register on the given drive
    async fn write_single(
        &mut self,
        address: DeviceAddress,
        key: RegisterKey,
        value: u16,
    ) -> Result<()>;
}

/// Production transport: tokio-modbus RTU client over tokio-serial
pub struct RtuTransport {
    ctx: Option<Context>,
    /// Per-request response timeout; an absent drive never answers, so
    /// every read against an empty slot ends here.
    timeout: Duration,
}

impl RtuTransport {
    pub fn new() -> Self {
        RtuTransport {
            ctx: None,
            timeout: Duration::from_millis(500),
        }
    }

    fn ctx_mut(&mut self) -> Result<&mut Context> {
        self.ctx.as_mut().ok_or(ServoBusError::NotConnected)
    }
}

impl Default for RtuTransport {
    fn default() -> Self {
        RtuTransport::new()
    }
}

#[async_trait]
impl Transport for RtuTransport {
    async fn connect(&mut self, config: &SerialConfig) -> Result<()> {
        if config.port.is_empty() {
            return Err(ServoBusError::Config("serial port not specified".into()));
        }

        let builder = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(config.driver_data_bits()?)
            .parity(config.parity.into())
            .stop_bits(config.driver_stop_bits()?)
            .timeout(Duration::from_millis(config.timeout_ms));

        let stream = SerialStream::open(&builder)
            .map_err(|e| ServoBusError::Connection(format!("{}: {e}", config.port)))?;

        // Slave selection happens per request; the initial value is moot.
        self.ctx = Some(rtu::attach_slave(stream, Slave(1)));
        self.timeout = Duration::from_millis(config.timeout_ms);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut ctx) = self.ctx.take() {
            ctx.disconnect()
                .await
                .map_err(|e| ServoBusError::Connection(e.to_string()))?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn read_holding(&mut self, address: DeviceAddress, key: RegisterKey) -> Result<u16> {
        let timeout = self.timeout;
        let ctx = self.ctx_mut()?;
        ctx.set_slave(Slave(address.get()));

        let response = tokio::time::timeout(timeout, ctx.read_holding_registers(key.get(), 1))
            .await
            .map_err(|_| ServoBusError::Read {
                address,
                key,
                reason: format!("no response within {} ms", timeout.as_millis()),
            })?;

        match response {
            Ok(Ok(words)) => words.first().copied().ok_or(ServoBusError::Read {
                address,
                key,
                reason: "empty response".into(),
            }),
            Ok(Err(exception)) => Err(ServoBusError::Read {
                address,
                key,
                reason: format!("modbus exception: {exception}"),
            }),
            Err(err) => Err(ServoBusError::Read {
                address,
                key,
                reason: err.to_string(),
            }),
        }
    }

    async fn write_single(
        &mut self,
        address: DeviceAddress,
        key: RegisterKey,
        value: u16,
    ) -> Result<()> {
        let timeout = self.timeout;
        let ctx = self.ctx_mut()?;
        ctx.set_slave(Slave(address.get()));

        let response = tokio::time::timeout(timeout, ctx.write_single_register(key.get(), value))
            .await
            .map_err(|_| ServoBusError::Write {
                address,
                key,
                reason: format!("no response within {} ms", timeout.as_millis()),
            })?;

        match response {
            Ok(Ok(())) => Ok(()),
            Ok(Err(exception)) => Err(ServoBusError::Write {
                address,
                key,
                reason: format!("modbus exception: {exception}"),
            }),
            Err(err) => Err(ServoBusError::Write {
                address,
                key,
                reason: err.to_string(),
            }),
        }
    }
}
