//! Serial link and engine configuration
//!
//! Supplied by the surrounding settings collaborator (the CLI loads it via
//! figment); defaults match the drive vendor's recommended 9600 8-N-1 with a
//! 500 ms query timeout.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_BACKUP_RANGE, DEFAULT_MAX_ADDRESS};
use crate::error::{Result, ServoBusError};

/// Serial parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    #[default]
    None,
    Even,
    Odd,
}

impl From<SerialParity> for tokio_serial::Parity {
    fn from(parity: SerialParity) -> Self {
        match parity {
            SerialParity::None => tokio_serial::Parity::None,
            SerialParity::Even => tokio_serial::Parity::Even,
            SerialParity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

/// Serial port parameters for one RTU bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    pub data_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Stop bits (1 or 2)
    pub stop_bits: u8,
    /// Connect and per-request response timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: String::new(),
            baud_rate: 9600,
            data_bits: 8,
            parity: SerialParity::None,
            stop_bits: 1,
            timeout_ms: 500,
        }
    }
}

impl SerialConfig {
    /// Map the configured data bits onto the serial driver's enum
    pub fn driver_data_bits(&self) -> Result<tokio_serial::DataBits> {
        match self.data_bits {
            5 => Ok(tokio_serial::DataBits::Five),
            6 => Ok(tokio_serial::DataBits::Six),
            7 => Ok(tokio_serial::DataBits::Seven),
            8 => Ok(tokio_serial::DataBits::Eight),
            other => Err(ServoBusError::Config(format!(
                "unsupported data bits: {other}"
            ))),
        }
    }

    /// Map the configured stop bits onto the serial driver's enum
    pub fn driver_stop_bits(&self) -> Result<tokio_serial::StopBits> {
        match self.stop_bits {
            1 => Ok(tokio_serial::StopBits::One),
            2 => Ok(tokio_serial::StopBits::Two),
            other => Err(ServoBusError::Config(format!(
                "unsupported stop bits: {other}"
            ))),
        }
    }
}

/// Engine-level settings for one bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Serial link parameters
    pub serial: SerialConfig,
    /// Highest unit identifier probed during discovery
    pub max_address: u8,
    /// First register captured by a full backup
    pub backup_range_start: u16,
    /// Last register captured by a full backup (inclusive)
    pub backup_range_end: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            serial: SerialConfig::default(),
            max_address: DEFAULT_MAX_ADDRESS,
            backup_range_start: DEFAULT_BACKUP_RANGE.0,
            backup_range_end: DEFAULT_BACKUP_RANGE.1,
        }
    }
}
