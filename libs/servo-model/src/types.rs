//! Core bus addressing types
//!
//! A drive on the shared RTU bus is identified by its ModBus unit identifier
//! (`DeviceAddress`); its configuration registers are identified by their
//! `PnXXXX` number (`RegisterKey`). Both are plain newtypes so they serialize
//! as bare integers in profile and catalog files.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, Result};

/// ModBus unit identifier of one drive on the bus.
///
/// Only meaningful within a single transport session; a different bus may
/// assign the same identifier to a different physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(u8);

impl DeviceAddress {
    /// Largest unit identifier the RTU address space allows
    pub const MAX: u8 = 247;

    /// Create a validated device address (1..=247)
    pub fn new(raw: u8) -> Result<Self> {
        if raw == 0 || raw > Self::MAX {
            return Err(ModelError::InvalidAddress(raw as u16));
        }
        Ok(DeviceAddress(raw))
    }

    /// Raw unit identifier
    pub fn get(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for DeviceAddress {
    type Error = ModelError;

    fn try_from(raw: u8) -> Result<Self> {
        DeviceAddress::new(raw)
    }
}

/// Number of a configuration register, e.g. 65 for `Pn0065`.
///
/// Keys are stable across drives of the same model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegisterKey(u16);

impl RegisterKey {
    /// Create a register key from its parameter number
    pub const fn new(raw: u16) -> Self {
        RegisterKey(raw)
    }

    /// Raw register number
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for RegisterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pn{:04}", self.0)
    }
}

impl From<u16> for RegisterKey {
    fn from(raw: u16) -> Self {
        RegisterKey(raw)
    }
}
