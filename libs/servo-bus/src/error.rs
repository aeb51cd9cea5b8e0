//! Error handling for the servo bus engine

use servo_model::{DeviceAddress, RegisterKey};
use thiserror::Error;

/// Result type alias for servo bus operations
pub type Result<T> = std::result::Result<T, ServoBusError>;

/// Servo bus engine error type
#[derive(Error, Debug, Clone)]
pub enum ServoBusError {
    /// Transport open failure or loss of the transport itself
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation issued while no transport is connected
    #[error("Not connected")]
    NotConnected,

    /// Single-register read fault
    #[error("Read error at drive {address} register {key}: {reason}")]
    Read {
        address: DeviceAddress,
        key: RegisterKey,
        reason: String,
    },

    /// Single-register write fault
    #[error("Write error at drive {address} register {key}: {reason}")]
    Write {
        address: DeviceAddress,
        key: RegisterKey,
        reason: String,
    },

    /// Value outside catalog bounds or key unknown to the catalog
    #[error("Validation error: {0}")]
    Validation(String),

    /// No drive answered at the given address slot
    #[error("No drive found at address {0}")]
    AddressNotFound(DeviceAddress),

    /// EEPROM commit handshake could not be driven to the expected state
    #[error("Persistence handshake failed on drive {address}: {reason}")]
    PersistenceTimeout {
        address: DeviceAddress,
        reason: String,
    },

    /// Invalid serial or engine configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation queue no longer accepting submissions
    #[error("Worker error: {0}")]
    Worker(String),
}

impl ServoBusError {
    /// Whether the fault is a loss of the transport itself.
    ///
    /// Connection-level faults abort the enclosing bulk operation;
    /// single-register faults are logged and skipped.
    pub fn is_connection_fault(&self) -> bool {
        matches!(
            self,
            ServoBusError::Connection(_) | ServoBusError::NotConnected
        )
    }
}
