//! Servo Bus Library
//!
//! Communication and profile-synchronization engine for a fleet of servo
//! drives sharing one ModBus RTU serial bus. The engine turns a single
//! serial link into a multi-device register-access service:
//!
//! - `transport`: the vendor ModBus client seam (tokio-modbus over
//!   tokio-serial); byte-level framing never leaks above this module
//! - `link`: per-operation addressing, read-before-write and the mandatory
//!   post-write settle delay
//! - `discovery`: sequential probe of candidate unit identifiers
//! - `transfer`: profile backup/restore with per-parameter fault tolerance
//! - `reconcile`: uniform/divergent classification of a register across a
//!   device selection, gating safe bulk edits
//! - `persist`: the EEPROM commit handshake with its fixed settle time
//! - `worker`: single-consumer operation queue serializing everything that
//!   touches the bus
//!
//! Every outcome is published on the [`events::EventBus`] broadcast stream
//! and mirrored to `tracing`.

pub mod config;
pub mod constants;
pub mod discovery;
pub mod error;
pub mod events;
pub mod link;
pub mod persist;
pub mod reconcile;
pub mod transfer;
pub mod transport;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::{BusConfig, SerialConfig, SerialParity};
pub use error::{Result, ServoBusError};
pub use events::{BusEvent, EventBus, Severity};
pub use link::{DeviceLink, WriteOutcome};
pub use reconcile::{KeyState, ReconciliationSnapshot, UniformWriteOutcome};
pub use transfer::TransferOutcome;
pub use transport::{RtuTransport, Transport};
pub use worker::{BusHandle, BusWorker};
