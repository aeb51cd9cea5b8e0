//! Servo Model Library
//!
//! Pure data layer for servo drive fleets: bus addresses, register keys,
//! the read-only parameter catalog and point-in-time configuration profiles.
//! No bus I/O lives here - see `servo-bus` for the communication engine.

pub mod catalog;
pub mod error;
pub mod profile;
pub mod types;

// Re-exports for convenience
pub use catalog::{ApplyScope, ParameterCatalog, ParameterDefinition};
pub use error::{ModelError, Result};
pub use profile::{Profile, ProfileMeta};
pub use types::{DeviceAddress, RegisterKey};
