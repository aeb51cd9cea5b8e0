//! Parameter catalog
//!
//! The catalog is the read-only reference list of every configuration
//! register a drive model exposes: name, bounds, default, unit, risk level
//! and which control modes the setting applies to. It is loaded once at
//! startup from a JSON file and consulted for bounds-checking and
//! presentation; it is never device-specific.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::types::RegisterKey;

// ============================================================================
// Parameter Definition
// ============================================================================

/// Control modes a parameter applies to.
///
/// "All" covers torque, speed and position control; the single letters
/// restrict the setting to torque (T), speed (S) or position (P) control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ApplyScope {
    #[serde(rename = "All", alias = "all", alias = "ALL")]
    #[default]
    All,
    #[serde(rename = "T", alias = "t")]
    Torque,
    #[serde(rename = "S", alias = "s")]
    Speed,
    #[serde(rename = "P", alias = "p")]
    Position,
}

impl ApplyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyScope::All => "All",
            ApplyScope::Torque => "T",
            ApplyScope::Speed => "S",
            ApplyScope::Position => "P",
        }
    }
}

impl fmt::Display for ApplyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable catalog entry describing one configuration register
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Register number, e.g. 65 for Pn0065
    pub key: RegisterKey,
    /// Short parameter name
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Lowest accepted raw value
    pub min: u16,
    /// Highest accepted raw value
    pub max: u16,
    /// Factory default raw value
    pub default: u16,
    /// Value unit for presentation, e.g. "rpm" or "ms"
    #[serde(default)]
    pub unit: String,
    /// Drive must be re-enabled before the change takes effect
    #[serde(default)]
    pub re_enable: bool,
    /// Drive must be power-cycled before the change takes effect
    #[serde(default)]
    pub re_power: bool,
    /// Control modes the setting applies to
    #[serde(default)]
    pub apply: ApplyScope,
    /// Risk level of changing the setting, 0 (harmless) to 5 (hazardous)
    #[serde(default)]
    pub risk_level: u8,
}

impl ParameterDefinition {
    /// Whether a raw value lies inside the [min, max] bounds
    pub fn in_bounds(&self, value: u16) -> bool {
        value >= self.min && value <= self.max
    }
}

// ============================================================================
// Parameter Catalog
// ============================================================================

/// Read-only collection of parameter definitions for one drive model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterCatalog {
    /// When the catalog file was authored
    pub created: DateTime<Utc>,
    /// Catalog name
    #[serde(default)]
    pub name: String,
    /// Additional information about the catalog
    #[serde(default)]
    pub info: String,
    /// Catalog author
    #[serde(default)]
    pub author: String,
    /// Catalog version
    #[serde(default)]
    pub version: String,
    /// Definitions in presentation order
    pub parameters: Vec<ParameterDefinition>,
}

impl ParameterCatalog {
    /// Look up the definition for a register key
    pub fn definition(&self, key: RegisterKey) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|def| def.key == key)
    }

    /// Number of definitions in the catalog
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the catalog holds no definitions
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Load a catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the catalog to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> ParameterCatalog {
        ParameterCatalog {
            created: Utc::now(),
            name: "sample".to_string(),
            info: String::new(),
            author: "test".to_string(),
            version: "1.0".to_string(),
            parameters: vec![
                ParameterDefinition {
                    key: RegisterKey::new(115),
                    name: "Position loop gain".to_string(),
                    description: "Proportional gain of the position loop".to_string(),
                    min: 0,
                    max: 1000,
                    default: 40,
                    unit: "1/s".to_string(),
                    re_enable: false,
                    re_power: false,
                    apply: ApplyScope::Position,
                    risk_level: 2,
                },
                ParameterDefinition {
                    key: RegisterKey::new(65),
                    name: "Unit identifier".to_string(),
                    description: String::new(),
                    min: 1,
                    max: 8,
                    default: 1,
                    unit: String::new(),
                    re_enable: false,
                    re_power: true,
                    apply: ApplyScope::All,
                    risk_level: 5,
                },
            ],
        }
    }

    #[test]
    fn definition_lookup_by_key() {
        let catalog = sample_catalog();
        let def = catalog.definition(RegisterKey::new(115)).unwrap();
        assert_eq!(def.name, "Position loop gain");
        assert!(catalog.definition(RegisterKey::new(999)).is_none());
    }

    #[test]
    fn bounds_check_is_inclusive() {
        let catalog = sample_catalog();
        let def = catalog.definition(RegisterKey::new(115)).unwrap();
        assert!(def.in_bounds(0));
        assert!(def.in_bounds(1000));
        assert!(!def.in_bounds(1001));
    }

    #[test]
    fn catalog_file_round_trip() {
        let catalog = sample_catalog();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parameters.json");
        catalog.save(&path).unwrap();
        let loaded = ParameterCatalog::load(&path).unwrap();
        assert_eq!(loaded.parameters, catalog.parameters);
        assert_eq!(loaded.name, catalog.name);
    }
}
