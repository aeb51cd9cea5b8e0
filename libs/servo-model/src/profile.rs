//! Configuration profiles
//!
//! A profile is a named point-in-time snapshot of one drive's register
//! values, created by a backup operation and consumed by a transfer
//! operation. Profiles are read-only once persisted; the file format is
//! JSON and must round-trip without losing a single (key, value) pair or
//! metadata field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::types::{DeviceAddress, RegisterKey};

/// One (register, value) pair inside a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub key: RegisterKey,
    pub value: u16,
}

/// Optional descriptive metadata supplied when a profile is created.
///
/// Every field defaults to empty; callers fill in what they know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileMeta {
    pub name: String,
    pub author: String,
    pub version: String,
    pub info: String,
}

/// Point-in-time snapshot of one drive's configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile name
    #[serde(default)]
    pub name: String,
    /// When the snapshot was taken
    pub created: DateTime<Utc>,
    /// Profile author
    #[serde(default)]
    pub author: String,
    /// Profile version
    #[serde(default)]
    pub version: String,
    /// Additional information
    #[serde(default)]
    pub info: String,
    /// Drive the snapshot was read from
    pub origin_device: DeviceAddress,
    /// Snapshot entries in read order
    parameters: Vec<ProfileEntry>,
}

impl Profile {
    /// Create an empty profile stamped with the current time
    pub fn new(origin_device: DeviceAddress, meta: ProfileMeta) -> Self {
        Profile {
            name: meta.name,
            created: Utc::now(),
            author: meta.author,
            version: meta.version,
            info: meta.info,
            origin_device,
            parameters: Vec::new(),
        }
    }

    /// Set a register value.
    ///
    /// At most one entry exists per key: setting a key that is already
    /// present replaces its value in place (last write wins) and keeps the
    /// original insertion order.
    pub fn set(&mut self, key: RegisterKey, value: u16) {
        if let Some(entry) = self.parameters.iter_mut().find(|e| e.key == key) {
            entry.value = value;
        } else {
            self.parameters.push(ProfileEntry { key, value });
        }
    }

    /// Value stored for a register key
    pub fn get(&self, key: RegisterKey) -> Option<u16> {
        self.parameters
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value)
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[ProfileEntry] {
        &self.parameters
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the profile holds no entries
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Load a profile from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the profile to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> DeviceAddress {
        DeviceAddress::new(n).unwrap()
    }

    fn sample_profile() -> Profile {
        let mut profile = Profile::new(
            addr(3),
            ProfileMeta {
                name: "baseline".to_string(),
                author: "rig".to_string(),
                version: "2".to_string(),
                info: "factory tune".to_string(),
            },
        );
        profile.set(RegisterKey::new(110), 40);
        profile.set(RegisterKey::new(111), 120);
        profile.set(RegisterKey::new(65), 3);
        profile
    }

    #[test]
    fn set_replaces_existing_key_last_write_wins() {
        let mut profile = sample_profile();
        assert_eq!(profile.len(), 3);
        profile.set(RegisterKey::new(110), 55);
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.get(RegisterKey::new(110)), Some(55));
        // insertion order preserved
        assert_eq!(profile.entries()[0].key, RegisterKey::new(110));
    }

    #[test]
    fn serialization_round_trip_preserves_pairs_and_metadata() {
        let profile = sample_profile();
        let raw = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, profile);
        assert_eq!(back.name, "baseline");
        assert_eq!(back.origin_device, addr(3));
        assert_eq!(back.get(RegisterKey::new(111)), Some(120));
    }

    #[test]
    fn file_round_trip() {
        let profile = sample_profile();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        profile.save(&path).unwrap();
        let loaded = Profile::load(&path).unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn missing_metadata_fields_default_to_empty() {
        let raw = r#"{
            "created": "2024-01-01T00:00:00Z",
            "origin_device": 1,
            "parameters": [{"key": 65, "value": 1}]
        }"#;
        let profile: Profile = serde_json::from_str(raw).unwrap();
        assert_eq!(profile.name, "");
        assert_eq!(profile.author, "");
        assert_eq!(profile.get(RegisterKey::new(65)), Some(1));
    }
}
