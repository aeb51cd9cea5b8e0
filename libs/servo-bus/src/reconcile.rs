//! Live reconciliation
//!
//! Reads every catalog parameter from an arbitrary subset of drives and
//! classifies each register: all drives agree on a value (editable as one
//! shared value), they diverge (a single edit box would lie - bulk writes
//! must be forced or blocked), or no trustworthy value exists (empty
//! selection, or a read failed). Recomputed on every selection change;
//! O(definitions x drives) reads is acceptable at fleet sizes of eight.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use servo_model::{DeviceAddress, ParameterCatalog, RegisterKey};

use crate::error::{Result, ServoBusError};
use crate::link::{DeviceLink, WriteOutcome};

/// Classification of one register across the selected drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Every selected drive reports this value
    Uniform(u16),
    /// Selected drives disagree; no single editable value exists
    Divergent,
    /// Empty selection or failed read; editing is disabled
    Unavailable,
}

/// Ephemeral per-key classification for one selection instant.
///
/// Never persisted; superseded by the next selection change.
#[derive(Debug, Clone)]
pub struct ReconciliationSnapshot {
    pub taken_at: DateTime<Utc>,
    pub selection: Vec<DeviceAddress>,
    states: HashMap<RegisterKey, KeyState>,
}

impl ReconciliationSnapshot {
    /// State recorded for a register, `Unavailable` when unknown
    pub fn state(&self, key: RegisterKey) -> KeyState {
        self.states
            .get(&key)
            .copied()
            .unwrap_or(KeyState::Unavailable)
    }

    /// Registers the whole selection agrees on
    pub fn uniform_keys(&self) -> impl Iterator<Item = (RegisterKey, u16)> + '_ {
        self.states.iter().filter_map(|(key, state)| match state {
            KeyState::Uniform(value) => Some((*key, *value)),
            _ => None,
        })
    }

    /// Number of divergent registers
    pub fn divergent_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, KeyState::Divergent))
            .count()
    }
}

/// Read every catalog parameter from every selected drive and classify it.
pub async fn reconcile(
    link: &DeviceLink,
    catalog: &ParameterCatalog,
    selection: &[DeviceAddress],
) -> Result<ReconciliationSnapshot> {
    if !link.is_connected().await {
        return Err(ServoBusError::NotConnected);
    }

    link.events().info(format!(
        "reconciling {} parameters across {} drive(s)",
        catalog.len(),
        selection.len()
    ));

    let mut states = HashMap::with_capacity(catalog.len());
    let mut divergent = 0usize;

    for definition in &catalog.parameters {
        if selection.is_empty() {
            states.insert(definition.key, KeyState::Unavailable);
            continue;
        }

        let mut values = Vec::with_capacity(selection.len());
        let mut unavailable = false;
        for &address in selection {
            match link.read_register(address, definition.key).await {
                Ok(value) => values.push(value),
                Err(e) if e.is_connection_fault() => return Err(e),
                Err(_) => {
                    // Fault already on the event stream; without a full set
                    // of values the key has no trustworthy state.
                    unavailable = true;
                    break;
                }
            }
        }

        let state = if unavailable {
            KeyState::Unavailable
        } else if values.iter().all(|v| *v == values[0]) {
            KeyState::Uniform(values[0])
        } else {
            divergent += 1;
            KeyState::Divergent
        };
        states.insert(definition.key, state);
    }

    if divergent > 0 {
        link.events().warn(format!(
            "{divergent} parameter(s) differ across the selected drives; \
             bulk editing disabled for them"
        ));
    }

    Ok(ReconciliationSnapshot {
        taken_at: Utc::now(),
        selection: selection.to_vec(),
        states,
    })
}

/// Summary of one uniform bulk write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UniformWriteOutcome {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Write one value to one register on every selected drive.
///
/// The value is bounds-checked against the catalog first; out of range means
/// no drive is touched at all. Per-drive faults are logged and the loop
/// continues.
pub async fn write_uniform(
    link: &DeviceLink,
    catalog: &ParameterCatalog,
    key: RegisterKey,
    value: u16,
    selection: &[DeviceAddress],
) -> Result<UniformWriteOutcome> {
    let definition = catalog.definition(key).ok_or_else(|| {
        ServoBusError::Validation(format!("register {key} is not in the catalog"))
    })?;
    if !definition.in_bounds(value) {
        let err = ServoBusError::Validation(format!(
            "value {value} out of range for {key} ({}..={})",
            definition.min, definition.max
        ));
        link.events().error(err.to_string());
        return Err(err);
    }

    let mut outcome = UniformWriteOutcome::default();
    for &address in selection {
        match link.write_register(address, key, value).await {
            Ok(WriteOutcome::Written) => outcome.written += 1,
            Ok(WriteOutcome::Unchanged) => outcome.unchanged += 1,
            Err(e) if e.is_connection_fault() => return Err(e),
            Err(_) => outcome.failed += 1,
        }
    }
    Ok(outcome)
}

/// Apply several uniform edits in one pass, skipping keys the snapshot
/// marked divergent - those must be reconciled (or forced individually)
/// before a shared value may be written.
pub async fn write_uniform_set(
    link: &DeviceLink,
    catalog: &ParameterCatalog,
    snapshot: &ReconciliationSnapshot,
    edits: &[(RegisterKey, u16)],
    selection: &[DeviceAddress],
) -> Result<UniformWriteOutcome> {
    let mut total = UniformWriteOutcome::default();
    for &(key, value) in edits {
        if matches!(snapshot.state(key), KeyState::Divergent) {
            link.events().warn(format!(
                "omitting {key}: drives disagree, bulk write blocked"
            ));
            continue;
        }
        let outcome = write_uniform(link, catalog, key, value, selection).await?;
        total.written += outcome.written;
        total.unchanged += outcome.unchanged;
        total.failed += outcome.failed;
    }
    Ok(total)
}
