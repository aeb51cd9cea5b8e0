//! Profile transfer engine
//!
//! Applies a saved profile to one or more drives and captures new profiles
//! from a drive. Restores are partial-failure tolerant: one bad register
//! must not abort the whole restore, so per-parameter faults are logged and
//! the loop continues. Loss of the transport aborts the operation as a
//! whole - the caller must then treat the drive as being in unknown partial
//! state, not assume a rollback.

use servo_model::{DeviceAddress, Profile, ProfileMeta, RegisterKey};

use crate::constants::IDENTITY_REGISTER;
use crate::error::Result;
use crate::link::DeviceLink;
use crate::persist;

/// Summary of one profile restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Registers whose value changed on the drive
    pub written: usize,
    /// Registers that already held the requested value
    pub unchanged: usize,
    /// Identity register entries omitted because overwrite was not requested
    pub omitted: usize,
    /// Registers that faulted and were skipped
    pub failed: usize,
}

impl TransferOutcome {
    /// Whether every entry was applied or already current
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Write every profile entry to one drive, in profile order.
///
/// The identity register (Pn0065) is omitted unless `overwrite_identity` is
/// set - restoring a backup must not silently reassign the drive's bus
/// address. Returns Err only when the transport itself is lost.
pub async fn write_profile(
    link: &DeviceLink,
    address: DeviceAddress,
    profile: &Profile,
    overwrite_identity: bool,
) -> Result<TransferOutcome> {
    link.events().info(format!(
        "transferring profile '{}' ({} entries) to drive {address}",
        profile.name,
        profile.len()
    ));

    let mut outcome = TransferOutcome::default();
    for entry in profile.entries() {
        if entry.key == IDENTITY_REGISTER && !overwrite_identity {
            link.events().info(format!(
                "drive {address}: omitted identity register {IDENTITY_REGISTER}"
            ));
            outcome.omitted += 1;
            continue;
        }

        match link.write_register(address, entry.key, entry.value).await {
            Ok(crate::link::WriteOutcome::Written) => outcome.written += 1,
            Ok(crate::link::WriteOutcome::Unchanged) => outcome.unchanged += 1,
            Err(e) if e.is_connection_fault() => {
                link.events().error(format!(
                    "transfer to drive {address} aborted, state unknown: {e}"
                ));
                return Err(e);
            }
            Err(_) => {
                // Fault already on the event stream; keep going.
                outcome.failed += 1;
            }
        }
    }

    link.events().info(format!(
        "transfer to drive {address} finished: {} written, {} unchanged, {} omitted, {} failed",
        outcome.written, outcome.unchanged, outcome.omitted, outcome.failed
    ));
    Ok(outcome)
}

/// Read every register in the inclusive range from one drive into a new
/// profile stamped with the current time and the origin address.
///
/// Each register is an individual bus transaction - simple and
/// bus-expensive, acceptable for a rare user-initiated backup.
pub async fn backup_profile(
    link: &DeviceLink,
    address: DeviceAddress,
    range: (u16, u16),
    meta: ProfileMeta,
) -> Result<Profile> {
    let (start, end) = range;
    link.events().info(format!(
        "backing up drive {address}, registers {start}-{end}"
    ));

    let mut profile = Profile::new(address, meta);
    for raw in start..=end {
        let key = RegisterKey::new(raw);
        let value = link.read_register(address, key).await?;
        profile.set(key, value);
    }

    link.events().info(format!(
        "backup of drive {address} captured {} registers",
        profile.len()
    ));
    Ok(profile)
}

/// Transfer one profile to several drives in turn, optionally committing
/// each drive's parameters to EEPROM afterwards.
///
/// Per-drive failures are recorded and the next drive is still attempted;
/// only loss of the transport stops the whole run.
pub async fn transfer_to_many(
    link: &DeviceLink,
    profile: &Profile,
    addresses: &[DeviceAddress],
    persist_after: bool,
) -> Result<Vec<(DeviceAddress, TransferOutcome)>> {
    let mut results = Vec::with_capacity(addresses.len());
    for &address in addresses {
        let outcome = write_profile(link, address, profile, false).await?;
        if persist_after && outcome.is_clean() {
            if let Err(e) = persist::persist_to_memory(link, address).await {
                if e.is_connection_fault() {
                    return Err(e);
                }
                link.events()
                    .error(format!("drive {address}: EEPROM commit failed: {e}"));
            }
        } else if persist_after {
            link.events().warn(format!(
                "drive {address}: skipping EEPROM commit, {} entry(ies) failed",
                outcome.failed
            ));
        }
        results.push((address, outcome));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::testing::{addr, key, seed, writes, MockTransport};
    use chrono::Utc;

    fn profile_with(entries: &[(u16, u16)]) -> Profile {
        let mut profile = Profile::new(addr(1), ProfileMeta::default());
        for &(k, v) in entries {
            profile.set(RegisterKey::new(k), v);
        }
        profile
    }

    #[tokio::test]
    async fn identity_register_is_never_written_without_override() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        seed(&state, 4, 65, 4);
        seed(&state, 4, 110, 0);
        seed(&state, 4, 111, 0);

        let profile = profile_with(&[(110, 40), (65, 9), (111, 120)]);
        let outcome = write_profile(&link, addr(4), &profile, false)
            .await
            .unwrap();

        assert_eq!(outcome.omitted, 1);
        assert_eq!(outcome.written, 2);
        let touched: Vec<u16> = writes(&state).iter().map(|w| w.1).collect();
        assert!(!touched.contains(&65), "identity register was written");
    }

    #[tokio::test]
    async fn identity_override_writes_the_identity_register() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        seed(&state, 4, 65, 4);

        let profile = profile_with(&[(65, 6)]);
        let outcome = write_profile(&link, addr(4), &profile, true).await.unwrap();
        assert_eq!(outcome.written, 1);
        assert_eq!(writes(&state), vec![(4, 65, 6)]);
    }

    #[tokio::test]
    async fn one_failed_entry_does_not_stop_the_rest() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        for k in [100, 101, 102] {
            seed(&state, 2, k, 0);
        }
        state.lock().unwrap().fail_writes.insert((2, 101));

        let profile = profile_with(&[(100, 1), (101, 2), (102, 3)]);
        let outcome = write_profile(&link, addr(2), &profile, false)
            .await
            .unwrap();

        assert_eq!(outcome.written, 2);
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.is_clean());
        // the failing register was attempted, the later one still written
        let touched: Vec<u16> = writes(&state).iter().map(|w| w.1).collect();
        assert_eq!(touched, vec![100, 101, 102]);
    }

    #[tokio::test]
    async fn connection_loss_aborts_the_whole_restore() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        state.lock().unwrap().connected = false;

        let profile = profile_with(&[(100, 1), (101, 2)]);
        let err = write_profile(&link, addr(2), &profile, false)
            .await
            .unwrap_err();
        assert!(err.is_connection_fault());
    }

    #[tokio::test]
    async fn unchanged_values_are_counted_not_rewritten() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        seed(&state, 2, 100, 1);

        let profile = profile_with(&[(100, 1)]);
        let outcome = write_profile(&link, addr(2), &profile, false)
            .await
            .unwrap();
        assert_eq!(outcome.unchanged, 1);
        assert!(writes(&state).is_empty());
    }

    #[tokio::test]
    async fn backup_reads_the_whole_range_in_order() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        for k in 10..=14 {
            seed(&state, 3, k, k * 2);
        }

        let before = Utc::now();
        let profile = backup_profile(&link, addr(3), (10, 14), ProfileMeta::default())
            .await
            .unwrap();

        assert_eq!(profile.len(), 5);
        assert_eq!(profile.get(key(12)), Some(24));
        assert_eq!(profile.origin_device, addr(3));
        assert!(profile.created >= before);
        let read_keys: Vec<u16> = state.lock().unwrap().reads.iter().map(|r| r.1).collect();
        assert_eq!(read_keys, vec![10, 11, 12, 13, 14]);
    }

    #[tokio::test]
    async fn multi_drive_transfer_touches_every_drive() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        for drive in [1u8, 2] {
            seed(&state, drive, 100, 0);
        }

        let profile = profile_with(&[(100, 7)]);
        let results = transfer_to_many(&link, &profile, &[addr(1), addr(2)], false)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, o)| o.written == 1));
        assert_eq!(writes(&state), vec![(1, 100, 7), (2, 100, 7)]);
    }
}
