//! Drive discovery
//!
//! Probes candidate unit identifiers one by one - the bus is half-duplex,
//! parallel probing would corrupt framing - by reading the identity register
//! at each slot. A slot that answers is occupied; a slot that times out or
//! faults is skipped without retry.
//!
//! The probe slot itself is recorded as the discovered address: it is the
//! unit id that actually answered and the one every later operation must
//! address. A drive whose identity register reports a different number is
//! kept and flagged with a warning so the operator can fix the
//! misconfiguration.

use servo_model::DeviceAddress;

use crate::constants::IDENTITY_REGISTER;
use crate::error::{Result, ServoBusError};
use crate::link::DeviceLink;

/// Probe slots 1..=max_address and return the occupied ones in order.
pub async fn search(link: &DeviceLink, max_address: u8) -> Result<Vec<DeviceAddress>> {
    if !link.is_connected().await {
        return Err(ServoBusError::NotConnected);
    }

    link.events().info(format!(
        "searching drives on slots 1-{max_address}, please wait"
    ));

    let mut found = Vec::new();
    for slot in 1..=max_address {
        let address =
            DeviceAddress::new(slot).map_err(|e| ServoBusError::Config(e.to_string()))?;

        match link.read_register(address, IDENTITY_REGISTER).await {
            Ok(reported) => {
                if reported != slot as u16 {
                    link.events().warn(format!(
                        "drive at slot {slot} reports identity {reported}; \
                         keeping slot {slot} for addressing"
                    ));
                }
                link.events().info(format!("drive found at address {slot}"));
                found.push(address);
            }
            Err(e) if e.is_connection_fault() => return Err(e),
            Err(_) => {
                // Read error already published by the link; the slot is
                // simply unoccupied.
                link.events().info(format!("no drive at address {slot}"));
            }
        }
    }

    if found.is_empty() {
        link.events().warn("no drives found");
    } else {
        link.events().info(format!("{} drive(s) found", found.len()));
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, Severity};
    use crate::testing::{seed, MockTransport};

    #[tokio::test]
    async fn occupied_slots_are_returned_in_order() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        seed(&state, 2, 65, 2);
        seed(&state, 5, 65, 5);

        let found = search(&link, 8).await.unwrap();
        let slots: Vec<u8> = found.iter().map(|a| a.get()).collect();
        assert_eq!(slots, vec![2, 5]);
        // every slot probed exactly once, no retries
        assert_eq!(state.lock().unwrap().reads.len(), 8);
    }

    #[tokio::test]
    async fn identity_mismatch_keeps_slot_and_warns() {
        let (mock, state) = MockTransport::new();
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let link = DeviceLink::new(Box::new(mock), events);
        seed(&state, 3, 65, 7); // misconfigured drive

        let found = search(&link, 3).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get(), 3);

        let mut warned = false;
        while let Ok(event) = rx.try_recv() {
            if event.severity == Severity::Warning && event.message.contains("identity 7") {
                warned = true;
            }
        }
        assert!(warned, "expected identity mismatch warning");
    }

    #[tokio::test]
    async fn search_requires_a_connection() {
        let (mock, state) = MockTransport::new();
        state.lock().unwrap().connected = false;
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        assert!(matches!(
            search(&link, 8).await,
            Err(ServoBusError::NotConnected)
        ));
    }
}
