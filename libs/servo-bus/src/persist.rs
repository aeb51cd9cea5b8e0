//! EEPROM persistence handshake
//!
//! In-memory register changes survive a power cycle only after the drive's
//! commit sequence: write 1 to the save-state register (Pn0081), preceded by
//! a write of 0 when the register is already nonzero - the drive re-triggers
//! only on a falling-then-rising edge. The drive exposes no save-complete
//! flag, so the fixed 5 second settle sleep is the only confirmation; it
//! must not be skipped, shortened or polled away. Persisting a whole fleet
//! costs ~5 seconds of wall-clock per drive and must stay serialized.

use servo_model::DeviceAddress;

use crate::constants::{EEPROM_SETTLE, SAVE_STATE_REGISTER};
use crate::error::{Result, ServoBusError};
use crate::link::DeviceLink;

/// Commit one drive's parameters to EEPROM, best effort.
pub async fn persist_to_memory(link: &DeviceLink, address: DeviceAddress) -> Result<()> {
    link.events().warn(format!(
        "writing parameters to EEPROM of drive {address} - takes {} seconds",
        EEPROM_SETTLE.as_secs()
    ));

    let state = link
        .read_register(address, SAVE_STATE_REGISTER)
        .await
        .map_err(|e| handshake_fault(address, e))?;

    if state != 0 {
        // Falling edge first, otherwise the rising edge below is ignored.
        link.write_register(address, SAVE_STATE_REGISTER, 0)
            .await
            .map_err(|e| handshake_fault(address, e))?;
    }
    link.write_register(address, SAVE_STATE_REGISTER, 1)
        .await
        .map_err(|e| handshake_fault(address, e))?;

    tokio::time::sleep(EEPROM_SETTLE).await;

    link.events()
        .info(format!("parameters written to EEPROM of drive {address}"));
    Ok(())
}

fn handshake_fault(address: DeviceAddress, err: ServoBusError) -> ServoBusError {
    if err.is_connection_fault() {
        err
    } else {
        ServoBusError::PersistenceTimeout {
            address,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::testing::{addr, seed, writes, MockTransport};
    use std::time::Duration;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn idle_save_register_gets_a_single_rising_edge() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        seed(&state, 2, 81, 0);

        let before = Instant::now();
        persist_to_memory(&link, addr(2)).await.unwrap();
        let elapsed = before.elapsed();

        assert_eq!(writes(&state), vec![(2, 81, 1)]);
        assert!(elapsed >= Duration::from_secs(5), "EEPROM settle skipped");
    }

    #[tokio::test(start_paused = true)]
    async fn pending_save_register_gets_falling_then_rising_edge() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        seed(&state, 2, 81, 1);

        let before = Instant::now();
        persist_to_memory(&link, addr(2)).await.unwrap();
        let elapsed = before.elapsed();

        assert_eq!(writes(&state), vec![(2, 81, 0), (2, 81, 1)]);
        assert!(elapsed >= Duration::from_secs(5), "EEPROM settle skipped");
    }

    #[tokio::test]
    async fn handshake_fault_is_a_persistence_error() {
        let (mock, state) = MockTransport::new();
        let link = DeviceLink::new(Box::new(mock), EventBus::default());
        state.lock().unwrap().fail_reads.insert((2, 81));

        let err = persist_to_memory(&link, addr(2)).await.unwrap_err();
        assert!(matches!(err, ServoBusError::PersistenceTimeout { .. }));
    }
}
