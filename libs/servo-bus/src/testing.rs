//! Test doubles for the transport seam
//!
//! `MockTransport` is a scriptable in-memory bus: registers live in a map
//! keyed by (unit id, register), every read/write attempt is recorded, and
//! individual (unit id, register) slots can be made to fail. A register with
//! no entry behaves like an empty address slot - the read times out the way
//! an absent drive would.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use servo_model::{DeviceAddress, RegisterKey};

use crate::config::SerialConfig;
use crate::error::{Result, ServoBusError};
use crate::transport::Transport;

#[derive(Debug, Default)]
pub struct MockState {
    pub registers: HashMap<(u8, u16), u16>,
    pub reads: Vec<(u8, u16)>,
    pub writes: Vec<(u8, u16, u16)>,
    pub fail_reads: HashSet<(u8, u16)>,
    pub fail_writes: HashSet<(u8, u16)>,
    pub connected: bool,
    pub fail_connect: bool,
}

pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a mock plus the shared state handle used for seeding and
    /// assertions after the transport has been moved into a link.
    pub fn new() -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState {
            connected: true,
            ..MockState::default()
        }));
        (
            MockTransport {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

/// Seed one register on the mock bus
pub fn seed(state: &Arc<Mutex<MockState>>, address: u8, key: u16, value: u16) {
    state
        .lock()
        .unwrap()
        .registers
        .insert((address, key), value);
}

/// Writes recorded so far as (unit id, register, value) triples
pub fn writes(state: &Arc<Mutex<MockState>>) -> Vec<(u8, u16, u16)> {
    state.lock().unwrap().writes.clone()
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self, _config: &SerialConfig) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_connect {
            return Err(ServoBusError::Connection("injected connect fault".into()));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.state.lock().unwrap().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    async fn read_holding(&mut self, address: DeviceAddress, key: RegisterKey) -> Result<u16> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(ServoBusError::NotConnected);
        }
        let slot = (address.get(), key.get());
        state.reads.push(slot);
        if state.fail_reads.contains(&slot) {
            return Err(ServoBusError::Read {
                address,
                key,
                reason: "injected read fault".into(),
            });
        }
        state.registers.get(&slot).copied().ok_or(ServoBusError::Read {
            address,
            key,
            reason: "no response within 500 ms".into(),
        })
    }

    async fn write_single(
        &mut self,
        address: DeviceAddress,
        key: RegisterKey,
        value: u16,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(ServoBusError::NotConnected);
        }
        let slot = (address.get(), key.get());
        state.writes.push((slot.0, slot.1, value));
        if state.fail_writes.contains(&slot) {
            return Err(ServoBusError::Write {
                address,
                key,
                reason: "injected write fault".into(),
            });
        }
        state.registers.insert(slot, value);
        Ok(())
    }
}

/// Shorthand for a validated address in tests
pub fn addr(n: u8) -> DeviceAddress {
    DeviceAddress::new(n).unwrap()
}

/// Shorthand for a register key in tests
pub fn key(n: u16) -> RegisterKey {
    RegisterKey::new(n)
}
