//! Bus-wide protocol constants

use servo_model::RegisterKey;
use std::time::Duration;

/// Register holding the drive's configured unit identifier (Pn0065).
/// Discovery probes it; profile transfer refuses to overwrite it unless
/// explicitly told to.
pub const IDENTITY_REGISTER: RegisterKey = RegisterKey::new(65);

/// Register driving the commit-to-EEPROM handshake (Pn0081)
pub const SAVE_STATE_REGISTER: RegisterKey = RegisterKey::new(81);

/// Settle time the drive needs after every register write. Writes issued
/// faster than this are silently ignored by the drive.
pub const WRITE_SETTLE: Duration = Duration::from_millis(6);

/// Settle time after triggering an EEPROM save. The drive exposes no
/// save-complete flag, so the delay is the only confirmation available.
pub const EEPROM_SETTLE: Duration = Duration::from_secs(5);

/// Default highest unit identifier probed during discovery
pub const DEFAULT_MAX_ADDRESS: u8 = 8;

/// Default register range captured by a full backup (inclusive)
pub const DEFAULT_BACKUP_RANGE: (u16, u16) = (0, 280);
