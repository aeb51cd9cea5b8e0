//! Tool configuration
//!
//! Layered via figment: built-in defaults, then `servoctl.toml`, then
//! `SERVOCTL_*` environment overrides (nested keys separated by `__`,
//! e.g. `SERVOCTL_BUS__SERIAL__PORT=/dev/ttyUSB0`).

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use servo_bus::BusConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CtlConfig {
    /// Bus and serial link settings
    pub bus: BusConfig,
    /// Parameter catalog file used for reconciliation and bounds checks
    pub catalog: Option<PathBuf>,
    /// Directory where backup profiles are written by default
    pub profile_dir: Option<PathBuf>,
}

pub fn load(path: &Path) -> Result<CtlConfig> {
    Figment::new()
        .merge(Serialized::defaults(CtlConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SERVOCTL_").split("__"))
        .extract()
        .with_context(|| format!("loading configuration from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_a_file() {
        let config = load(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.bus.serial.baud_rate, 9600);
        assert_eq!(config.bus.max_address, 8);
        assert!(config.catalog.is_none());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servoctl.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[bus]\nmax_address = 4\n\n[bus.serial]\nport = \"/dev/ttyUSB1\"\nbaud_rate = 19200"
        )
        .unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.bus.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.bus.serial.baud_rate, 19200);
        assert_eq!(config.bus.max_address, 4);
        // untouched keys keep their defaults
        assert_eq!(config.bus.serial.timeout_ms, 500);
    }
}
