use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::externals::sensor_link::parse::ParsePolicy;

/// Configuration for the sensor link. Every field has a default matching
/// the fixed HC-05 module this tool was built for, so running without a
/// config file works out of the box.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// MAC address of the HC-05 module.
    pub device_address: String,

    /// RFCOMM channel the module's Serial Port Profile service is bound to.
    pub channel: u8,

    /// How humidity values are extracted from received text.
    pub parse_policy: ParsePolicy,

    /// Size of the read buffer in bytes.
    pub read_buffer_bytes: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_address: "98:D3:31:F5:A3:00".to_string(),
            channel: 1,
            parse_policy: ParsePolicy::BareNumber,
            read_buffer_bytes: 1024,
        }
    }
}

impl LinkConfig {
    pub const DEFAULT_PATH: &'static str = "hygrolink.toml";

    /// Load the configuration from the default path, falling back to the
    /// built-in defaults when no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(Self::DEFAULT_PATH))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
