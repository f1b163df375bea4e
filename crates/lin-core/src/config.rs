//! Node configuration, stored as TOML.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::checksum::ChecksumVariant;
use crate::error::LinError;
use crate::frame::Frame;
use crate::protocol::constants::*;
use crate::state::EngineConfig;

/// One frame slot: a master schedule entry or a slave response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub identifier: u8,
    /// Response length to receive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Response bytes to publish.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    /// Pause after the slot (schedule only).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delay_ms: u64,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl FrameEntry {
    /// Build a fresh frame for one exchange.
    pub fn to_frame(&self) -> std::result::Result<Frame, LinError> {
        Frame::with_payload(self.identifier, self.length, self.data.clone())
    }
}

/// Configuration for a LIN node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Serial device path.
    pub device: String,
    pub baud_rate: u32,
    /// Checksum for identifiers 0..=59, `enhanced` unless set.
    pub checksum: ChecksumVariant,
    pub wake_up_pulse_us: u64,
    /// Filler for bytes 2..=8 of the goto-sleep command.
    pub sleep_filler: u8,
    /// Slave header wait, 0 waits forever.
    pub header_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub read_timeout_ms: u64,
    /// Transceiver echoes written bytes.
    pub echo: bool,
    /// Master schedule table.
    pub schedule: Vec<FrameEntry>,
    /// Slave response table.
    pub responses: Vec<FrameEntry>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            checksum: ChecksumVariant::Enhanced,
            wake_up_pulse_us: WAKE_UP_PULSE_DEFAULT.as_micros() as u64,
            sleep_filler: SLEEP_FILLER_DEFAULT,
            header_timeout_ms: 0,
            poll_interval_ms: 1,
            read_timeout_ms: 50,
            echo: false,
            schedule: Vec::new(),
            responses: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value the engine would otherwise reject at runtime.
    pub fn validate(&self) -> Result<()> {
        let pulse = self.wake_up_pulse();
        if !(WAKE_UP_PULSE_MIN..=WAKE_UP_PULSE_MAX).contains(&pulse) {
            bail!(LinError::InvalidWakeUpPulse(pulse));
        }
        if self.baud_rate == 0 {
            bail!("baud_rate must be non-zero");
        }
        for entry in self.schedule.iter().chain(&self.responses) {
            entry
                .to_frame()
                .with_context(|| format!("frame entry for identifier {}", entry.identifier))?;
        }
        Ok(())
    }

    pub fn wake_up_pulse(&self) -> Duration {
        Duration::from_micros(self.wake_up_pulse_us)
    }

    pub fn header_timeout(&self) -> Option<Duration> {
        (self.header_timeout_ms > 0).then(|| Duration::from_millis(self.header_timeout_ms))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            checksum: self.checksum,
            wake_up_pulse: self.wake_up_pulse(),
            sleep_filler: self.sleep_filler,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
