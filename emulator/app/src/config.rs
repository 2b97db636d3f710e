// Licensed under the Apache-2.0 license

use anyhow::Context;
use emulator_hfrp_host::HfrpConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Settings read from a TOML file. Absent keys keep their defaults.
///
/// ```toml
/// enabled = true
/// command_mailbox = 0
/// response_mailbox = 1
/// doorbell_timeout_ms = 1000
/// poll_interval_us = 50
/// free_sequence_id_on_timeout = true
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HfrpFileConfig {
    pub enabled: Option<bool>,
    pub command_mailbox: Option<u32>,
    pub response_mailbox: Option<u32>,
    pub doorbell_timeout_ms: Option<u64>,
    pub poll_interval_us: Option<u64>,
    pub free_sequence_id_on_timeout: Option<bool>,
}

impl HfrpFileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::de::from_str(contents)?)
    }

    /// Overwrites the fields of `config` that this file sets.
    pub fn apply(&self, config: &mut HfrpConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(mailbox) = self.command_mailbox {
            config.command_mailbox = mailbox;
        }
        if let Some(mailbox) = self.response_mailbox {
            config.response_mailbox = mailbox;
        }
        if let Some(ms) = self.doorbell_timeout_ms {
            config.doorbell_timeout = Duration::from_millis(ms);
        }
        if let Some(us) = self.poll_interval_us {
            config.poll_interval = Duration::from_micros(us);
        }
        if let Some(free) = self.free_sequence_id_on_timeout {
            config.free_sequence_id_on_timeout = free;
        }
    }
}
