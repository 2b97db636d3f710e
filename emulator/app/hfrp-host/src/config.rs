// Licensed under the Apache-2.0 license

use std::time::Duration;

use hfrp_common::layout::HFRP_MAX_MAILBOX_INDEX;
use hfrp_common::MailboxIoInfo;

use crate::error::{HfrpError, HfrpResult};

pub const DEFAULT_DOORBELL_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(50);

/// Runtime settings for one HFRP mailbox engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HfrpConfig {
    /// When false every command fails with `FeatureNotEnabled`.
    pub enabled: bool,
    pub command_mailbox: u32,
    pub response_mailbox: u32,
    /// How long a blocking post waits for the response doorbell.
    pub doorbell_timeout: Duration,
    pub poll_interval: Duration,
    /// Release the sequence ID of a command that timed out.
    ///
    /// A response that arrives afterwards is dropped as stale, unless the ID
    /// has already been handed to a new command, in which case that command
    /// would receive it. When false the ID stays allocated until
    /// `interface_reset`.
    pub free_sequence_id_on_timeout: bool,
}

impl Default for HfrpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command_mailbox: 0,
            response_mailbox: 1,
            doorbell_timeout: DEFAULT_DOORBELL_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            free_sequence_id_on_timeout: true,
        }
    }
}

impl HfrpConfig {
    pub fn io_info(&self) -> HfrpResult<MailboxIoInfo> {
        MailboxIoInfo::new(self.command_mailbox, self.response_mailbox).ok_or(
            HfrpError::InvalidMailboxIndex {
                command: self.command_mailbox,
                response: self.response_mailbox,
                max: HFRP_MAX_MAILBOX_INDEX,
            },
        )
    }
}
