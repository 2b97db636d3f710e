// Licensed under the Apache-2.0 license

use hfrp_common::RingError;
use thiserror::Error;

pub type HfrpResult<T> = Result<T, HfrpError>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HfrpError {
    #[error("HFRP is not enabled")]
    FeatureNotEnabled,
    #[error("no free sequence ID")]
    InUse,
    #[error("ring has no room for the message")]
    RingFull,
    #[error("ring is empty")]
    RingEmpty,
    #[error("timed out waiting for the response doorbell")]
    Timeout,
    #[error("response payload of {needed} bytes exceeds caller buffer of {capacity} bytes")]
    BufferTooSmall { needed: usize, capacity: usize },
    #[error("payload of {size} bytes exceeds the protocol maximum")]
    InsufficientResources { size: usize },
    #[error("mailbox interface was reset")]
    InterfaceReset,
    #[error("mailbox indices {command}/{response} out of range (max {max})")]
    InvalidMailboxIndex { command: u32, response: u32, max: u32 },
}

impl HfrpError {
    /// Status code name reported by the firmware-facing interface.
    pub fn nv_status(&self) -> &'static str {
        match self {
            HfrpError::FeatureNotEnabled => "NV_ERR_FEATURE_NOT_ENABLED",
            HfrpError::InUse => "NV_ERR_IN_USE",
            HfrpError::RingFull | HfrpError::RingEmpty => "NV_ERR_GENERIC",
            HfrpError::Timeout => "NV_ERR_TIMEOUT",
            HfrpError::BufferTooSmall { .. } => "NV_ERR_BUFFER_TOO_SMALL",
            HfrpError::InsufficientResources { .. } => "NV_ERR_INSUFFICIENT_RESOURCES",
            HfrpError::InterfaceReset => "NV_ERR_RESET_REQUIRED",
            HfrpError::InvalidMailboxIndex { .. } => "NV_ERR_INVALID_ARGUMENT",
        }
    }
}

impl From<RingError> for HfrpError {
    fn from(err: RingError) -> Self {
        match err {
            RingError::Full => HfrpError::RingFull,
            RingError::Empty => HfrpError::RingEmpty,
        }
    }
}
