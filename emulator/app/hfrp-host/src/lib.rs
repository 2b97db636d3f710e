// Licensed under the Apache-2.0 license

//! Host driver for the HFRP mailbox.

pub mod config;
pub mod error;
pub mod mailbox;
pub mod seq_id;

pub use config::HfrpConfig;
pub use error::{HfrpError, HfrpResult};
pub use mailbox::{AsyncNotificationHandler, CommandResponse, HfrpMailbox, InboundMessage};
