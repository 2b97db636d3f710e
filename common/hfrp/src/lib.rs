// Licensed under the Apache-2.0 license

//! Shared definitions for the HFRP (Host-FW Remote Procedure) mailbox.
//!
//! Both the host driver and the firmware side of the mailbox agree on the
//! contents of this crate: the message header, the ring layouts inside the
//! MMIO window, the doorbell bits and the ring buffer codec.

pub mod aperture;
pub mod commands;
pub mod header;
pub mod layout;
pub mod ring;

pub use aperture::MailboxAperture;
pub use header::HfrpHeader;
pub use layout::{DoorbellRegs, MailboxIoInfo, MailboxRing, RingLayout};
pub use ring::{read_mailbox_data, write_mailbox_data, Ring, RingError};

use tock_registers::register_bitfields;

/// Size of the bit-packed message header.
pub const HFRP_HEADER_SIZE: usize = 4;

/// Largest message (header included) either side may place on a ring.
pub const HFRP_MAX_MESSAGE_SIZE: usize = 50;

/// Largest payload carried by a single message.
pub const HFRP_MAX_PAYLOAD_SIZE: usize = HFRP_MAX_MESSAGE_SIZE - HFRP_HEADER_SIZE;

/// Number of sequence IDs addressable by the 10-bit header field.
pub const HFRP_SEQUENCE_ID_COUNT: usize = 1024;

/// Sequence ID reserved for firmware-initiated notifications.
pub const HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID: u16 = 1023;

/// Largest value of the 10-bit command index / response status field.
pub const HFRP_MAX_INDEX_OR_STATUS: u16 = 0x3FF;

/// Bit used by every doorbell register.
pub const HFRP_DOORBELL_BIT: u32 = 1;

register_bitfields! [
    u32,

    /// Doorbell set / clear registers
    pub DoorbellIrq [
        RING OFFSET(1) NUMBITS(1) [],
    ],
];
