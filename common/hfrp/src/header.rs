// Licensed under the Apache-2.0 license

//! HFRP message header.
//!
//! Every message on either ring starts with a 32-bit little-endian header
//! followed by `size - 4` payload bytes.

use bitfield::bitfield;

use crate::{
    HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID, HFRP_HEADER_SIZE, HFRP_MAX_INDEX_OR_STATUS,
    HFRP_SEQUENCE_ID_COUNT,
};

bitfield! {
    #[derive(Clone, Copy, Default, PartialEq, Eq)]
    pub struct HfrpHeader(u32);
    impl Debug;
    u16;
    /// Message size in bytes, header included.
    pub u8, size, set_size: 7, 0;
    pub sequence_id, set_sequence_id: 17, 8;
    /// Command index on the command ring, response status on the response ring.
    pub index_or_status, set_index_or_status: 27, 18;
}

impl HfrpHeader {
    pub fn new(size: u8, sequence_id: u16, index_or_status: u16) -> Self {
        let mut header = HfrpHeader(0);
        header.set_size(size);
        header.set_sequence_id(sequence_id & (HFRP_SEQUENCE_ID_COUNT as u16 - 1));
        header.set_index_or_status(index_or_status & HFRP_MAX_INDEX_OR_STATUS);
        header
    }

    /// Builds the header for a message carrying `payload_len` bytes.
    ///
    /// The size field saturates at 255 for payloads no ring could hold.
    pub fn with_payload(sequence_id: u16, index_or_status: u16, payload_len: usize) -> Self {
        let size = u8::try_from(HFRP_HEADER_SIZE.saturating_add(payload_len)).unwrap_or(u8::MAX);
        Self::new(size, sequence_id, index_or_status)
    }

    pub fn command_index(&self) -> u16 {
        self.index_or_status()
    }

    pub fn response_status(&self) -> u16 {
        self.index_or_status()
    }

    /// Number of payload bytes announced by the header.
    pub fn payload_size(&self) -> usize {
        (self.size() as usize).saturating_sub(HFRP_HEADER_SIZE)
    }

    /// Number of ring bytes the message occupies.
    ///
    /// A header announcing less than its own size still occupies the header.
    pub fn wire_size(&self) -> usize {
        (self.size() as usize).max(HFRP_HEADER_SIZE)
    }

    pub fn is_async_notification(&self) -> bool {
        self.sequence_id() == HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID
    }

    pub fn to_le_bytes(self) -> [u8; HFRP_HEADER_SIZE] {
        self.0.to_le_bytes()
    }

    pub fn from_le_bytes(bytes: [u8; HFRP_HEADER_SIZE]) -> Self {
        HfrpHeader(u32::from_le_bytes(bytes))
    }
}
