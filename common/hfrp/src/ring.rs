// Licensed under the Apache-2.0 license

//! Circular buffer codec for the command and response rings.
//!
//! The codec moves bytes between a flat buffer and a ring, wrapping at the
//! ring's last byte. It does not look at head or tail; callers check for
//! space or unread data first. [`Ring`] layers the head/tail bookkeeping
//! on top and is used by both ends of the mailbox.

use crate::aperture::MailboxAperture;
use crate::header::HfrpHeader;
use crate::layout::{MailboxIoInfo, MailboxRing, RingLayout};
use crate::HFRP_HEADER_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingError {
    /// Not enough free space for the message.
    Full,
    /// Head equals tail.
    Empty,
}

fn next_addr(layout: &RingLayout, addr: u32) -> u32 {
    if addr > layout.end_addr {
        layout.start_addr
    } else {
        addr
    }
}

fn word_fits(layout: &RingLayout, addr: u32, remaining: usize) -> bool {
    addr % 4 == 0 && remaining >= 4 && addr + 3 <= layout.end_addr
}

/// Copies `buf` into the ring whose data region contains `start_addr`.
///
/// Returns the address following the last byte written, wrapped to the
/// start of the ring if needed. An address outside both rings copies
/// nothing and is returned unchanged.
pub fn write_mailbox_data<A: MailboxAperture + ?Sized>(
    aperture: &A,
    io: &MailboxIoInfo,
    buf: &[u8],
    start_addr: u32,
) -> u32 {
    let Some(layout) = io.ring_for_addr(start_addr) else {
        return start_addr;
    };
    let mut addr = start_addr;
    let mut i = 0;
    while i < buf.len() {
        if word_fits(layout, addr, buf.len() - i) {
            let word = u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
            aperture.write_word(addr, word);
            addr += 4;
            i += 4;
        } else {
            aperture.write_byte(addr, buf[i]);
            addr += 1;
            i += 1;
        }
        addr = next_addr(layout, addr);
    }
    addr
}

/// Fills `buf` from the ring whose data region contains `start_addr`.
///
/// Mirror of [`write_mailbox_data`].
pub fn read_mailbox_data<A: MailboxAperture + ?Sized>(
    aperture: &A,
    io: &MailboxIoInfo,
    buf: &mut [u8],
    start_addr: u32,
) -> u32 {
    let Some(layout) = io.ring_for_addr(start_addr) else {
        return start_addr;
    };
    let mut addr = start_addr;
    let mut i = 0;
    while i < buf.len() {
        if word_fits(layout, addr, buf.len() - i) {
            let word = aperture.read_word(addr).to_le_bytes();
            buf[i..i + 4].copy_from_slice(&word);
            addr += 4;
            i += 4;
        } else {
            buf[i] = aperture.read_byte(addr);
            addr += 1;
            i += 1;
        }
        addr = next_addr(layout, addr);
    }
    addr
}

/// One ring of a mailbox, seen through an aperture.
pub struct Ring<'a, A: MailboxAperture + ?Sized> {
    aperture: &'a A,
    io: &'a MailboxIoInfo,
    layout: &'a RingLayout,
}

impl<'a, A: MailboxAperture + ?Sized> Ring<'a, A> {
    pub fn new(aperture: &'a A, io: &'a MailboxIoInfo, ring: MailboxRing) -> Self {
        Self {
            aperture,
            io,
            layout: io.ring(ring),
        }
    }

    pub fn layout(&self) -> &RingLayout {
        self.layout
    }

    pub fn capacity(&self) -> usize {
        self.layout.capacity() as usize
    }

    pub fn head(&self) -> u8 {
        self.aperture.read_byte(self.layout.head_addr)
    }

    pub fn tail(&self) -> u8 {
        self.aperture.read_byte(self.layout.tail_addr)
    }

    pub fn set_head(&self, head: u8) {
        self.aperture.write_byte(self.layout.head_addr, head);
    }

    pub fn set_tail(&self, tail: u8) {
        self.aperture.write_byte(self.layout.tail_addr, tail);
    }

    /// Unread bytes between tail and head.
    ///
    /// Pointers at or past capacity are taken modulo capacity.
    pub fn occupancy(&self) -> usize {
        let capacity = self.capacity();
        let head = self.head() as usize % capacity;
        let tail = self.tail() as usize % capacity;
        (head + capacity - tail) % capacity
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    /// Largest payload that [`Ring::queue_message`] would accept right now.
    pub fn free_payload_space(&self) -> usize {
        self.capacity()
            .saturating_sub(self.occupancy() + HFRP_HEADER_SIZE + 1)
    }

    fn addr_of(&self, offset: u8) -> u32 {
        self.layout.offset_to_addr(offset as u32)
    }

    fn offset_of(&self, addr: u32) -> u8 {
        self.layout.addr_to_offset(addr) as u8
    }

    /// Writes header and payload at head and publishes the new head.
    ///
    /// The ring is considered full once a message would leave it with no
    /// spare byte, so `capacity - 1` bytes are usable at most.
    pub fn queue_message(&self, header: HfrpHeader, payload: &[u8]) -> Result<(), RingError> {
        if self.occupancy() + payload.len() + HFRP_HEADER_SIZE >= self.capacity() {
            return Err(RingError::Full);
        }
        let addr = self.addr_of(self.head());
        let addr = write_mailbox_data(self.aperture, self.io, &header.to_le_bytes(), addr);
        let addr = write_mailbox_data(self.aperture, self.io, payload, addr);
        self.set_head(self.offset_of(addr));
        Ok(())
    }

    /// Reads the header at tail without consuming it.
    pub fn peek_header(&self) -> Result<HfrpHeader, RingError> {
        if self.is_empty() {
            return Err(RingError::Empty);
        }
        let mut bytes = [0u8; HFRP_HEADER_SIZE];
        read_mailbox_data(self.aperture, self.io, &mut bytes, self.addr_of(self.tail()));
        Ok(HfrpHeader::from_le_bytes(bytes))
    }

    /// Copies the payload following `header` into `buf`.
    ///
    /// Copies at most `buf.len()` bytes and returns the number copied.
    pub fn read_payload(&self, header: HfrpHeader, buf: &mut [u8]) -> usize {
        let len = header.payload_size().min(buf.len());
        let start = self
            .layout
            .offset_to_addr(self.tail() as u32 + HFRP_HEADER_SIZE as u32);
        read_mailbox_data(self.aperture, self.io, &mut buf[..len], start);
        len
    }

    /// Moves tail past the message described by `header`.
    ///
    /// Never advances beyond head, even for a header that announces more
    /// bytes than were written.
    pub fn consume_message(&self, header: HfrpHeader) {
        let advance = header.wire_size().min(self.occupancy());
        let tail = (self.tail() as usize + advance) % self.capacity();
        self.set_tail(tail as u8);
    }

    /// Resets both pointers, discarding anything in flight.
    pub fn reset(&self) {
        self.set_head(0);
        self.set_tail(0);
    }
}
