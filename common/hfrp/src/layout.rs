// Licensed under the Apache-2.0 license

//! Placement of the rings and doorbells inside the mailbox window.
//!
//! Each mailbox index selects a 0x200 byte window. When the command and
//! response mailboxes are the same, both rings share that window; otherwise
//! each ring owns a full window.

/// Size of the MMIO window behind one mailbox index.
pub const HFRP_MAILBOX_WINDOW_SIZE: u32 = 0x200;

/// Highest mailbox index a layout may select.
pub const HFRP_MAX_MAILBOX_INDEX: u32 = 15;

/// Ring head and tail pointers are single bytes.
pub const HFRP_MAX_RING_CAPACITY: u32 = 0x100;

// Doorbell registers, relative to the window that owns them.
const IRQ_IN_SET_OFFSET: u32 = 0x000;
const IRQ_OUT_SET_OFFSET: u32 = 0x004;
const IRQ_IN_CLR_OFFSET: u32 = 0x008;
const IRQ_OUT_CLR_OFFSET: u32 = 0x00C;

// One-mailbox layout
const SHARED_CMD_HEAD_OFFSET: u32 = 0x110;
const SHARED_CMD_TAIL_OFFSET: u32 = 0x111;
const SHARED_CMD_START_OFFSET: u32 = 0x114;
const SHARED_CMD_END_OFFSET: u32 = 0x187;
const SHARED_RSP_HEAD_OFFSET: u32 = 0x188;
const SHARED_RSP_TAIL_OFFSET: u32 = 0x189;
const SHARED_RSP_START_OFFSET: u32 = 0x18C;
const SHARED_RSP_END_OFFSET: u32 = 0x1FF;

// Two-mailbox layout, identical in both windows
const SPLIT_HEAD_OFFSET: u32 = 0x010;
const SPLIT_TAIL_OFFSET: u32 = 0x011;
const SPLIT_START_OFFSET: u32 = 0x100;
const SPLIT_END_OFFSET: u32 = 0x1FF;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MailboxRing {
    /// Host produces, firmware consumes.
    Command,
    /// Firmware produces, host consumes.
    Response,
}

/// Addresses of one circular buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RingLayout {
    pub head_addr: u32,
    pub tail_addr: u32,
    pub start_addr: u32,
    /// Last byte of the ring, inclusive.
    pub end_addr: u32,
}

impl RingLayout {
    pub const fn capacity(&self) -> u32 {
        self.end_addr - self.start_addr + 1
    }

    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.start_addr && addr <= self.end_addr
    }

    pub const fn offset_to_addr(&self, offset: u32) -> u32 {
        self.start_addr + offset % self.capacity()
    }

    pub const fn addr_to_offset(&self, addr: u32) -> u32 {
        addr - self.start_addr
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoorbellRegs {
    /// Host -> firmware doorbell
    pub irq_in_set: u32,
    /// Firmware -> host doorbell
    pub irq_out_set: u32,
    pub irq_in_clr: u32,
    pub irq_out_clr: u32,
}

/// Static description of the rings and doorbells for one mailbox pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MailboxIoInfo {
    pub command: RingLayout,
    pub response: RingLayout,
    pub doorbells: DoorbellRegs,
}

impl MailboxIoInfo {
    /// Returns `None` when either index is above [`HFRP_MAX_MAILBOX_INDEX`].
    pub const fn new(command_mailbox: u32, response_mailbox: u32) -> Option<Self> {
        if command_mailbox > HFRP_MAX_MAILBOX_INDEX || response_mailbox > HFRP_MAX_MAILBOX_INDEX {
            return None;
        }
        if command_mailbox == response_mailbox {
            Some(Self::one_mailbox(command_mailbox))
        } else {
            Some(Self::two_mailbox(command_mailbox, response_mailbox))
        }
    }

    const fn one_mailbox(mailbox: u32) -> Self {
        let base = mailbox * HFRP_MAILBOX_WINDOW_SIZE;
        Self {
            command: RingLayout {
                head_addr: base + SHARED_CMD_HEAD_OFFSET,
                tail_addr: base + SHARED_CMD_TAIL_OFFSET,
                start_addr: base + SHARED_CMD_START_OFFSET,
                end_addr: base + SHARED_CMD_END_OFFSET,
            },
            response: RingLayout {
                head_addr: base + SHARED_RSP_HEAD_OFFSET,
                tail_addr: base + SHARED_RSP_TAIL_OFFSET,
                start_addr: base + SHARED_RSP_START_OFFSET,
                end_addr: base + SHARED_RSP_END_OFFSET,
            },
            doorbells: DoorbellRegs {
                irq_in_set: base + IRQ_IN_SET_OFFSET,
                irq_out_set: base + IRQ_OUT_SET_OFFSET,
                irq_in_clr: base + IRQ_IN_CLR_OFFSET,
                irq_out_clr: base + IRQ_OUT_CLR_OFFSET,
            },
        }
    }

    const fn two_mailbox(command_mailbox: u32, response_mailbox: u32) -> Self {
        let cmd_base = command_mailbox * HFRP_MAILBOX_WINDOW_SIZE;
        let rsp_base = response_mailbox * HFRP_MAILBOX_WINDOW_SIZE;
        Self {
            command: RingLayout {
                head_addr: cmd_base + SPLIT_HEAD_OFFSET,
                tail_addr: cmd_base + SPLIT_TAIL_OFFSET,
                start_addr: cmd_base + SPLIT_START_OFFSET,
                end_addr: cmd_base + SPLIT_END_OFFSET,
            },
            response: RingLayout {
                head_addr: rsp_base + SPLIT_HEAD_OFFSET,
                tail_addr: rsp_base + SPLIT_TAIL_OFFSET,
                start_addr: rsp_base + SPLIT_START_OFFSET,
                end_addr: rsp_base + SPLIT_END_OFFSET,
            },
            doorbells: DoorbellRegs {
                irq_in_set: cmd_base + IRQ_IN_SET_OFFSET,
                irq_out_set: rsp_base + IRQ_OUT_SET_OFFSET,
                irq_in_clr: cmd_base + IRQ_IN_CLR_OFFSET,
                irq_out_clr: rsp_base + IRQ_OUT_CLR_OFFSET,
            },
        }
    }

    pub fn ring(&self, ring: MailboxRing) -> &RingLayout {
        match ring {
            MailboxRing::Command => &self.command,
            MailboxRing::Response => &self.response,
        }
    }

    /// Finds the ring whose data region holds `addr`.
    pub fn ring_for_addr(&self, addr: u32) -> Option<&RingLayout> {
        if self.command.contains(addr) {
            Some(&self.command)
        } else if self.response.contains(addr) {
            Some(&self.response)
        } else {
            None
        }
    }

    /// Number of bytes an aperture must decode to back this layout.
    pub fn window_size(&self) -> u32 {
        let last = [
            self.command.end_addr,
            self.response.end_addr,
            self.doorbells.irq_in_set,
            self.doorbells.irq_out_set,
            self.doorbells.irq_in_clr,
            self.doorbells.irq_out_clr,
        ]
        .into_iter()
        .max()
        .unwrap_or(0);
        (last | 3) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_mailbox_layout() {
        let io = MailboxIoInfo::new(0, 0).unwrap();
        assert_eq!(io.command.head_addr, 0x110);
        assert_eq!(io.command.start_addr, 0x114);
        assert_eq!(io.command.capacity(), 116);
        assert_eq!(io.response.capacity(), 116);
        assert!(io.command.end_addr < io.response.head_addr);
        assert_eq!(io.doorbells.irq_in_set, 0x000);
        assert_eq!(io.doorbells.irq_out_clr, 0x00C);
        assert_eq!(io.window_size(), HFRP_MAILBOX_WINDOW_SIZE);
    }

    #[test]
    fn test_one_mailbox_layout_at_index() {
        let io = MailboxIoInfo::new(2, 2).unwrap();
        assert_eq!(io.command.head_addr, 0x510);
        assert_eq!(io.doorbells.irq_out_set, 0x404);
        assert_eq!(io.window_size(), 3 * HFRP_MAILBOX_WINDOW_SIZE);
    }

    #[test]
    fn test_two_mailbox_layout() {
        let io = MailboxIoInfo::new(0, 1).unwrap();
        assert_eq!(io.command.capacity(), HFRP_MAX_RING_CAPACITY);
        assert_eq!(io.response.capacity(), HFRP_MAX_RING_CAPACITY);
        assert_eq!(io.command.start_addr, 0x100);
        assert_eq!(io.response.start_addr, 0x300);
        assert_eq!(io.doorbells.irq_in_set, 0x000);
        assert_eq!(io.doorbells.irq_out_set, 0x204);
        assert_eq!(io.doorbells.irq_out_clr, 0x20C);
        assert_eq!(io.window_size(), 2 * HFRP_MAILBOX_WINDOW_SIZE);
    }

    #[test]
    fn test_ring_capacity_fits_byte_pointers() {
        for (cmd, rsp) in [(0, 0), (0, 1), (3, 1), (7, 7)] {
            let io = MailboxIoInfo::new(cmd, rsp).unwrap();
            assert!(io.command.capacity() <= HFRP_MAX_RING_CAPACITY);
            assert!(io.response.capacity() <= HFRP_MAX_RING_CAPACITY);
        }
    }

    #[test]
    fn test_mailbox_index_bounds() {
        let io = MailboxIoInfo::new(HFRP_MAX_MAILBOX_INDEX, HFRP_MAX_MAILBOX_INDEX).unwrap();
        assert_eq!(io.window_size(), (HFRP_MAX_MAILBOX_INDEX + 1) * HFRP_MAILBOX_WINDOW_SIZE);
        assert_eq!(MailboxIoInfo::new(HFRP_MAX_MAILBOX_INDEX + 1, 0), None);
        assert_eq!(MailboxIoInfo::new(0, 0x7F_FFFF), None);
        // Would wrap the window base to zero and alias the rings.
        assert_eq!(MailboxIoInfo::new(0x80_0000, 0), None);
        assert_eq!(MailboxIoInfo::new(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_ring_for_addr() {
        let io = MailboxIoInfo::new(0, 1).unwrap();
        assert_eq!(io.ring_for_addr(0x100), Some(&io.command));
        assert_eq!(io.ring_for_addr(0x1FF), Some(&io.command));
        assert_eq!(io.ring_for_addr(0x300), Some(&io.response));
        assert_eq!(io.ring_for_addr(0x010), None);
        assert_eq!(io.ring(MailboxRing::Response), &io.response);
    }

    #[test]
    fn test_offset_translation_wraps() {
        let io = MailboxIoInfo::new(0, 0).unwrap();
        let ring = io.command;
        assert_eq!(ring.offset_to_addr(0), ring.start_addr);
        assert_eq!(ring.offset_to_addr(ring.capacity()), ring.start_addr);
        assert_eq!(ring.addr_to_offset(ring.end_addr), ring.capacity() - 1);
    }
}
