// Licensed under the Apache-2.0 license

//! Word-addressed access to the mailbox MMIO window.
//!
//! The device only decodes 32-bit accesses while the protocol is byte
//! oriented. Implementors provide word access; byte and bit access are
//! derived from it with read-modify-write cycles.

/// A window of mailbox registers and ring memory.
///
/// Addresses are byte offsets into the virtual mailbox space. Word accesses
/// are always made at `addr & !3`.
pub trait MailboxAperture {
    /// Reads the 32-bit word containing `addr`.
    fn read_word(&self, addr: u32) -> u32;

    /// Writes the 32-bit word containing `addr`.
    fn write_word(&self, addr: u32, val: u32);

    /// Reads a single byte.
    fn read_byte(&self, addr: u32) -> u8 {
        let word = self.read_word(addr & !3);
        (word >> byte_shift(addr)) as u8
    }

    /// Writes a single byte.
    ///
    /// The default implementation is a read-modify-write of the containing
    /// word and is not atomic with respect to another writer of the same
    /// word. Implementations that can do better should override it.
    fn write_byte(&self, addr: u32, val: u8) {
        let word = self.read_word(addr & !3);
        self.write_word(addr & !3, merge_byte(word, addr, val));
    }

    /// Reads bit `bit` of the register at `addr`.
    fn read_bit(&self, addr: u32, bit: u32) -> bool {
        self.read_word(addr & !3) & (1 << bit) != 0
    }

    /// Sets or clears bit `bit` of the register at `addr`.
    fn write_bit(&self, addr: u32, bit: u32, val: bool) {
        let word = self.read_word(addr & !3);
        self.write_word(addr & !3, merge_bit(word, bit, val));
    }
}

fn byte_shift(addr: u32) -> u32 {
    (addr % 4) * 8
}

/// Replaces the byte lane selected by `addr` in `word`.
pub fn merge_byte(word: u32, addr: u32, val: u8) -> u32 {
    let shift = byte_shift(addr);
    (word & !(0xFF << shift)) | ((val as u32) << shift)
}

/// Sets or clears `bit` in `word`.
pub fn merge_bit(word: u32, bit: u32, val: bool) -> u32 {
    if val {
        word | (1 << bit)
    } else {
        word & !(1 << bit)
    }
}
