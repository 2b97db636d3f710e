// Licensed under the Apache-2.0 license

use caliptra_emu_bus::{Bus, Ram, ReadWriteRegister};
use caliptra_emu_types::{RvAddr, RvData, RvSize};
use hfrp_common::aperture::{merge_bit, merge_byte};
use hfrp_common::{DoorbellIrq, MailboxAperture, MailboxIoInfo};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

/// Simulated HFRP mailbox MMIO window.
///
/// Ring memory is plain RAM. The four doorbell addresses are decoded as
/// registers: a write of 1 to a set register raises the doorbell, a write
/// of 1 to a clear register drops it, and reading a set register returns
/// the doorbell state. Clones share the same window.
#[derive(Clone)]
pub struct HfrpMailboxWindow {
    regs: Arc<Mutex<HfrpMailboxWindowImpl>>,
}

impl HfrpMailboxWindow {
    pub fn new(io: MailboxIoInfo) -> Self {
        Self {
            regs: Arc::new(Mutex::new(HfrpMailboxWindowImpl::new(io))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HfrpMailboxWindowImpl> {
        self.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn io_info(&self) -> MailboxIoInfo {
        self.lock().io
    }

    /// Host -> firmware doorbell state.
    pub fn in_doorbell_pending(&self) -> bool {
        self.lock().irq_in.reg.is_set(DoorbellIrq::RING)
    }

    /// Firmware -> host doorbell state.
    pub fn out_doorbell_pending(&self) -> bool {
        self.lock().irq_out.reg.is_set(DoorbellIrq::RING)
    }
}

impl MailboxAperture for HfrpMailboxWindow {
    fn read_word(&self, addr: u32) -> u32 {
        self.lock().read_word(addr)
    }

    fn write_word(&self, addr: u32, val: u32) {
        self.lock().write_word(addr, val)
    }

    // Head and tail of a ring share a word and are written by different
    // sides, so the read-modify-write happens under one lock.
    fn write_byte(&self, addr: u32, val: u8) {
        let mut regs = self.lock();
        let word = regs.read_word(addr & !3);
        regs.write_word(addr & !3, merge_byte(word, addr, val));
    }

    fn write_bit(&self, addr: u32, bit: u32, val: bool) {
        let mut regs = self.lock();
        let word = regs.read_word(addr & !3);
        regs.write_word(addr & !3, merge_bit(word, bit, val));
    }
}

struct HfrpMailboxWindowImpl {
    io: MailboxIoInfo,

    /// Ring memory and pointers
    ram: Ram,

    /// Host -> firmware doorbell
    irq_in: ReadWriteRegister<u32, DoorbellIrq::Register>,

    /// Firmware -> host doorbell
    irq_out: ReadWriteRegister<u32, DoorbellIrq::Register>,
}

impl HfrpMailboxWindowImpl {
    fn new(io: MailboxIoInfo) -> Self {
        Self {
            io,
            ram: Ram::new(vec![0u8; io.window_size() as usize]),
            irq_in: ReadWriteRegister::new(0),
            irq_out: ReadWriteRegister::new(0),
        }
    }

    fn read_word(&mut self, addr: u32) -> RvData {
        let addr = addr & !3;
        let doorbells = self.io.doorbells;
        if addr == doorbells.irq_in_set {
            self.irq_in.reg.get()
        } else if addr == doorbells.irq_out_set {
            self.irq_out.reg.get()
        } else if addr == doorbells.irq_in_clr || addr == doorbells.irq_out_clr {
            0
        } else {
            self.ram
                .read(RvSize::Word, addr as RvAddr)
                .unwrap_or_else(|e| panic!("Failed to read HFRP window at {addr:#x}: {e:?}"))
        }
    }

    fn write_word(&mut self, addr: u32, val: RvData) {
        let addr = addr & !3;
        let doorbells = self.io.doorbells;
        let ring = val & DoorbellIrq::RING::SET.value != 0;
        if addr == doorbells.irq_in_set {
            if ring {
                self.irq_in.reg.modify(DoorbellIrq::RING::SET);
            }
        } else if addr == doorbells.irq_out_set {
            if ring {
                self.irq_out.reg.modify(DoorbellIrq::RING::SET);
            }
        } else if addr == doorbells.irq_in_clr {
            if ring {
                self.irq_in.reg.set(0);
            }
        } else if addr == doorbells.irq_out_clr {
            if ring {
                self.irq_out.reg.set(0);
            }
        } else if let Err(e) = self.ram.write(RvSize::Word, addr as RvAddr, val) {
            panic!("Failed to write HFRP window at {addr:#x}: {e:?}");
        }
    }
}
