// Licensed under the Apache-2.0 license

//! Firmware end of the HFRP mailbox, for driving the host engine in tests
//! and in the emulator binary.

use crate::hfrp_mbox::HfrpMailboxWindow;
use hfrp_common::commands::{
    CommandIndex, FwVersionResp, HFRP_RSP_STATUS_INVALID_PARAM, HFRP_RSP_STATUS_SUCCESS,
    HFRP_RSP_STATUS_UNSUPPORTED,
};
use hfrp_common::{
    HfrpHeader, MailboxAperture, MailboxIoInfo, MailboxRing, Ring,
    HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID, HFRP_DOORBELL_BIT, HFRP_MAX_PAYLOAD_SIZE,
};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use zerocopy::IntoBytes;

/// Produces the response for one command.
pub trait CommandHandler: Send {
    /// Returns the response status and payload for `command_index`.
    fn handle(&mut self, command_index: u16, payload: &[u8]) -> (u16, Vec<u8>);
}

pub struct DefaultCommandHandler {
    version: FwVersionResp,
    served: u32,
}

impl Default for DefaultCommandHandler {
    fn default() -> Self {
        Self::new(FwVersionResp {
            major: 1,
            minor: 0,
            build: 0,
        })
    }
}

impl DefaultCommandHandler {
    pub fn new(version: FwVersionResp) -> Self {
        Self { version, served: 0 }
    }
}

impl CommandHandler for DefaultCommandHandler {
    fn handle(&mut self, command_index: u16, payload: &[u8]) -> (u16, Vec<u8>) {
        self.served = self.served.wrapping_add(1);
        match CommandIndex(command_index) {
            CommandIndex::ECHO => (HFRP_RSP_STATUS_SUCCESS, payload.to_vec()),
            CommandIndex::GET_FW_VERSION if payload.is_empty() => {
                (HFRP_RSP_STATUS_SUCCESS, self.version.as_bytes().to_vec())
            }
            CommandIndex::GET_FW_VERSION => (HFRP_RSP_STATUS_INVALID_PARAM, Vec::new()),
            CommandIndex::GET_COMMAND_COUNT => {
                (HFRP_RSP_STATUS_SUCCESS, self.served.to_le_bytes().to_vec())
            }
            _ => (HFRP_RSP_STATUS_UNSUPPORTED, Vec::new()),
        }
    }
}

/// Consumes the command ring and produces responses.
///
/// Responses that do not fit on the response ring are held back and
/// retried on the next [`HfrpFirmware::service`].
pub struct HfrpFirmware<H: CommandHandler = DefaultCommandHandler> {
    window: HfrpMailboxWindow,
    io: MailboxIoInfo,
    handler: H,
    pending: VecDeque<(HfrpHeader, Vec<u8>)>,
}

impl HfrpFirmware<DefaultCommandHandler> {
    pub fn with_default_handler(window: HfrpMailboxWindow) -> Self {
        Self::new(window, DefaultCommandHandler::default())
    }
}

impl<H: CommandHandler> HfrpFirmware<H> {
    pub fn new(window: HfrpMailboxWindow, handler: H) -> Self {
        let io = window.io_info();
        Self {
            window,
            io,
            handler,
            pending: VecDeque::new(),
        }
    }

    pub fn window(&self) -> &HfrpMailboxWindow {
        &self.window
    }

    /// Responses waiting for space on the response ring.
    pub fn pending_responses(&self) -> usize {
        self.pending.len()
    }

    /// Handles every queued command and flushes responses.
    ///
    /// Returns the number of commands handled.
    pub fn service(&mut self) -> usize {
        if self.window.in_doorbell_pending() {
            self.window
                .write_bit(self.io.doorbells.irq_in_clr, HFRP_DOORBELL_BIT, true);
        }

        let mut handled = 0;
        loop {
            let ring = Ring::new(&self.window, &self.io, MailboxRing::Command);
            let Ok(header) = ring.peek_header() else {
                break;
            };
            let mut buf = [0u8; HFRP_MAX_PAYLOAD_SIZE];
            let len = ring.read_payload(header, &mut buf);
            ring.consume_message(header);
            handled += 1;

            if header.payload_size() > HFRP_MAX_PAYLOAD_SIZE {
                warn!(
                    "HFRP firmware: seq {} command payload of {} bytes truncated",
                    header.sequence_id(),
                    header.payload_size()
                );
            }
            let (status, mut response) = self.handler.handle(header.command_index(), &buf[..len]);
            response.truncate(HFRP_MAX_PAYLOAD_SIZE);
            debug!(
                "HFRP firmware: seq {} command {:#x} -> status {:#x}, {} bytes",
                header.sequence_id(),
                header.command_index(),
                status,
                response.len()
            );
            self.pending.push_back((
                HfrpHeader::with_payload(header.sequence_id(), status, response.len()),
                response,
            ));
        }

        self.flush();
        handled
    }

    /// Queues a message on the response ring exactly as given.
    ///
    /// The header is not checked against the payload, so callers can send
    /// malformed or stale responses.
    pub fn inject_response(&mut self, header: HfrpHeader, payload: &[u8]) {
        self.pending.push_back((header, payload.to_vec()));
        self.flush();
    }

    pub fn send_async_notification(&mut self, code: u16, payload: &[u8]) {
        let payload = &payload[..payload.len().min(HFRP_MAX_PAYLOAD_SIZE)];
        let header =
            HfrpHeader::with_payload(HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID, code, payload.len());
        self.inject_response(header, payload);
    }

    /// Drops held responses and any unread commands.
    pub fn reset(&mut self) {
        info!(
            "HFRP firmware reset, dropping {} held responses",
            self.pending.len()
        );
        self.pending.clear();
        let ring = Ring::new(&self.window, &self.io, MailboxRing::Command);
        ring.set_tail(ring.head());
    }

    fn flush(&mut self) {
        let ring = Ring::new(&self.window, &self.io, MailboxRing::Response);
        let mut queued = 0;
        while let Some((header, payload)) = self.pending.front() {
            if ring.queue_message(*header, payload).is_err() {
                debug!(
                    "HFRP firmware: response ring full, holding {} responses",
                    self.pending.len()
                );
                break;
            }
            self.pending.pop_front();
            queued += 1;
        }
        if queued > 0 {
            self.window
                .write_bit(self.io.doorbells.irq_out_set, HFRP_DOORBELL_BIT, true);
        }
    }
}

/// Runs an [`HfrpFirmware`] on a background thread until stopped.
pub struct HfrpFirmwareThread<H: CommandHandler + 'static = DefaultCommandHandler> {
    firmware: Arc<Mutex<HfrpFirmware<H>>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<H: CommandHandler + 'static> HfrpFirmwareThread<H> {
    pub fn start(firmware: HfrpFirmware<H>, poll_interval: Duration) -> Self {
        let firmware = Arc::new(Mutex::new(firmware));
        let running = Arc::new(AtomicBool::new(true));
        let handle = {
            let firmware = firmware.clone();
            let running = running.clone();
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    {
                        let mut fw = firmware.lock().unwrap_or_else(PoisonError::into_inner);
                        if fw.window().in_doorbell_pending() || fw.pending_responses() > 0 {
                            fw.service();
                        }
                    }
                    thread::sleep(poll_interval);
                }
            })
        };
        Self {
            firmware,
            running,
            handle: Some(handle),
        }
    }

    /// Runs `f` against the firmware between service passes.
    pub fn with_firmware<R>(&self, f: impl FnOnce(&mut HfrpFirmware<H>) -> R) -> R {
        let mut fw = self.firmware.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut fw)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("HFRP firmware thread panicked");
            }
        }
    }
}

impl<H: CommandHandler + 'static> Drop for HfrpFirmwareThread<H> {
    fn drop(&mut self) {
        self.stop();
    }
}
