// Licensed under the Apache-2.0 license

//! Host side of the HFRP mailbox.
//!
//! [`HfrpMailbox`] queues commands on the command ring, drains the response
//! ring when firmware rings the outbound doorbell, and matches each response
//! to its caller through the sequence-ID table. A single lock serializes
//! every table and ring pointer update; blocking callers never sleep while
//! holding it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arrayvec::ArrayVec;
use hfrp_common::{
    HfrpHeader, MailboxAperture, MailboxIoInfo, MailboxRing, Ring,
    HFRP_DOORBELL_BIT, HFRP_MAX_INDEX_OR_STATUS, HFRP_MAX_PAYLOAD_SIZE,
};
use log::{debug, error, info, trace, warn};
use poll_common::poll_until;

use crate::config::HfrpConfig;
use crate::error::{HfrpError, HfrpResult};
use crate::seq_id::{Completion, PendingResponse, ResponseSlot, SequenceIdTable};

/// Receives messages firmware sends on the reserved notification ID.
pub trait AsyncNotificationHandler: Send + Sync {
    /// Called without the mailbox lock held, so it may post commands.
    fn notification_received(&self, header: HfrpHeader, payload: &[u8]);
}

/// A message taken off a ring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub header: HfrpHeader,
    /// Empty unless `status` is `Ok`.
    pub payload: ArrayVec<u8, HFRP_MAX_PAYLOAD_SIZE>,
    /// Payload size violations. The message is consumed either way.
    pub status: HfrpResult<()>,
}

/// Successful result of [`HfrpMailbox::post_command_blocking`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandResponse {
    pub response_status: u16,
    pub payload: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransactionState {
    Allocated,
    Queued,
    DoorbellRaised,
    AwaitingResponse,
    Completed,
    Abandoned,
}

fn trace_transaction(sequence_id: u16, state: TransactionState) {
    trace!("HFRP seq {}: {:?}", sequence_id, state);
}

struct MailboxState {
    sequence_ids: SequenceIdTable,
}

pub struct HfrpMailbox<A: MailboxAperture> {
    aperture: A,
    io: MailboxIoInfo,
    config: HfrpConfig,
    state: Mutex<MailboxState>,
    async_handler: Mutex<Option<Arc<dyn AsyncNotificationHandler>>>,
}

impl<A: MailboxAperture> fmt::Debug for HfrpMailbox<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HfrpMailbox")
            .field("io", &self.io)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<A: MailboxAperture> HfrpMailbox<A> {
    /// Fails when the configured mailbox indices do not select a layout.
    pub fn new(aperture: A, config: HfrpConfig) -> HfrpResult<Self> {
        let io = config.io_info()?;
        debug!(
            "HFRP mailbox: command ring {:#x}..={:#x}, response ring {:#x}..={:#x}",
            io.command.start_addr, io.command.end_addr, io.response.start_addr, io.response.end_addr
        );
        Ok(Self {
            aperture,
            io,
            config,
            state: Mutex::new(MailboxState {
                sequence_ids: SequenceIdTable::new(),
            }),
            async_handler: Mutex::new(None),
        })
    }

    pub fn io_info(&self) -> &MailboxIoInfo {
        &self.io
    }

    pub fn config(&self) -> &HfrpConfig {
        &self.config
    }

    pub fn aperture(&self) -> &A {
        &self.aperture
    }

    fn lock_state(&self) -> MutexGuard<'_, MailboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ring(&self, ring: MailboxRing) -> Ring<'_, A> {
        Ring::new(&self.aperture, &self.io, ring)
    }

    pub fn set_async_notification_handler(&self, handler: Option<Arc<dyn AsyncNotificationHandler>>) {
        *self
            .async_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handler;
    }

    /// Number of commands still waiting for a response.
    pub fn outstanding_requests(&self) -> usize {
        self.lock_state().sequence_ids.outstanding()
    }

    /// Places a message on `ring` and publishes it by moving head.
    pub fn queue_message(
        &self,
        ring: MailboxRing,
        header: HfrpHeader,
        payload: &[u8],
    ) -> HfrpResult<()> {
        let _state = self.lock_state();
        self.queue_locked(ring, header, payload)
    }

    fn queue_locked(&self, ring: MailboxRing, header: HfrpHeader, payload: &[u8]) -> HfrpResult<()> {
        self.ring(ring).queue_message(header, payload).map_err(|err| {
            debug!(
                "HFRP {:?} ring full, cannot queue {} bytes",
                ring,
                header.wire_size()
            );
            HfrpError::from(err)
        })
    }

    /// Takes the next message off `ring`.
    ///
    /// Fails only with `RingEmpty`. Size violations are reported in
    /// [`InboundMessage::status`] and still consume the message.
    pub fn dequeue_message(&self, ring: MailboxRing) -> HfrpResult<InboundMessage> {
        let state = self.lock_state();
        self.dequeue_locked(&state, ring)
    }

    fn dequeue_locked(&self, state: &MailboxState, ring: MailboxRing) -> HfrpResult<InboundMessage> {
        let ring = self.ring(ring);
        let header = ring.peek_header()?;
        let size = header.payload_size();

        let capacity = if header.is_async_notification() {
            None
        } else {
            state
                .sequence_ids
                .get(header.sequence_id())
                .map(|pending| pending.capacity)
        };

        let status = if size > HFRP_MAX_PAYLOAD_SIZE {
            error!(
                "HFRP seq {}: firmware sent {} byte payload, limit is {}",
                header.sequence_id(),
                size,
                HFRP_MAX_PAYLOAD_SIZE
            );
            Err(HfrpError::InsufficientResources { size })
        } else {
            match capacity {
                Some(capacity) if size > capacity => {
                    Err(HfrpError::BufferTooSmall {
                        needed: size,
                        capacity,
                    })
                }
                _ => Ok(()),
            }
        };

        let mut payload = ArrayVec::new();
        if status.is_ok() {
            let mut buf = [0u8; HFRP_MAX_PAYLOAD_SIZE];
            let len = ring.read_payload(header, &mut buf);
            payload
                .try_extend_from_slice(&buf[..len])
                .map_err(|_| HfrpError::InsufficientResources { size })?;
        }
        ring.consume_message(header);

        debug!(
            "HFRP dequeued seq {} status {:#x}, {} payload bytes",
            header.sequence_id(),
            header.index_or_status(),
            size
        );
        Ok(InboundMessage {
            header,
            payload,
            status,
        })
    }

    /// Drains the response ring, completing every caller whose response is
    /// found. Returns the number of messages taken off the ring.
    pub fn process_response(&self) -> usize {
        let mut drained = 0;
        let mut notifications = Vec::new();
        {
            let mut state = self.lock_state();
            loop {
                let message = match self.dequeue_locked(&state, MailboxRing::Response) {
                    Ok(message) => message,
                    Err(HfrpError::RingEmpty) => break,
                    Err(err) => {
                        error!("HFRP response ring: {}", err);
                        break;
                    }
                };
                drained += 1;

                let sequence_id = message.header.sequence_id();
                if message.header.is_async_notification() {
                    notifications.push(message);
                    continue;
                }
                if state.sequence_ids.is_free(sequence_id) {
                    warn!("HFRP dropping stale response for seq {}", sequence_id);
                    continue;
                }
                let Some(pending) = state.sequence_ids.free(sequence_id) else {
                    continue;
                };
                let payload = if message.status.is_ok() {
                    message.payload.to_vec()
                } else {
                    Vec::new()
                };
                pending.slot.complete(Completion {
                    status: message.status,
                    response_status: message.header.response_status(),
                    payload,
                });
                trace_transaction(sequence_id, TransactionState::Completed);
            }
        }

        if !notifications.is_empty() {
            self.deliver_notifications(notifications);
        }
        drained
    }

    fn deliver_notifications(&self, notifications: Vec<InboundMessage>) {
        let handler = self
            .async_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for message in notifications {
            match &handler {
                Some(handler) => handler.notification_received(message.header, &message.payload),
                None => warn!(
                    "HFRP async notification {:#x} with {} bytes dropped, no handler",
                    message.header.index_or_status(),
                    message.payload.len()
                ),
            }
        }
    }

    /// Doorbell handler: drain, acknowledge the doorbell, drain again to pick
    /// up anything firmware queued before the acknowledge landed.
    pub fn service_event(&self) {
        self.process_response();
        self.aperture
            .write_bit(self.io.doorbells.irq_out_clr, HFRP_DOORBELL_BIT, true);
        self.process_response();
    }

    fn out_doorbell_set(&self) -> bool {
        self.aperture
            .read_bit(self.io.doorbells.irq_out_set, HFRP_DOORBELL_BIT)
    }

    /// Sends a command and waits for its response.
    ///
    /// `response_capacity` is the largest response payload the caller will
    /// accept; a longer response fails with `BufferTooSmall`. Only the low
    /// 10 bits of `command_index` are sent.
    pub fn post_command_blocking(
        &self,
        command_index: u16,
        payload: &[u8],
        response_capacity: usize,
    ) -> HfrpResult<CommandResponse> {
        if !self.config.enabled {
            return Err(HfrpError::FeatureNotEnabled);
        }
        if payload.len() > HFRP_MAX_PAYLOAD_SIZE {
            return Err(HfrpError::InsufficientResources {
                size: payload.len(),
            });
        }

        let slot = Arc::new(ResponseSlot::new());
        let sequence_id = {
            let mut state = self.lock_state();
            let sequence_id = state.sequence_ids.allocate(PendingResponse {
                capacity: response_capacity,
                slot: slot.clone(),
            })?;
            trace_transaction(sequence_id, TransactionState::Allocated);

            let header = HfrpHeader::with_payload(
                sequence_id,
                command_index & HFRP_MAX_INDEX_OR_STATUS,
                payload.len(),
            );
            if let Err(err) = self.queue_locked(MailboxRing::Command, header, payload) {
                state.sequence_ids.free(sequence_id);
                return Err(err);
            }
            trace_transaction(sequence_id, TransactionState::Queued);

            self.aperture
                .write_bit(self.io.doorbells.irq_in_set, HFRP_DOORBELL_BIT, true);
            trace_transaction(sequence_id, TransactionState::DoorbellRaised);
            sequence_id
        };

        self.wait_for_response(sequence_id, &slot)
    }

    fn wait_for_response(
        &self,
        sequence_id: u16,
        slot: &Arc<ResponseSlot>,
    ) -> HfrpResult<CommandResponse> {
        trace_transaction(sequence_id, TransactionState::AwaitingResponse);
        loop {
            if let Some(completion) = slot.get() {
                return Self::finish(completion);
            }
            let polled = poll_until(self.config.doorbell_timeout, self.config.poll_interval, || {
                Ok(slot.is_complete() || self.out_doorbell_set())
            });
            if polled.is_err() {
                return self.abandon(sequence_id, slot);
            }
            if !slot.is_complete() {
                self.service_event();
            }
        }
    }

    fn abandon(&self, sequence_id: u16, slot: &Arc<ResponseSlot>) -> HfrpResult<CommandResponse> {
        let mut state = self.lock_state();
        if let Some(completion) = slot.get() {
            return Self::finish(completion);
        }
        let still_bound = state
            .sequence_ids
            .get(sequence_id)
            .is_some_and(|pending| Arc::ptr_eq(&pending.slot, slot));
        if still_bound && self.config.free_sequence_id_on_timeout {
            state.sequence_ids.free(sequence_id);
        }
        warn!(
            "HFRP seq {}: no response within {:?}",
            sequence_id, self.config.doorbell_timeout
        );
        trace_transaction(sequence_id, TransactionState::Abandoned);
        Err(HfrpError::Timeout)
    }

    fn finish(completion: &Completion) -> HfrpResult<CommandResponse> {
        completion.status?;
        Ok(CommandResponse {
            response_status: completion.response_status,
            payload: completion.payload.clone(),
        })
    }

    /// Returns the mailbox to its power-on state.
    ///
    /// Zeroes both rings' pointers, clears both doorbells and fails every
    /// outstanding command with `InterfaceReset`.
    pub fn interface_reset(&self) {
        let mut state = self.lock_state();
        self.ring(MailboxRing::Command).reset();
        self.ring(MailboxRing::Response).reset();
        let doorbells = &self.io.doorbells;
        self.aperture
            .write_bit(doorbells.irq_in_clr, HFRP_DOORBELL_BIT, true);
        self.aperture
            .write_bit(doorbells.irq_out_clr, HFRP_DOORBELL_BIT, true);

        let outstanding = state.sequence_ids.take_all();
        info!(
            "HFRP interface reset, failing {} outstanding commands",
            outstanding.len()
        );
        for (sequence_id, pending) in outstanding {
            pending.slot.complete(Completion {
                status: Err(HfrpError::InterfaceReset),
                response_status: 0,
                payload: Vec::new(),
            });
            trace_transaction(sequence_id, TransactionState::Completed);
        }
    }
}
