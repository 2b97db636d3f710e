// Licensed under the Apache-2.0 license

//! Sequence-ID table correlating responses with outstanding commands.

use std::sync::{Arc, OnceLock};

use hfrp_common::{HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID, HFRP_SEQUENCE_ID_COUNT};

use crate::error::{HfrpError, HfrpResult};

const BITMAP_WORDS: usize = HFRP_SEQUENCE_ID_COUNT / 32;

/// Outcome of a command, written once by whoever drains its response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    pub status: HfrpResult<()>,
    pub response_status: u16,
    /// Empty unless `status` is `Ok`.
    pub payload: Vec<u8>,
}

/// Where the engine delivers a command's [`Completion`].
#[derive(Debug, Default)]
pub struct ResponseSlot(OnceLock<Completion>);

impl ResponseSlot {
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Stores the completion. Returns false if the slot was already
    /// completed, in which case the first completion is kept.
    pub fn complete(&self, completion: Completion) -> bool {
        self.0.set(completion).is_ok()
    }

    pub fn get(&self) -> Option<&Completion> {
        self.0.get()
    }

    pub fn is_complete(&self) -> bool {
        self.0.get().is_some()
    }
}

/// What the caller left behind when it posted a command.
#[derive(Clone, Debug)]
pub struct PendingResponse {
    /// Largest response payload the caller accepts.
    pub capacity: usize,
    pub slot: Arc<ResponseSlot>,
}

/// 1024-entry table of outstanding sequence IDs.
///
/// ID 1023 is reserved for firmware notifications and is never handed out.
pub struct SequenceIdTable {
    bitmap: [u32; BITMAP_WORDS],
    slots: Vec<Option<PendingResponse>>,
    cursor: usize,
}

impl Default for SequenceIdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceIdTable {
    pub fn new() -> Self {
        Self {
            bitmap: [0; BITMAP_WORDS],
            slots: vec![None; HFRP_SEQUENCE_ID_COUNT],
            cursor: 0,
        }
    }

    fn free_bits(&self, word: usize) -> u32 {
        let mut free = !self.bitmap[word];
        if word == HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID as usize / 32 {
            free &= !(1 << (HFRP_ASYNC_NOTIFICATION_SEQUENCE_ID % 32));
        }
        free
    }

    /// Binds `pending` to the lowest free ID, starting from the cursor word.
    pub fn allocate(&mut self, pending: PendingResponse) -> HfrpResult<u16> {
        for i in 0..BITMAP_WORDS {
            let word = (self.cursor + i) % BITMAP_WORDS;
            let free = self.free_bits(word);
            if free == 0 {
                continue;
            }
            let bit = free.trailing_zeros() as usize;
            self.bitmap[word] |= 1 << bit;
            self.cursor = if self.free_bits(word) == 0 {
                (word + 1) % BITMAP_WORDS
            } else {
                word
            };
            let id = word * 32 + bit;
            self.slots[id] = Some(pending);
            return Ok(id as u16);
        }
        Err(HfrpError::InUse)
    }

    /// Releases `id` and returns whatever was bound to it.
    pub fn free(&mut self, id: u16) -> Option<PendingResponse> {
        let id = id as usize;
        if id >= HFRP_SEQUENCE_ID_COUNT {
            return None;
        }
        self.bitmap[id / 32] &= !(1 << (id % 32));
        self.slots[id].take()
    }

    pub fn is_free(&self, id: u16) -> bool {
        let id = id as usize;
        id >= HFRP_SEQUENCE_ID_COUNT || self.bitmap[id / 32] & (1 << (id % 32)) == 0
    }

    pub fn get(&self, id: u16) -> Option<&PendingResponse> {
        self.slots.get(id as usize).and_then(Option::as_ref)
    }

    pub fn outstanding(&self) -> usize {
        self.bitmap.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Releases every ID, returning what was bound.
    pub fn take_all(&mut self) -> Vec<(u16, PendingResponse)> {
        self.bitmap = [0; BITMAP_WORDS];
        self.cursor = 0;
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(id, slot)| slot.take().map(|p| (id as u16, p)))
            .collect()
    }
}
