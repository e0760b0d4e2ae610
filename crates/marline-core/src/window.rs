//! Sequence-keyed sliding window.
//!
//! A fixed-capacity associative store keyed by 16-bit sequence number. The
//! physical slot for a sequence is `sequence % capacity`, so the window
//! advances by natural overwrite as sequences climb: an entry more than
//! `capacity` behind the incoming sequence is expired and its slot is
//! available again. An entry exactly `capacity` behind is still the live
//! occupant of a full window and blocks the slot. All operations are O(1)
//! and allocation-free past construction.

extern crate alloc;
use alloc::vec::Vec;

use crate::error::WindowError;

#[derive(Debug, Clone)]
struct Slot<T> {
    sequence: u16,
    value: T,
}

/// Fixed-capacity store of at most `capacity` entries keyed by sequence.
///
/// An entry exists for `sequence` iff its slot is occupied and the stored
/// key equals `sequence`; anything else the slot may hold is a stale entry
/// from an earlier window position.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    slots: Vec<Option<Slot<T>>>,
}

impl<T> SlidingWindow<T> {
    /// Create a window with `capacity` slots.
    ///
    /// `capacity` must be in `1..=65536`, the 16-bit sequence space.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be non-zero");
        assert!(capacity <= 65536, "window capacity exceeds sequence space");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn index(&self, sequence: u16) -> usize {
        sequence as usize % self.slots.len()
    }

    /// True iff the slot for `sequence` is empty or held by an expired
    /// entry, more than `capacity` behind under modular distance.
    ///
    /// A slot holding `sequence` itself reports unavailable; [`insert`]
    /// still accepts that case as an idempotent replacement.
    ///
    /// [`insert`]: Self::insert
    pub fn has_slot_available(&self, sequence: u16) -> bool {
        match &self.slots[self.index(sequence)] {
            None => true,
            Some(slot) => sequence.wrapping_sub(slot.sequence) as usize > self.slots.len(),
        }
    }

    /// Store `value` at `sequence`, refusing to displace a different entry
    /// that is still within the window.
    ///
    /// Re-inserting the sequence a slot already holds silently replaces the
    /// value, so duplicate arrivals are idempotent.
    pub fn insert(&mut self, sequence: u16, value: T) -> Result<(), WindowError> {
        let index = self.index(sequence);
        if let Some(slot) = &self.slots[index] {
            let expired = sequence.wrapping_sub(slot.sequence) as usize > self.slots.len();
            if slot.sequence != sequence && !expired {
                return Err(WindowError::SlotOccupied {
                    sequence,
                    occupied_by: slot.sequence,
                });
            }
        }
        self.slots[index] = Some(Slot { sequence, value });
        Ok(())
    }

    /// Store `value` at `sequence` unconditionally, displacing whatever the
    /// slot holds, and return a handle to the stored value.
    ///
    /// This is the sent-packet tracker's insert: the displaced entry is by
    /// construction outside the ack-acceptance window.
    pub fn insert_fast(&mut self, sequence: u16, value: T) -> &mut T {
        let index = self.index(sequence);
        self.slots[index] = Some(Slot { sequence, value });
        &mut self.slots[index]
            .as_mut()
            .expect("slot was just written")
            .value
    }

    /// Look up the entry stored at `sequence`, if any.
    pub fn find(&self, sequence: u16) -> Option<&T> {
        match &self.slots[self.index(sequence)] {
            Some(slot) if slot.sequence == sequence => Some(&slot.value),
            _ => None,
        }
    }

    /// Mutable variant of [`find`](Self::find).
    pub fn find_mut(&mut self, sequence: u16) -> Option<&mut T> {
        let index = self.index(sequence);
        match &mut self.slots[index] {
            Some(slot) if slot.sequence == sequence => Some(&mut slot.value),
            _ => None,
        }
    }

    /// Remove and return the entry stored at `sequence`, if any.
    pub fn remove(&mut self, sequence: u16) -> Option<T> {
        let index = self.index(sequence);
        match &self.slots[index] {
            Some(slot) if slot.sequence == sequence => {
                self.slots[index].take().map(|slot| slot.value)
            }
            _ => None,
        }
    }

    /// Drop every entry, keeping capacity.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}
