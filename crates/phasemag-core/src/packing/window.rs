use crate::error::{PhasemagError, Result};
use crate::frame::FrameMetadata;

use super::packer::PackedArray;

struct WindowSlot {
    sequence: usize,
    metadata: FrameMetadata,
    packed: PackedArray,
}

/// Fixed-capacity ring of the most recent packed frames.
///
/// Slots live in a flat arena addressed by a cursor. Inserting overwrites the
/// slot under the cursor and advances it, so once full the ring stays full and
/// the oldest entry is evicted first. Every pushed frame gets a sequence
/// number (0, 1, 2, ...) used to look it up again.
pub struct CoefficientWindow {
    slots: Vec<WindowSlot>,
    capacity: usize,
    cursor: usize,
    pushed: usize,
}

impl CoefficientWindow {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "window capacity must be non-zero");
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
            pushed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Total number of frames ever pushed.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Insert a packed frame, returning the evicted array when the ring was full.
    pub fn push(
        &mut self,
        packed: PackedArray,
        metadata: FrameMetadata,
    ) -> Result<Option<PackedArray>> {
        if let Some(first) = self.slots.first() {
            if first.packed.len() != packed.len() {
                return Err(PhasemagError::shape(
                    format!("packed array of {} coefficients", first.packed.len()),
                    format!("{} coefficients", packed.len()),
                ));
            }
        }

        let slot = WindowSlot {
            sequence: self.pushed,
            metadata,
            packed,
        };
        let evicted = if self.slots.len() < self.capacity {
            self.slots.push(slot);
            None
        } else {
            let old = std::mem::replace(&mut self.slots[self.cursor], slot);
            Some(old.packed)
        };
        self.cursor = (self.cursor + 1) % self.capacity;
        self.pushed += 1;
        Ok(evicted)
    }

    fn oldest_pos(&self) -> usize {
        if self.is_full() {
            self.cursor
        } else {
            0
        }
    }

    /// Sequence number of the oldest buffered frame.
    pub fn oldest_sequence(&self) -> Option<usize> {
        self.slots.get(self.oldest_pos()).map(|s| s.sequence)
    }

    pub fn newest(&self) -> Option<&PackedArray> {
        if self.slots.is_empty() {
            return None;
        }
        let pos = (self.cursor + self.capacity - 1) % self.capacity;
        self.slots.get(pos).map(|s| &s.packed)
    }

    pub fn oldest(&self) -> Option<&PackedArray> {
        self.slots.get(self.oldest_pos()).map(|s| &s.packed)
    }

    /// Look up a buffered frame by its sequence number.
    pub fn get(&self, sequence: usize) -> Option<(&FrameMetadata, &PackedArray)> {
        let oldest = self.oldest_sequence()?;
        if sequence < oldest || sequence >= self.pushed {
            return None;
        }
        let pos = (self.oldest_pos() + (sequence - oldest)) % self.capacity;
        let slot = &self.slots[pos];
        Some((&slot.metadata, &slot.packed))
    }

    /// Buffered frames from oldest to newest as `(sequence, packed)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &PackedArray)> + '_ {
        let start = self.oldest_pos();
        (0..self.slots.len()).map(move |i| {
            let slot = &self.slots[(start + i) % self.capacity];
            (slot.sequence, &slot.packed)
        })
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.cursor = 0;
        self.pushed = 0;
    }
}
