use std::ptr;
use std::sync::atomic::AtomicPtr;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed, Release};

use super::layout::{Cursors, INITIAL_READ_INDEX, INITIAL_WRITE_INDEX};
use super::Buffer::{consumed_ptr, is_consumed, RingBuffer, SlotState};
use crate::Bundler::Structs::Buffer_Structs::Message;

impl RingBuffer {
    /// Create an empty ring with `capacity` slots.
    ///
    /// # Panics
    /// Panics if `capacity` is not a power of two or is smaller than 2.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity >= 2 && capacity.is_power_of_two(),
            "capacity must be a power of two >= 2"
        );

        let slots: Vec<AtomicPtr<Message>> = (0..capacity)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();

        Self {
            slots: slots.into_boxed_slice(),
            cursors: Cursors::new(),
            capacity,
            mask: capacity - 1,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wraps `idx` into `0..capacity`.
    #[inline]
    pub fn index(&self, idx: usize) -> usize {
        idx & self.mask
    }

    /// The slot after `idx`, wrapping at the end of the ring.
    #[inline]
    pub fn increment(&self, idx: usize) -> usize {
        self.index(idx + 1)
    }

    #[inline]
    pub fn read_index(&self) -> usize {
        self.cursors.read_index.load(Acquire)
    }

    /// Slot the next claim will get.
    #[inline]
    pub fn write_index(&self) -> usize {
        self.index(self.cursors.write_index.load(Acquire))
    }

    /// Number of slots between the cursors, i.e. claimed but not yet
    /// reclaimed. Diagnostic only: the two loads are not atomic together.
    pub fn size(&self) -> usize {
        self.size_between(self.read_index(), self.write_index())
    }

    #[inline]
    pub(crate) fn size_between(&self, ri: usize, wi: usize) -> usize {
        if ri < wi {
            wi - ri - 1
        } else {
            self.capacity - ri - 1 + wi
        }
    }

    /// Claim the next free slot for writing.
    ///
    /// Returns the claimed slot index, or `None` if the ring is full. Never
    /// blocks: a lost CAS race simply retries against the new write cursor.
    ///
    /// The shared write cursor is an unmasked counter, so the CAS only
    /// succeeds if no slot was claimed since it was loaded. Together with
    /// loading the read cursor after it, the fullness check can only be
    /// conservative: the read cursor never moves backwards between the two.
    pub fn claim_write_slot(&self) -> Option<usize> {
        let write_index = &self.cursors.write_index;

        loop {
            let wi = write_index.load(Acquire);
            let current_read_index = self.read_index();
            if self.index(wi.wrapping_add(1)) == current_read_index {
                return None;
            }
            if write_index
                .compare_exchange_weak(wi, wi.wrapping_add(1), AcqRel, Relaxed)
                .is_ok()
            {
                return Some(self.index(wi));
            }
            // contention, retry
            std::hint::spin_loop();
        }
    }

    /// Store an owned message into a slot previously returned by
    /// `claim_write_slot`.
    ///
    /// Only an `Empty` slot is written. If the slot is still taken (a claim
    /// that raced with `reset`), the message is handed back untouched.
    #[inline]
    pub(crate) fn publish(&self, slot: usize, msg: Box<Message>) -> Result<(), Box<Message>> {
        let raw = Box::into_raw(msg);
        match self.slots[slot].compare_exchange(ptr::null_mut(), raw, AcqRel, Acquire) {
            Ok(_) => Ok(()),
            // SAFETY: raw came from Box::into_raw above and was never stored
            Err(_) => Err(unsafe { Box::from_raw(raw) }),
        }
    }

    /// Raw value of a slot, with acquire ordering so an `Occupied` pointer
    /// can be dereferenced by the consumer.
    #[inline]
    pub(crate) fn load_slot(&self, slot: usize) -> *mut Message {
        self.slots[slot].load(Acquire)
    }

    /// Takes the message out of an `Occupied` slot and marks it `Consumed`.
    ///
    /// Consumer only. Returns `None` if the slot is not occupied.
    pub(crate) fn retire(&self, slot: usize) -> Option<Box<Message>> {
        let raw = self.slots[slot].load(Acquire);
        if raw.is_null() || is_consumed(raw) {
            return None;
        }
        self.slots[slot].store(consumed_ptr(), Release);
        // SAFETY: non-null, non-sentinel slot values are pointers produced by
        // Box::into_raw in publish(). Only the single consumer ever replaces
        // them, so ownership is transferred exactly once.
        Some(unsafe { Box::from_raw(raw) })
    }

    pub fn slot_state(&self, slot: usize) -> SlotState {
        let raw = self.slots[self.index(slot)].load(Acquire);
        if raw.is_null() {
            SlotState::Empty
        } else if is_consumed(raw) {
            SlotState::Consumed
        } else {
            SlotState::Occupied
        }
    }

    /// Reclaim the contiguous run of `Consumed` slots that follows `ri`.
    ///
    /// Consumer only. `ri` is the consumer's private read cursor; the new
    /// value is returned. Scanning stops at the first slot that is not
    /// `Consumed` or at `write_index_snapshot`. If anything was reclaimed,
    /// the new cursor is published to producers with one release store,
    /// after all the cleared slots.
    pub(crate) fn advance_read_index(&self, ri: usize, write_index_snapshot: usize) -> usize {
        let mut new_ri = ri;
        let mut i = self.increment(ri);
        while i != write_index_snapshot {
            if !is_consumed(self.slots[i].load(Acquire)) {
                break;
            }
            self.slots[i].store(ptr::null_mut(), Relaxed);
            new_ri = i;
            i = self.increment(i);
        }
        if new_ri != ri {
            // publish so writers see the reclaimed slots
            self.cursors.read_index.store(new_ri, Release);
        }
        new_ri
    }

    /// Put both cursors back to their initial offsets and drop every
    /// resident message. Returns how many messages were discarded.
    ///
    /// Must not race with producers or the consumer.
    pub(crate) fn reset(&self) -> usize {
        let discarded = self.clear_slots();
        self.cursors.read_index.store(INITIAL_READ_INDEX, Release);
        self.cursors.write_index.store(INITIAL_WRITE_INDEX, Release);
        discarded
    }

    /// Empties every slot, freeing messages still owned by the ring.
    /// Returns how many messages were discarded.
    pub(crate) fn clear_slots(&self) -> usize {
        let mut discarded = 0;
        for slot in self.slots.iter() {
            let raw = slot.swap(ptr::null_mut(), AcqRel);
            if !raw.is_null() && !is_consumed(raw) {
                // SAFETY: see retire(); the slot no longer references it.
                drop(unsafe { Box::from_raw(raw) });
                discarded += 1;
            }
        }
        discarded
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        self.clear_slots();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bundler::Structs::Address;

    fn msg(n: u8) -> Box<Message> {
        Box::new(Message::new(Some(Address(1)), vec![n]))
    }

    #[test]
    fn fresh_ring_starts_at_initial_offsets() {
        let rb = RingBuffer::new(8);
        assert_eq!(rb.read_index(), 0);
        assert_eq!(rb.write_index(), 1);
        assert_eq!(rb.size(), 0);
    }

    #[test]
    fn claims_until_full_without_blocking() {
        let rb = RingBuffer::new(8);

        // two slots are never claimable: the gap and the read cursor slot
        for expected in 1..7 {
            assert_eq!(rb.claim_write_slot(), Some(expected));
        }
        assert_eq!(rb.claim_write_slot(), None);
        assert_eq!(rb.size(), 6);
    }

    #[test]
    fn advance_only_over_contiguous_consumed_prefix() {
        let rb = RingBuffer::new(8);
        for n in 0..4 {
            let slot = rb.claim_write_slot().unwrap();
            rb.publish(slot, msg(n)).unwrap();
        }
        // slots 1..=4 occupied; consume 1, 2 and 4 but not 3
        assert!(rb.retire(1).is_some());
        assert!(rb.retire(2).is_some());
        assert!(rb.retire(4).is_some());

        let ri = rb.advance_read_index(0, rb.write_index());
        assert_eq!(ri, 2);
        assert_eq!(rb.read_index(), 2);
        assert_eq!(rb.slot_state(1), SlotState::Empty);
        assert_eq!(rb.slot_state(2), SlotState::Empty);
        assert_eq!(rb.slot_state(3), SlotState::Occupied);
        assert_eq!(rb.slot_state(4), SlotState::Consumed);

        assert!(rb.retire(3).is_some());
        let ri = rb.advance_read_index(ri, rb.write_index());
        assert_eq!(ri, 4);
        assert_eq!(rb.size(), 0);
    }

    #[test]
    fn nothing_to_advance_leaves_cursor_unpublished() {
        let rb = RingBuffer::new(8);
        let slot = rb.claim_write_slot().unwrap();
        rb.publish(slot, msg(0)).unwrap();

        assert_eq!(rb.advance_read_index(0, rb.write_index()), 0);
        assert_eq!(rb.read_index(), 0);
    }

    #[test]
    fn retire_ignores_empty_and_consumed_slots() {
        let rb = RingBuffer::new(4);
        assert!(rb.retire(1).is_none());
        let slot = rb.claim_write_slot().unwrap();
        rb.publish(slot, msg(9)).unwrap();
        let taken = rb.retire(slot).unwrap();
        assert_eq!(taken.payload()[..], [9]);
        assert!(rb.retire(slot).is_none());
        assert_eq!(rb.slot_state(slot), SlotState::Consumed);
    }

    #[test]
    fn wraps_around_many_laps() {
        let rb = RingBuffer::new(4);
        let mut ri = 0;
        for n in 0..40u8 {
            let slot = rb.claim_write_slot().expect("ring should have room");
            rb.publish(slot, msg(n)).unwrap();
            assert_eq!(rb.retire(slot).unwrap().payload()[..], [n]);
            ri = rb.advance_read_index(ri, rb.write_index());
            assert_eq!(rb.size(), 0);
        }
    }

    #[test]
    fn write_counter_keeps_growing_across_laps() {
        let rb = RingBuffer::new(4);
        let mut ri = 0;
        for n in 0..40u8 {
            let slot = rb.claim_write_slot().unwrap();
            rb.publish(slot, msg(n)).unwrap();
            rb.retire(slot);
            ri = rb.advance_read_index(ri, rb.write_index());
        }
        assert_eq!(rb.cursors.write_index.load(Acquire), 41);
        assert_eq!(rb.write_index(), 41 & 3);
    }

    #[test]
    fn claim_against_counter_from_an_earlier_lap_fails() {
        let rb = RingBuffer::new(4);
        let stale = rb.cursors.write_index.load(Acquire);
        // one full lap later the masked cursor is back where it was
        let mut ri = 0;
        for n in 0..4u8 {
            let slot = rb.claim_write_slot().unwrap();
            rb.publish(slot, msg(n)).unwrap();
            rb.retire(slot);
            ri = rb.advance_read_index(ri, rb.write_index());
        }
        assert_eq!(rb.index(stale), rb.write_index());
        assert!(rb
            .cursors
            .write_index
            .compare_exchange(stale, stale + 1, AcqRel, Relaxed)
            .is_err());
    }

    #[test]
    fn publish_into_taken_slot_hands_message_back() {
        let rb = RingBuffer::new(8);
        let slot = rb.claim_write_slot().unwrap();
        rb.publish(slot, msg(1)).unwrap();

        let rejected = rb.publish(slot, msg(2)).unwrap_err();
        assert_eq!(rejected.payload()[..], [2]);
        assert_eq!(rb.retire(slot).unwrap().payload()[..], [1]);

        // consumed but not yet reclaimed is taken too
        assert!(rb.publish(slot, msg(3)).is_err());
    }

    #[test]
    fn reset_restores_offsets_and_discards_messages() {
        let rb = RingBuffer::new(8);
        for n in 0..3 {
            let slot = rb.claim_write_slot().unwrap();
            rb.publish(slot, msg(n)).unwrap();
        }
        rb.retire(1);

        assert_eq!(rb.reset(), 2);
        assert_eq!((rb.read_index(), rb.write_index()), (0, 1));
        for i in 0..8 {
            assert_eq!(rb.slot_state(i), SlotState::Empty);
        }
        // idempotent on an empty ring
        assert_eq!(rb.reset(), 0);
        assert_eq!((rb.read_index(), rb.write_index()), (0, 1));
    }

    #[test]
    fn sentinel_is_distinct_from_equal_content() {
        let lookalike = Box::new(Message::new(None, bytes::Bytes::new()));
        let raw = Box::into_raw(lookalike);
        assert!(!is_consumed(raw));
        assert!(is_consumed(consumed_ptr()));
        drop(unsafe { Box::from_raw(raw) });
    }
}
