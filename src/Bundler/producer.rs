// In src/Bundler/producer.rs

use super::lifecycle::Shared;
use crate::Bundler::Structs::Buffer_Structs::Message;
use crate::Core::BundlerError;

use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};
use tracing::warn;

/// What happened to a message handed to `send`.
///
/// Neither variant says anything about delivery: a queued message may still
/// fail to serialize or to reach the network, and the caller is never told.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// The message was written into a ring slot.
    Queued,
    /// The ring was full and the message was discarded.
    Dropped,
}

impl Shared {
    /// Enqueue a message. Lock-free and never blocks.
    ///
    /// # Returns
    /// * `Ok(SendOutcome::Queued)` if the message was written into the ring
    /// * `Ok(SendOutcome::Dropped)` if the ring was full
    /// * `Err(BundlerError::MessageTooLarge)` if the message can never fit in a frame
    pub(crate) fn send(&self, msg: Message) -> Result<SendOutcome, BundlerError> {
        let size = msg.size();
        let max_bundle_size = self.transport.max_bundle_size();

        // Check message size before touching any shared state
        if size > max_bundle_size {
            return Err(BundlerError::MessageTooLarge {
                size,
                max: max_bundle_size,
            });
        }

        self.flush.active_producers.fetch_add(1, AcqRel);

        let Some(slot) = self.ring.claim_write_slot() else {
            warn!(ring = %self.ring, dest = ?msg.dest(), size, "buffer is full, dropping message");
            self.on_overflow();
            return Ok(SendOutcome::Dropped);
        };

        match self.ring.publish(slot, Box::new(msg)) {
            Ok(()) => {
                self.unpark_if_needed(size, max_bundle_size);
                Ok(SendOutcome::Queued)
            }
            Err(msg) => {
                // only possible when a reset ran under this send
                warn!(slot, dest = ?msg.dest(), size, "claimed slot still taken, dropping message");
                self.on_overflow();
                Ok(SendOutcome::Dropped)
            }
        }
    }

    /// Flush trigger. Called once per queued message, after the slot write.
    ///
    /// Wakes the consumer if this message pushed the accumulated bytes over
    /// the bundle size (and this producer won the reset of the counter), or
    /// if no other producer is still inside `send`, in which case waiting
    /// longer would not batch anything more.
    fn unpark_if_needed(&self, size: usize, max_bundle_size: usize) {
        let accumulated = &self.flush.accumulated_bytes;
        let acc_bytes = accumulated.fetch_add(size, AcqRel) + size;
        let size_exceeded = acc_bytes >= max_bundle_size
            && accumulated
                .compare_exchange(acc_bytes, 0, AcqRel, Relaxed)
                .is_ok();
        let no_other_producers = self.leave();

        if size_exceeded || no_other_producers {
            self.waker.wake();
        }
    }

    /// A dropped message adds no bytes, but the consumer is woken regardless
    /// so it gets a chance to free capacity for the next sender.
    fn on_overflow(&self) {
        self.leave();
        self.waker.wake();
    }

    /// Decrement the producer gauge. True if this was the last producer.
    #[inline]
    fn leave(&self) -> bool {
        self.flush.active_producers.fetch_sub(1, AcqRel) == 1
    }

    pub(crate) fn active_producers(&self) -> usize {
        self.flush.active_producers.load(Acquire)
    }

    pub(crate) fn accumulated_bytes(&self) -> usize {
        self.flush.accumulated_bytes.load(Acquire)
    }
}
