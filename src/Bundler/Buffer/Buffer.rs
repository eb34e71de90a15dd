// This is the shared ring of message slots used by the bundler - N producers, one consumer

use super::layout::Cursors;
use crate::Bundler::Structs::Buffer_Structs::Message;

use bytes::Bytes;
use lazy_static::lazy_static;
use std::ptr;
use std::sync::atomic::AtomicPtr;

/// Default number of slots in a bundler ring.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Smallest ring the bundler will build. Two slots are always unusable
/// (the gap slot and the slot under the read cursor).
pub const MIN_CAPACITY: usize = 4;

lazy_static! {
    /// Marks a slot the consumer has drained but not yet reclaimed.
    ///
    /// Only its address is meaningful. It is never handed out, never freed and
    /// never compared by value, so an application message with identical
    /// content can not be mistaken for it.
    static ref CONSUMED: Message = Message::new(None, Bytes::new());
}

/// Pointer written into a slot to mark it `Consumed`.
#[inline]
pub(crate) fn consumed_ptr() -> *mut Message {
    &*CONSUMED as *const Message as *mut Message
}

/// Returns true if `slot_value` is the consumed sentinel.
#[inline]
pub fn is_consumed(slot_value: *const Message) -> bool {
    ptr::eq(slot_value, consumed_ptr())
}

/// Observable state of a single slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing written since the consumer last reclaimed it.
    Empty,
    /// Holds a message the consumer has not processed yet.
    Occupied,
    /// Drained by the consumer, waiting for the read cursor to pass over it.
    Consumed,
}

/// A fixed-capacity, lock-free, multi-producer single-consumer ring of
/// message slots.
///
/// ### Concurrency Design:
/// - **Producers**: claim a slot by CAS-ing `write_index` forward, then store
///   an owned `Box<Message>` pointer into the slot they won. Producers never
///   read slot contents.
/// - **Consumer**: the only thread that turns `Occupied` into `Consumed`
///   (taking ownership of the message) and `Consumed` into `Empty`. It then
///   publishes the reclaimed prefix with a single store to `read_index`.
///
/// Slot values are raw pointers: null is `Empty`, the address of the
/// `CONSUMED` sentinel is `Consumed`, anything else is an owned `Occupied`
/// message.
pub struct RingBuffer {
    /// The slot array. Length is `capacity`, always a power of two.
    pub(crate) slots: Box<[AtomicPtr<Message>]>,

    /// Shared read and write cursors.
    pub(crate) cursors: Cursors,

    /// Number of slots.
    pub(crate) capacity: usize,

    /// `capacity - 1`, used to wrap indexes without a modulo.
    pub(crate) mask: usize,
}
