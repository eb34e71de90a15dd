use crossbeam_utils::CachePadded;
use std::sync::atomic::AtomicUsize;

/// Initial value of the shared read cursor.
pub const INITIAL_READ_INDEX: usize = 0;

/// Initial value of the shared write cursor (one past the read cursor).
pub const INITIAL_WRITE_INDEX: usize = 1;

/// The two ring cursors.
///
/// Producers CAS `write_index` forward to claim slots. Only the consumer
/// stores `read_index`, and it does so exactly once per drain pass, after
/// every slot it reclaimed has been cleared. Each cursor sits on its own
/// cache line so producers hammering `write_index` do not invalidate the
/// line the consumer publishes through.
#[repr(C)]
pub struct Cursors {
    /// Last slot fully reclaimed by the consumer.
    pub read_index: CachePadded<AtomicUsize>,

    /// Claim counter. Only ever moves forward and is masked when used as a
    /// slot index, so a CAS against a value read a whole lap earlier fails.
    pub write_index: CachePadded<AtomicUsize>,
}

impl Cursors {
    pub fn new() -> Self {
        Self {
            read_index: CachePadded::new(AtomicUsize::new(INITIAL_READ_INDEX)),
            write_index: CachePadded::new(AtomicUsize::new(INITIAL_WRITE_INDEX)),
        }
    }
}

impl Default for Cursors {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide flush trigger state of one bundler.
///
/// Both fields are touched by every producer on every send, so each one is
/// padded to a full cache line.
#[repr(C)]
pub struct FlushState {
    /// Bytes enqueued since the last size-triggered flush.
    pub accumulated_bytes: CachePadded<AtomicUsize>,

    /// Producers currently inside `send`.
    pub active_producers: CachePadded<AtomicUsize>,
}

impl FlushState {
    pub fn new() -> Self {
        Self {
            accumulated_bytes: CachePadded::new(AtomicUsize::new(0)),
            active_producers: CachePadded::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for FlushState {
    fn default() -> Self {
        Self::new()
    }
}
