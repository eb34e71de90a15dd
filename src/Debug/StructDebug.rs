use std::fmt;
use crate::Bundler::Buffer::RingBuffer;
use crate::Bundler::RingBundler;
use crate::Core::WakeCoordinator;

/// One-line state summary of a ring
///
/// Format: `read-index=R write-index=W size=S cap=C`. Both cursors are
/// loaded once so the size matches the printed indexes.
pub fn display_ring_buffer(buffer: &RingBuffer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let ri = buffer.read_index();
    let wi = buffer.write_index();
    write!(
        f,
        "read-index={} write-index={} size={} cap={}",
        ri,
        wi,
        buffer.size_between(ri, wi),
        buffer.capacity()
    )
}

/// Debug function for RingBuffer
///
/// Shows cursors and capacity without dereferencing any slot
pub fn debug_ring_buffer(buffer: &RingBuffer, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RingBuffer")
        .field("read_index", &buffer.read_index())
        .field("write_index", &buffer.write_index())
        .field("size", &buffer.size())
        .field("capacity", &buffer.capacity())
        .finish_non_exhaustive()
}

/// Debug function for RingBundler
///
/// Shows:
/// - Consumer thread name and running state
/// - Flush trigger counters
/// - Underlying RingBuffer summary
pub fn debug_ring_bundler(bundler: &RingBundler, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RingBundler")
        .field("thread_name", &bundler.thread_name())
        .field("running", &bundler.is_running())
        .field("active_producers", &bundler.active_producers())
        .field("accumulated_bytes", &bundler.accumulated_bytes())
        .field("ring", bundler.ring())
        .finish()
}

pub fn debug_wake_coordinator(waker: &WakeCoordinator, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("WakeCoordinator")
        .field("unparking", &waker.is_unparking())
        .finish_non_exhaustive()
}

// Proxy implementations that call the standalone functions above

impl fmt::Display for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_ring_buffer(self, f)
    }
}

impl fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_ring_buffer(self, f)
    }
}

impl fmt::Display for RingBundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_ring_buffer(self.ring(), f)
    }
}

impl fmt::Debug for RingBundler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_ring_bundler(self, f)
    }
}

impl fmt::Debug for WakeCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_wake_coordinator(self, f)
    }
}
