use crossbeam_utils::sync::Unparker;
use crossbeam_utils::CachePadded;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Relaxed, SeqCst};

/// Single-flight wake-up of the parked consumer thread.
///
/// Unparking is idempotent (the parker holds at most one permit) but not
/// free, so only one producer at a time issues it. A producer that loses the
/// race for the guard leaves `wake_pending` set instead of returning empty
/// handed; the guard holder re-checks that flag after releasing the guard.
/// This way a wake requested after a slot write is never swallowed by a
/// concurrent unpark that happened before the write.
pub struct WakeCoordinator {
    unparking: CachePadded<AtomicBool>,
    wake_pending: CachePadded<AtomicBool>,
    unparker: Unparker,
}

impl WakeCoordinator {
    pub fn new(unparker: Unparker) -> Self {
        Self {
            unparking: CachePadded::new(AtomicBool::new(false)),
            wake_pending: CachePadded::new(AtomicBool::new(false)),
            unparker,
        }
    }

    /// Ask the consumer to run a drain pass. Never blocks.
    pub fn wake(&self) {
        // SeqCst on both flags: the guard release and the pending check on
        // one side, the pending store and the guard CAS on the other, must
        // not be reordered or both sides could miss each other.
        self.wake_pending.store(true, SeqCst);
        self.unpark_pending();
    }

    /// Issue the unpark if one is pending and nobody else holds the guard.
    /// Loops because a wake may be requested while we hold it.
    fn unpark_pending(&self) {
        while self.wake_pending.load(SeqCst)
            && self
                .unparking
                .compare_exchange(false, true, SeqCst, Relaxed)
                .is_ok()
        {
            self.wake_pending.store(false, SeqCst);
            self.unparker.unpark();
            self.unparking.store(false, SeqCst);
        }
    }

    /// Unpark without going through the guard. Used on shutdown, where the
    /// wake must not be coalesced away.
    pub fn unpark_now(&self) {
        self.unparker.unpark();
    }

    /// True while some producer is inside the unpark call.
    pub fn is_unparking(&self) -> bool {
        self.unparking.load(Relaxed)
    }
}
