// In src/Bundler/lifecycle.rs

use super::builder::BundlerBuilder;
use super::consumer::Drainer;
use super::producer::SendOutcome;
use crate::Bundler::Buffer::layout::FlushState;
use crate::Bundler::Buffer::RingBuffer;
use crate::Bundler::Structs::Buffer_Structs::Message;
use crate::Core::{BundlerError, Transport, WakeCoordinator};

use crossbeam_utils::sync::Parker;
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

/// State shared between producers, the consumer thread and the handle.
pub(crate) struct Shared {
    pub(crate) ring: RingBuffer,
    pub(crate) flush: FlushState,
    pub(crate) waker: WakeCoordinator,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) running: AtomicBool,
    /// Consumer-only state. Taken for the whole life of the consumer thread,
    /// or for one pass by `RingBundler::drain`. Never touched by `send`.
    pub(crate) drainer: Mutex<Drainer>,
}

/// A non-blocking message bundler backed by a lock-free ring buffer.
///
/// Any number of threads may call [`send`](Self::send) concurrently. One
/// consumer thread, started with [`start`](Self::start), drains the ring,
/// groups messages by destination and hands each group to the
/// [`Transport`] as one frame.
///
/// A full ring never blocks a sender: the message is dropped and a warning
/// is logged. Reliability is the job of the protocol layer above.
pub struct RingBundler {
    pub(crate) shared: Arc<Shared>,
    pub(crate) thread_name: String,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RingBundler {
    pub fn builder() -> BundlerBuilder {
        BundlerBuilder::new()
    }

    pub(crate) fn new(ring: RingBuffer, transport: Arc<dyn Transport>, thread_name: String) -> Self {
        let parker = Parker::new();
        let waker = WakeCoordinator::new(parker.unparker().clone());

        Self {
            shared: Arc::new(Shared {
                ring,
                flush: FlushState::new(),
                waker,
                transport,
                running: AtomicBool::new(false),
                drainer: Mutex::new(Drainer::new(parker)),
            }),
            thread_name,
            handle: Mutex::new(None),
        }
    }

    /// Enqueue a message for bundling. Never blocks.
    ///
    /// Returns `Ok(SendOutcome::Dropped)` if the ring is full. Works whether
    /// or not the consumer is running; queued messages wait for the next
    /// drain pass.
    pub fn send(&self, msg: Message) -> Result<SendOutcome, BundlerError> {
        self.shared.send(msg)
    }

    /// Reset the ring and spawn the consumer thread.
    ///
    /// Messages still resident from a previous run are discarded. Calling
    /// `start` on a running bundler does nothing.
    pub fn start(&self) -> Result<(), BundlerError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            debug!(thread = %self.thread_name, "bundler already running");
            return Ok(());
        }

        self.reset_stopped();
        self.shared.running.store(true, Release);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || shared.run_consumer());

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                debug!(thread = %self.thread_name, capacity = self.capacity(), "bundler started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Release);
                Err(BundlerError::Spawn(e))
            }
        }
    }

    /// Stop the consumer thread and wait for it to exit.
    ///
    /// Messages still in the ring stay there. Producers racing with `stop`
    /// may still enqueue; their wake-ups simply find nobody to wake.
    pub fn stop(&self) {
        let handle = self.handle.lock().take();
        if let Some(h) = handle {
            self.shared.running.store(false, Release);
            self.shared.waker.unpark_now();
            if h.join().is_err() {
                error!(thread = %self.thread_name, "consumer thread panicked");
            }
            debug!(thread = %self.thread_name, ring = %self.shared.ring, "bundler stopped");
        }
    }

    /// Put both cursors back to their initial offsets (`read_index = 0`,
    /// `write_index = 1`) and discard resident messages.
    ///
    /// Refused while the consumer thread runs.
    ///
    /// Call it only when no thread is inside `send`. A send that races a
    /// reset stays memory safe, but its message may be dropped, sent late
    /// out of order, or cause a later send into the same slot to be
    /// dropped instead. No message is ever overwritten or leaked.
    pub fn reset(&self) -> Result<(), BundlerError> {
        let handle = self.handle.lock();
        if handle.is_some() {
            return Err(BundlerError::Running);
        }
        self.reset_stopped();
        Ok(())
    }

    fn reset_stopped(&self) {
        let mut drainer = self.shared.drainer.lock();
        drainer.reset();
        let discarded = self.shared.ring.reset();
        self.shared.flush.accumulated_bytes.store(0, Release);
        if discarded > 0 {
            debug!(discarded, "reset discarded resident messages");
        }
    }

    /// Run one drain pass on the calling thread.
    ///
    /// Only allowed while stopped, so the caller takes the consumer role.
    /// Returns the number of messages handed to the transport.
    pub fn drain(&self) -> Result<usize, BundlerError> {
        let handle = self.handle.lock();
        if handle.is_some() {
            return Err(BundlerError::Running);
        }
        let mut drainer = self.shared.drainer.lock();
        Ok(drainer.drain_and_send(&self.shared.ring, &*self.shared.transport))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Acquire)
    }

    /// Slots claimed but not yet reclaimed by the consumer.
    pub fn size(&self) -> usize {
        self.shared.ring.size()
    }

    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    pub fn read_index(&self) -> usize {
        self.shared.ring.read_index()
    }

    pub fn write_index(&self) -> usize {
        self.shared.ring.write_index()
    }

    /// The underlying ring, for diagnostics.
    pub fn ring(&self) -> &RingBuffer {
        &self.shared.ring
    }

    /// Producers currently inside `send`.
    pub fn active_producers(&self) -> usize {
        self.shared.active_producers()
    }

    /// Bytes queued since the last size-triggered flush.
    pub fn accumulated_bytes(&self) -> usize {
        self.shared.accumulated_bytes()
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl Drop for RingBundler {
    fn drop(&mut self) {
        self.stop();
    }
}
