// In src/Bundler/consumer.rs

use super::lifecycle::Shared;
use crate::Bundler::Buffer::layout::INITIAL_READ_INDEX;
use crate::Bundler::Buffer::{is_consumed, RingBuffer};
use crate::Bundler::Structs::{Address, Message};
use crate::Core::{BundlerError, Transport};
use crate::Protocol::{patch_count, write_header, write_message};

use bytes::BytesMut;
use crossbeam_utils::sync::Parker;
use std::sync::atomic::Ordering::Acquire;
use tracing::{debug, error, trace, warn};

/// Initial size of the reusable output buffer.
const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

/// State owned by the single consumer.
///
/// Lives behind a lock in `Shared` that producers never take. Whoever holds
/// the lock is the consumer, which is what makes `retire` and
/// `advance_read_index` sound.
pub(crate) struct Drainer {
    /// Private read cursor. Runs ahead of the published one only within a
    /// drain pass.
    ri: usize,

    /// Serialization buffer, reused across passes.
    output: BytesMut,

    /// Where the consumer thread sleeps between passes.
    pub(crate) parker: Parker,
}

impl Drainer {
    pub(crate) fn new(parker: Parker) -> Self {
        Self {
            ri: INITIAL_READ_INDEX,
            output: BytesMut::with_capacity(OUTPUT_BUFFER_SIZE),
            parker,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.ri = INITIAL_READ_INDEX;
        self.output.clear();
    }

    /// One drain pass: send everything currently readable, then publish the
    /// reclaimed capacity.
    ///
    /// Returns the number of messages handed to the transport.
    pub(crate) fn drain_and_send(&mut self, ring: &RingBuffer, transport: &dyn Transport) -> usize {
        let wi = ring.write_index();
        if ring.increment(self.ri) == wi {
            return 0;
        }
        let sent = self.send_bundled_messages(ring, transport, wi);
        self.ri = ring.advance_read_index(self.ri, wi);
        sent
    }

    /// Read and send messages in range `[ri + 1 .. write_index - 1]`.
    ///
    /// Each occupied slot not already swept into an earlier frame starts a
    /// new frame for its destination.
    fn send_bundled_messages(&mut self, ring: &RingBuffer, transport: &dyn Transport, wi: usize) -> usize {
        let max_bundle_size = transport.max_bundle_size();
        let cluster_name = transport.cluster_name();
        let src = transport.local_address();
        let mut sent_msgs = 0;

        let mut i = ring.increment(self.ri);
        while i != wi {
            let raw = ring.load_slot(i);
            if is_consumed(raw) {
                i = ring.increment(i);
                continue;
            }
            if raw.is_null() {
                // claimed but not written yet; never overtake it
                break;
            }

            // SAFETY: occupied slot; only this consumer retires it, and it
            // has not done so yet.
            let dest = unsafe { (*raw).dest() };
            match self.send_frame(ring, transport, dest, src, cluster_name, i, wi, max_bundle_size) {
                Ok(num_msgs) => sent_msgs += num_msgs,
                Err(e) => error!(dest = ?dest, error = %e, "failed to send message(s)"),
            }
            i = ring.increment(i);
        }
        sent_msgs
    }

    /// Marshal one destination group starting at `start` into the output
    /// buffer and hand it to the transport as a single frame.
    #[allow(clippy::too_many_arguments)]
    fn send_frame(
        &mut self,
        ring: &RingBuffer,
        transport: &dyn Transport,
        dest: Option<Address>,
        src: Address,
        cluster_name: &[u8],
        start: usize,
        end: usize,
        max_bundle_size: usize,
    ) -> Result<usize, BundlerError> {
        self.output.clear();

        // remember where the count lives, the real value is known only
        // after grouping
        let count_pos = match write_header(&mut self.output, dest, src, cluster_name) {
            Ok(pos) => pos,
            Err(e) => {
                // nothing was written, but the group must still leave the ring
                let mut discarded = 0;
                take_group(ring, dest, start, end, max_bundle_size, |_| discarded += 1);
                warn!(dest = ?dest, discarded, "discarded group with unwritable header");
                return Err(e.into());
            }
        };
        let num_msgs = self.marshal_messages_to_same_destination(ring, dest, start, end, max_bundle_size)?;
        patch_count(&mut self.output, count_pos, num_msgs as u32);

        transport
            .do_send(&self.output, dest)
            .map_err(|source| BundlerError::Send {
                dest: dest.map_or_else(|| "<all>".to_string(), |a| a.to_string()),
                source,
            })?;
        trace!(dest = ?dest, num_msgs, bytes = self.output.len(), "sent frame");
        Ok(num_msgs)
    }

    /// Walk forward from `start` and marshal every message for `dest` while
    /// the group stays within `max_bundle_size`. Each marshalled slot is
    /// left `Consumed`; only `advance_read_index` empties it.
    ///
    /// The first message is always taken so a slot can never be stranded.
    /// The walk stops at an unwritten slot so messages to one destination
    /// leave in claim order.
    fn marshal_messages_to_same_destination(
        &mut self,
        ring: &RingBuffer,
        dest: Option<Address>,
        start: usize,
        end: usize,
        max_bundle_size: usize,
    ) -> Result<usize, BundlerError> {
        let mut num_msgs = 0;
        let mut result = Ok(());
        take_group(ring, dest, start, end, max_bundle_size, |msg| {
            num_msgs += 1;
            if result.is_ok() {
                result = write_message(&mut self.output, &msg);
            }
        });
        result?;
        Ok(num_msgs)
    }
}

/// Retire the destination group starting at `start`, handing each message
/// to `f` in slot order. The first message is always taken; later ones only
/// while the group stays within `max_bundle_size`. Stops at an unwritten
/// slot.
fn take_group<F>(
    ring: &RingBuffer,
    dest: Option<Address>,
    start: usize,
    end: usize,
    max_bundle_size: usize,
    mut f: F,
) where
    F: FnMut(Box<Message>),
{
    let mut num_msgs = 0;
    let mut bytes = 0;

    let mut i = start;
    while i != end {
        let raw = ring.load_slot(i);
        if raw.is_null() {
            break;
        }
        if !is_consumed(raw) {
            // SAFETY: occupied slot owned by the ring until retired below
            let msg = unsafe { &*raw };
            if msg.dest() == dest {
                let msg_size = msg.size();
                if num_msgs > 0 && bytes + msg_size > max_bundle_size {
                    break;
                }
                if let Some(msg) = ring.retire(i) {
                    bytes += msg_size;
                    num_msgs += 1;
                    f(msg);
                }
            }
        }
        i = ring.increment(i);
    }
}

impl Shared {
    /// Body of the consumer thread: drain, then park until a producer (or
    /// `stop`) unparks us.
    pub(crate) fn run_consumer(&self) {
        let mut drainer = self.drainer.lock();
        debug!(ring = %self.ring, "consumer thread started");

        while self.running.load(Acquire) {
            let sent = drainer.drain_and_send(&self.ring, &*self.transport);
            if sent > 0 {
                trace!(sent, "drain pass complete");
            }
            drainer.parker.park();
        }

        debug!(ring = %self.ring, "consumer thread stopped");
    }
}
