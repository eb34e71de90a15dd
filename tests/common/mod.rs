// Shared test helpers: a transport that records every frame it is handed.
#![allow(dead_code)]

use parking_lot::Mutex;
use ringbundler::Protocol::{read_frame, Frame};
use ringbundler::{Address, Transport};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub const LOCAL: Address = Address(0xA);
pub const CLUSTER: &[u8] = b"test-cluster";

pub struct RecordingTransport {
    max_bundle_size: usize,
    frames: Mutex<Vec<(Option<Address>, Vec<u8>)>>,
    failing_dest: Option<Address>,
    pub send_calls: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(max_bundle_size: usize) -> Self {
        Self {
            max_bundle_size,
            frames: Mutex::new(Vec::new()),
            failing_dest: None,
            send_calls: AtomicUsize::new(0),
        }
    }

    /// Every frame addressed to `dest` fails with an I/O error.
    pub fn failing_for(mut self, dest: Address) -> Self {
        self.failing_dest = Some(dest);
        self
    }

    /// All recorded frames, decoded, in send order.
    pub fn frames(&self) -> Vec<Frame> {
        self.frames
            .lock()
            .iter()
            .map(|(dest, bytes)| {
                let frame = read_frame(bytes).expect("bundler produced an undecodable frame");
                assert_eq!(frame.dest, *dest, "frame header disagrees with do_send dest");
                frame
            })
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.frames().iter().map(|f| f.messages.len()).sum()
    }

    /// Poll until at least `n` messages were sent or the timeout expires.
    pub fn wait_for_messages(&self, n: usize, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.message_count() >= n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.message_count() >= n
    }
}

impl Transport for RecordingTransport {
    fn max_bundle_size(&self) -> usize {
        self.max_bundle_size
    }

    fn cluster_name(&self) -> &[u8] {
        CLUSTER
    }

    fn local_address(&self) -> Address {
        LOCAL
    }

    fn do_send(&self, frame: &[u8], dest: Option<Address>) -> io::Result<()> {
        self.send_calls.fetch_add(1, Ordering::Relaxed);
        if dest.is_some() && dest == self.failing_dest {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "peer unreachable"));
        }
        self.frames.lock().push((dest, frame.to_vec()));
        Ok(())
    }
}

/// Payload of `len` bytes, so that `Message::size() == len + 6`.
pub fn payload(tag: u8, len: usize) -> Vec<u8> {
    vec![tag; len]
}
