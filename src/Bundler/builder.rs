use super::RingBundler;
use crate::Bundler::Buffer::{RingBuffer, DEFAULT_CAPACITY, MIN_CAPACITY};
use crate::Core::{BundlerError, Transport};
use std::sync::Arc;

/// Default name of the consumer thread.
pub const DEFAULT_THREAD_NAME: &str = "RingBufferBundler";

pub struct BundlerBuilder {
    capacity: usize,
    thread_name: String,
}

impl Default for BundlerBuilder {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY, // 1024 slots
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl BundlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ring slots. Rounded up to the next power of two, with a
    /// floor of `MIN_CAPACITY`.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn build(self, transport: Arc<dyn Transport>) -> Result<RingBundler, BundlerError> {
        if self.capacity == 0 {
            return Err(BundlerError::InvalidArgument(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if transport.max_bundle_size() == 0 {
            return Err(BundlerError::InvalidArgument(
                "transport max_bundle_size must be greater than zero".to_string(),
            ));
        }
        // the frame header carries the cluster name length as a u16
        let cluster_len = transport.cluster_name().len();
        if cluster_len > u16::MAX as usize {
            return Err(BundlerError::InvalidArgument(format!(
                "cluster name of {} bytes exceeds {} bytes",
                cluster_len,
                u16::MAX
            )));
        }

        let capacity = self
            .capacity
            .max(MIN_CAPACITY)
            .checked_next_power_of_two()
            .ok_or_else(|| {
                BundlerError::InvalidArgument(format!(
                    "capacity {} has no power of two above it",
                    self.capacity
                ))
            })?;

        Ok(RingBundler::new(
            RingBuffer::new(capacity),
            transport,
            self.thread_name,
        ))
    }
}
