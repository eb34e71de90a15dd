// In src/Core/transport.rs

use crate::Bundler::Structs::Address;
use std::io;

/// The network side of the bundler.
///
/// Implemented by the surrounding transport. The bundler calls
/// `max_bundle_size`, `cluster_name` and `local_address` once per drain pass,
/// `max_bundle_size` again on every send, and `do_send` once per frame, always
/// from the consumer thread.
pub trait Transport: Send + Sync + 'static {
    /// Upper bound in bytes on the messages packed into a single frame. Also
    /// the accumulated-bytes threshold that triggers a flush.
    fn max_bundle_size(&self) -> usize;

    /// Opaque cluster token written once per frame header.
    fn cluster_name(&self) -> &[u8];

    /// Source identifier written once per frame header.
    fn local_address(&self) -> Address;

    /// Transmit one complete frame to `dest` (`None` = the whole group).
    ///
    /// Errors are logged by the bundler and never retried.
    fn do_send(&self, frame: &[u8], dest: Option<Address>) -> io::Result<()>;
}
