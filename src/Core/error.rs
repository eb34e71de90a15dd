use std::io;
use thiserror::Error;

use crate::Protocol::FrameError;

/// Errors surfaced by the bundler.
///
/// `Frame` and `Send` never reach a caller. They describe a
/// failed destination group inside a drain pass; the consumer logs them and
/// moves on to the next group.
#[derive(Debug, Error)]
pub enum BundlerError {
    /// Rejected configuration value or argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The message alone would not fit in one frame.
    #[error("message size {size} exceeds max bundle size {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// The operation needs the consumer thread to be stopped.
    #[error("operation not permitted while the bundler is running")]
    Running,

    /// The consumer thread could not be spawned.
    #[error("failed to spawn consumer thread: {0}")]
    Spawn(#[source] io::Error),

    /// A destination group could not be serialized.
    #[error("failed to marshal frame: {0}")]
    Frame(#[from] FrameError),

    /// The transport rejected a frame.
    #[error("failed to send frame to {dest}: {source}")]
    Send {
        dest: String,
        #[source]
        source: io::Error,
    },
}
