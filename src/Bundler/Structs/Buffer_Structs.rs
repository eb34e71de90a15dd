// These are the message types carried through the bundler ring

use bytes::Bytes;
use std::fmt;

/// Serialized size of the per-message fields written ahead of the payload:
/// `flags: u16` + `payload_len: u32`.
pub const MESSAGE_OVERHEAD: usize = 2 + 4;

/// Opaque identifier of a group member.
///
/// The bundler only ever compares addresses for equality and writes them to
/// the frame header; their meaning belongs to the membership layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// An outbound message as handed to the bundler by the protocol stack.
///
/// `dest == None` addresses the whole group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    dest: Option<Address>,
    flags: u16,
    payload: Bytes,
}

impl Message {
    /// Creates a message for `dest` (or for the whole group when `None`).
    pub fn new(dest: Option<Address>, payload: impl Into<Bytes>) -> Self {
        Self {
            dest,
            flags: 0,
            payload: payload.into(),
        }
    }

    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn dest(&self) -> Option<Address> {
        self.dest
    }

    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Number of bytes this message occupies inside a frame, addresses elided.
    ///
    /// This is the figure fed to the flush trigger and compared against the
    /// transport's max bundle size.
    #[inline]
    pub fn size(&self) -> usize {
        MESSAGE_OVERHEAD + self.payload.len()
    }
}
