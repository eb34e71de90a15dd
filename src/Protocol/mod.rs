//! Wire format of a bundled frame.
//!
//! One frame carries any number of messages to the same destination:
//!
//! ```text
//! version:u16 | flags:u8 | [dest:u64] | src:u64 | cluster_len:u16 | cluster | count:u32
//! ( msg_flags:u16 | payload_len:u32 | payload ) * count
//! ```
//!
//! All integers are big-endian. `dest` is omitted when the MULTICAST flag is
//! set. Per-message addresses are elided: the destination is the frame's and
//! the source is the frame's.

mod frame;

pub use frame::{
    header_size, patch_count, read_frame, write_header, write_message, Frame, FrameError,
    FLAG_MESSAGE_LIST, FLAG_MULTICAST, WIRE_VERSION,
};
