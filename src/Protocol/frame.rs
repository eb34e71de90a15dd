use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::Bundler::Structs::{Address, Message};

pub const WIRE_VERSION: u16 = 1;

/// Frame is addressed to the whole group; no `dest` field follows.
pub const FLAG_MULTICAST: u8 = 0x01;

/// Frame carries a counted list of messages.
pub const FLAG_MESSAGE_LIST: u8 = 0x02;

/// Size of the fixed part of a message record (flags + payload length).
const MESSAGE_HEADER_SIZE: usize = 2 + 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u16),

    #[error("frame flags {0:#04x} do not describe a message list")]
    NotAMessageList(u8),

    #[error("cluster name of {0} bytes does not fit the header")]
    ClusterNameTooLong(usize),

    #[error("payload of {0} bytes does not fit a message record")]
    PayloadTooLarge(usize),
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dest: Option<Address>,
    pub src: Address,
    pub cluster: Bytes,
    /// Messages with their destination restored from the header.
    pub messages: Vec<Message>,
}

/// Bytes taken by a frame header for the given destination and cluster name.
pub fn header_size(dest: Option<Address>, cluster_len: usize) -> usize {
    let dest_len = if dest.is_some() { 8 } else { 0 };
    2 + 1 + dest_len + 8 + 2 + cluster_len + 4
}

/// Append a frame header with a zero message count.
///
/// Returns the offset of the count field so it can be patched once the real
/// count is known.
pub fn write_header(
    out: &mut BytesMut,
    dest: Option<Address>,
    src: Address,
    cluster: &[u8],
) -> Result<usize, FrameError> {
    let cluster_len =
        u16::try_from(cluster.len()).map_err(|_| FrameError::ClusterNameTooLong(cluster.len()))?;

    out.reserve(header_size(dest, cluster.len()));
    out.put_u16(WIRE_VERSION);
    match dest {
        Some(addr) => {
            out.put_u8(FLAG_MESSAGE_LIST);
            out.put_u64(addr.0);
        }
        None => out.put_u8(FLAG_MESSAGE_LIST | FLAG_MULTICAST),
    }
    out.put_u64(src.0);
    out.put_u16(cluster_len);
    out.put_slice(cluster);

    let count_pos = out.len();
    out.put_u32(0);
    Ok(count_pos)
}

/// Overwrite the count field written by `write_header`.
///
/// # Panics
/// Panics if `count_pos` does not leave room for a `u32` inside `out`.
pub fn patch_count(out: &mut BytesMut, count_pos: usize, count: u32) {
    out[count_pos..count_pos + 4].copy_from_slice(&count.to_be_bytes());
}

/// Append one message record, addresses elided.
pub fn write_message(out: &mut BytesMut, msg: &Message) -> Result<(), FrameError> {
    let payload = msg.payload();
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge(payload.len()))?;

    out.reserve(MESSAGE_HEADER_SIZE + payload.len());
    out.put_u16(msg.flags());
    out.put_u32(len);
    out.put_slice(payload);
    Ok(())
}

#[inline]
fn ensure(buf: &[u8], needed: usize) -> Result<(), FrameError> {
    if buf.remaining() < needed {
        return Err(FrameError::Truncated {
            needed,
            remaining: buf.remaining(),
        });
    }
    Ok(())
}

/// Decode a frame produced by the bundler.
pub fn read_frame(data: &[u8]) -> Result<Frame, FrameError> {
    let mut buf = data;

    ensure(buf, 3)?;
    let version = buf.get_u16();
    if version != WIRE_VERSION {
        return Err(FrameError::UnsupportedVersion(version));
    }
    let flags = buf.get_u8();
    if flags & FLAG_MESSAGE_LIST == 0 {
        return Err(FrameError::NotAMessageList(flags));
    }

    let dest = if flags & FLAG_MULTICAST != 0 {
        None
    } else {
        ensure(buf, 8)?;
        Some(Address(buf.get_u64()))
    };

    ensure(buf, 8 + 2)?;
    let src = Address(buf.get_u64());
    let cluster_len = buf.get_u16() as usize;
    ensure(buf, cluster_len)?;
    let cluster = Bytes::copy_from_slice(&buf[..cluster_len]);
    buf.advance(cluster_len);

    ensure(buf, 4)?;
    let count = buf.get_u32() as usize;
    // every record needs at least its fixed header
    ensure(buf, count.saturating_mul(MESSAGE_HEADER_SIZE))?;

    let mut messages = Vec::with_capacity(count);
    for _ in 0..count {
        ensure(buf, MESSAGE_HEADER_SIZE)?;
        let msg_flags = buf.get_u16();
        let len = buf.get_u32() as usize;
        ensure(buf, len)?;
        let payload = Bytes::copy_from_slice(&buf[..len]);
        buf.advance(len);
        messages.push(Message::new(dest, payload).with_flags(msg_flags));
    }

    Ok(Frame {
        dest,
        src,
        cluster,
        messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(dest: Option<Address>, msgs: &[Message]) -> BytesMut {
        let mut out = BytesMut::new();
        let pos = write_header(&mut out, dest, Address(7), b"demo-cluster").unwrap();
        for m in msgs {
            write_message(&mut out, m).unwrap();
        }
        patch_count(&mut out, pos, msgs.len() as u32);
        out
    }

    #[test]
    fn header_size_matches_written_header() {
        let mut out = BytesMut::new();
        write_header(&mut out, Some(Address(1)), Address(2), b"abc").unwrap();
        assert_eq!(out.len(), header_size(Some(Address(1)), 3));

        out.clear();
        write_header(&mut out, None, Address(2), b"abc").unwrap();
        assert_eq!(out.len(), header_size(None, 3));
    }

    #[test]
    fn unicast_frame_restores_destination() {
        let dest = Some(Address(0xfeed));
        let msgs = vec![
            Message::new(dest, &b"first"[..]).with_flags(3),
            Message::new(dest, &b"second"[..]),
        ];
        let frame = read_frame(&encode(dest, &msgs)).unwrap();

        assert_eq!(frame.dest, dest);
        assert_eq!(frame.src, Address(7));
        assert_eq!(&frame.cluster[..], b"demo-cluster");
        assert_eq!(frame.messages, msgs);
    }

    #[test]
    fn multicast_frame_has_no_dest_field() {
        let msgs = vec![Message::new(None, &b"to everyone"[..])];
        let bytes = encode(None, &msgs);
        assert_eq!(bytes[2], FLAG_MESSAGE_LIST | FLAG_MULTICAST);

        let frame = read_frame(&bytes).unwrap();
        assert_eq!(frame.dest, None);
        assert_eq!(frame.messages.len(), 1);
    }

    #[test]
    fn count_is_back_patched() {
        let mut out = BytesMut::new();
        let pos = write_header(&mut out, None, Address(1), b"").unwrap();
        assert_eq!(&out[pos..pos + 4], &[0, 0, 0, 0]);
        patch_count(&mut out, pos, 0x0102_0304);
        assert_eq!(&out[pos..pos + 4], &[1, 2, 3, 4]);
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let bytes = encode(Some(Address(1)), &[Message::new(Some(Address(1)), &b"payload"[..])]);
        let cut = &bytes[..bytes.len() - 3];
        assert!(matches!(read_frame(cut), Err(FrameError::Truncated { .. })));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut bytes = encode(None, &[]);
        bytes[0] = 0xff;
        assert!(matches!(
            read_frame(&bytes),
            Err(FrameError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn cluster_name_longer_than_u16_is_rejected() {
        let mut out = BytesMut::new();
        let long = vec![b'x'; u16::MAX as usize + 1];
        assert_eq!(
            write_header(&mut out, None, Address(1), &long),
            Err(FrameError::ClusterNameTooLong(long.len()))
        );
    }
}
