// Layout tests for the hot atomics shared between producers and the consumer.
// Every cursor and counter must sit on its own cache line, otherwise producers
// hammering one of them keep invalidating the line the others live on.
// Offsets are printed to aid debugging when a mismatch occurs on a platform.
use memoffset::offset_of;
use ringbundler::Bundler::Buffer::layout::{Cursors, FlushState};
use std::mem::{align_of, size_of};

const CACHE_LINE: usize = 64;

#[test]
fn test_cursors_layout() {
    let size = size_of::<Cursors>();
    let align = align_of::<Cursors>();
    let off_read = offset_of!(Cursors, read_index);
    let off_write = offset_of!(Cursors, write_index);

    println!("Cursors => size: {size}, align: {align}, offsets: [read_index:{off_read}, write_index:{off_write}]");

    assert!(align >= CACHE_LINE);
    assert_eq!(off_read, 0);
    assert!(off_write - off_read >= CACHE_LINE);
    assert!(size >= 2 * CACHE_LINE);
}

#[test]
fn test_flush_state_layout() {
    let size = size_of::<FlushState>();
    let align = align_of::<FlushState>();
    let off_acc = offset_of!(FlushState, accumulated_bytes);
    let off_active = offset_of!(FlushState, active_producers);

    println!("FlushState => size: {size}, align: {align}, offsets: [accumulated_bytes:{off_acc}, active_producers:{off_active}]");

    assert!(align >= CACHE_LINE);
    assert_eq!(off_acc, 0);
    assert!(off_active - off_acc >= CACHE_LINE);
}
