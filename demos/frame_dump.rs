// In demos/frame_dump.rs
//
//   cargo run --example frame_dump -- [bind_addr] [--auto-exit-after <frames>]
use ringbundler::Protocol::read_frame;
use std::env;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let bind_addr = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "127.0.0.1:7800".to_string());
    let frame_limit: Option<usize> = args
        .iter()
        .position(|s| s == "--auto-exit-after")
        .and_then(|p| args.get(p + 1))
        .map(|s| s.parse())
        .transpose()?;

    let socket = UdpSocket::bind(&bind_addr)?;
    socket.set_read_timeout(Some(Duration::from_millis(200)))?;
    println!("FrameDump: Listening on {}", bind_addr);

    let keep_alive = Arc::new(AtomicBool::new(true));
    let keep_alive_for_handler = Arc::clone(&keep_alive);
    ctrlc::set_handler(move || {
        keep_alive_for_handler.store(false, Ordering::SeqCst);
    })?;

    let mut buf = vec![0u8; 64 * 1024];
    let mut frames = 0usize;
    let mut messages = 0usize;

    while keep_alive.load(Ordering::SeqCst) {
        let len = match socket.recv(&mut buf) {
            Ok(len) => len,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue
            }
            Err(e) => return Err(e.into()),
        };

        match read_frame(&buf[..len]) {
            Ok(frame) => {
                frames += 1;
                messages += frame.messages.len();
                let dest = frame
                    .dest
                    .map_or_else(|| "<all>".to_string(), |a| a.to_string());
                println!(
                    "FrameDump: frame #{} {} bytes src={} dest={} cluster={} msgs={}",
                    frames,
                    len,
                    frame.src,
                    dest,
                    String::from_utf8_lossy(&frame.cluster),
                    frame.messages.len()
                );
            }
            Err(e) => eprintln!("FrameDump: bad frame ({} bytes): {}", len, e),
        }

        if frame_limit.is_some_and(|limit| frames >= limit) {
            break;
        }
    }

    println!("FrameDump: {} frames, {} messages", frames, messages);
    Ok(())
}
