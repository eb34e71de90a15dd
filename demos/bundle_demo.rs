// In demos/bundle_demo.rs
//
// Run `frame_dump` first, then:
//   cargo run --example bundle_demo -- <messages_per_thread> [threads] [--auto-exit]
use ringbundler::{Address, Message, RingBundler, SendOutcome, Transport};
use sha2::{Digest, Sha256};
use std::env;
use std::io;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const TARGET: &str = "127.0.0.1:7800";
const DESTINATIONS: u64 = 4;

/// Sends every frame as one datagram to the `frame_dump` listener.
struct UdpTransport {
    socket: UdpSocket,
    frames: AtomicUsize,
}

impl Transport for UdpTransport {
    fn max_bundle_size(&self) -> usize {
        // stay below the IPv4 datagram limit once the header is added
        60_000
    }

    fn cluster_name(&self) -> &[u8] {
        b"demo-cluster"
    }

    fn local_address(&self) -> Address {
        Address(0xD3)
    }

    fn do_send(&self, frame: &[u8], _dest: Option<Address>) -> io::Result<()> {
        self.socket.send(frame)?;
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <messages_per_thread> [threads] [--auto-exit]", args[0]);
        std::process::exit(1);
    }

    let per_thread: usize = args[1].parse()?;
    let threads: usize = args
        .get(2)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.parse())
        .transpose()?
        .unwrap_or(4);
    let auto_exit = args.iter().any(|s| s == "--auto-exit");

    println!("Demo: Precomputing {} digests...", per_thread * threads);
    let start_precompute = Instant::now();
    let digests: Vec<Vec<u8>> = (0..per_thread * threads)
        .map(|i| Sha256::digest(format!("message_{}", i).as_bytes()).to_vec())
        .collect();
    println!("Demo: Precomputed digests in {:.2?}", start_precompute.elapsed());
    let digests = Arc::new(digests);

    let socket = UdpSocket::bind("127.0.0.1:0")?;
    socket.connect(TARGET)?;
    let transport = Arc::new(UdpTransport {
        socket,
        frames: AtomicUsize::new(0),
    });

    let bundler = Arc::new(RingBundler::builder().with_capacity(4096).build(transport.clone())?);
    bundler.start()?;

    let keep_alive = Arc::new(AtomicBool::new(true));
    let keep_alive_for_handler = Arc::clone(&keep_alive);
    ctrlc::set_handler(move || {
        keep_alive_for_handler.store(false, Ordering::SeqCst);
    })?;

    println!("Demo: Sending to {} from {} threads", TARGET, threads);
    let queued = Arc::new(AtomicUsize::new(0));
    let dropped = Arc::new(AtomicUsize::new(0));
    let start_send = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let bundler = Arc::clone(&bundler);
            let digests = Arc::clone(&digests);
            let keep_alive = Arc::clone(&keep_alive);
            let queued = Arc::clone(&queued);
            let dropped = Arc::clone(&dropped);
            thread::spawn(move || {
                for i in 0..per_thread {
                    if !keep_alive.load(Ordering::SeqCst) {
                        break;
                    }
                    let n = t * per_thread + i;
                    let dest = Address(n as u64 % DESTINATIONS + 1);
                    let msg = Message::new(Some(dest), digests[n].clone());
                    match bundler.send(msg) {
                        Ok(SendOutcome::Queued) => queued.fetch_add(1, Ordering::Relaxed),
                        Ok(SendOutcome::Dropped) => dropped.fetch_add(1, Ordering::Relaxed),
                        Err(e) => {
                            eprintln!("Demo: send failed: {}", e);
                            break;
                        }
                    };
                }
            })
        })
        .collect();

    for h in handles {
        if h.join().is_err() {
            eprintln!("Demo: producer thread panicked");
        }
    }

    let send_time = start_send.elapsed();
    let queued = queued.load(Ordering::Relaxed);
    println!(
        "Demo: Queued {} / dropped {} in {:.2?} ({:.0} msgs/sec)",
        queued,
        dropped.load(Ordering::Relaxed),
        send_time,
        queued as f64 / send_time.as_secs_f64()
    );

    if !auto_exit {
        println!("Demo: Press Ctrl+C to stop the bundler...");
        while keep_alive.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
        }
    } else {
        // give the consumer a moment to flush the tail
        thread::sleep(Duration::from_millis(200));
    }

    bundler.stop();
    println!(
        "Demo: {} frames sent, ring state: {}",
        transport.frames.load(Ordering::Relaxed),
        bundler
    );
    Ok(())
}
