//! Stream synthetic input through the BLAKE3 backend.
//!
//! Run with:
//!     cargo run --example blake3_stream

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use digestrs::{Blake3Backend, DigestConfig, DigestEvents, EventPump, MessageDigest};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // 4 MiB of synthetic data, fed in 64 KiB blobs
    let data: Vec<u8> = (0..4 * 1024 * 1024).map(|i| (i * 31 + 7) as u8).collect();
    let chunk = 64 * 1024;

    let pump = EventPump::new();
    let digest = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&digest);
    let events = DigestEvents::new(move |output| {
        *slot.lock().unwrap() = Some(output);
    })
    .with_feed_done(|input, status| {
        println!("fed {} bytes: {:?}", input.len(), status.map(|_| "ok"));
    });

    let handle = MessageDigest::new(
        Blake3Backend::new(),
        DigestConfig::new("blake3").with_feed_size(16 * 1024 * 1024),
        events,
        pump.clone(),
    )?;

    let total = data.len();
    let mut offset = 0;
    let data = Bytes::from(data);
    while offset < total {
        let end = (offset + chunk).min(total);
        handle.feed(data.slice(offset..end), end == total)?;
        offset = end;
    }

    if !pump.run_until(|| digest.lock().unwrap().is_some(), Duration::from_secs(30)) {
        return Err("digest did not arrive".into());
    }

    let digest = digest.lock().unwrap().take().expect("digest just observed");
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    println!("blake3({} bytes) = {}", total, hex);
    Ok(())
}
