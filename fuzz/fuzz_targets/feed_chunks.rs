//! Fuzz arbitrary chunkings through the polling scheduler.
//!
//! The byte-sum backend is chunking-agnostic, so however the input is split
//! into blobs the delivered digest must equal the sum of all bytes, every
//! blob must complete exactly once, and the engine must settle with nothing
//! in flight.

#![no_main]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use digestrs::{
    DigestBackend, DigestConfig, DigestEvents, EventPump, MessageDigest, SchedulerMode,
};
use libfuzzer_sys::fuzz_target;

struct Sum32 {
    sum: u32,
    digest: Option<[u8; 4]>,
    read_pos: usize,
}

impl DigestBackend for Sum32 {
    fn digest_size(&self) -> usize {
        4
    }

    fn feed(&mut self, data: &[u8], is_last: bool) -> io::Result<usize> {
        self.sum = data.iter().fold(self.sum, |s, &b| s.wrapping_add(b as u32));
        if is_last {
            self.digest = Some(self.sum.to_le_bytes());
        }
        Ok(data.len())
    }

    fn read_digest(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let digest = self
            .digest
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "not finalized"))?;
        let n = out.len().min(digest.len() - self.read_pos);
        out[..n].copy_from_slice(&digest[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }
}

fuzz_target!(|input: &[u8]| {
    // First byte steers the chunk width; the rest is payload.
    let Some((&width, payload)) = input.split_first() else {
        return;
    };
    let chunk = (width as usize % 31) + 1;

    let pump = EventPump::new();
    let feeds = Arc::new(Mutex::new(0usize));
    let digest = Arc::new(Mutex::new(None));

    let feeds_slot = Arc::clone(&feeds);
    let digest_slot = Arc::clone(&digest);
    let events = DigestEvents::new(move |output| {
        *digest_slot.lock().unwrap() = Some(output);
    })
    .with_feed_done(move |_input, status| {
        assert!(status.is_ok());
        *feeds_slot.lock().unwrap() += 1;
    });

    let handle = MessageDigest::new(
        Sum32 {
            sum: 0,
            digest: None,
            read_pos: 0,
        },
        DigestConfig::new("sum32")
            .with_scheduler(SchedulerMode::Poll)
            .with_max_block_size(chunk.max(3)),
        events,
        pump.clone(),
    )
    .unwrap();

    let blobs: Vec<&[u8]> = payload.chunks(chunk).collect();
    let count = blobs.len().max(1);
    if blobs.is_empty() {
        handle.feed(Bytes::new(), true).unwrap();
    } else {
        for (i, blob) in blobs.iter().enumerate() {
            handle
                .feed(Bytes::copy_from_slice(blob), i + 1 == blobs.len())
                .unwrap();
        }
    }

    assert!(pump.run_until(
        || digest.lock().unwrap().is_some(),
        Duration::from_secs(10),
    ));

    let expected: u32 = payload.iter().fold(0u32, |s, &b| s.wrapping_add(b as u32));
    assert_eq!(
        digest.lock().unwrap().take().unwrap(),
        Bytes::copy_from_slice(&expected.to_le_bytes()),
    );
    assert_eq!(*feeds.lock().unwrap(), count);
    assert_eq!(handle.pending_bytes(), 0);
});
