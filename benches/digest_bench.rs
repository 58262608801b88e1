//! Benchmarks for digestrs.
//!
//! Run with:
//!     cargo bench

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use digestrs::{
    DigestBackend, DigestConfig, DigestEvents, EventPump, MessageDigest, SchedulerMode,
};

/// Digest = sum of all bytes, little-endian u32. Cheap enough that the
/// benchmark measures the engine, not the hash.
struct Sum32 {
    sum: u32,
    digest: Option<[u8; 4]>,
    read_pos: usize,
}

impl Sum32 {
    fn new() -> Self {
        Self {
            sum: 0,
            digest: None,
            read_pos: 0,
        }
    }
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

/// Streams `data` in `chunk` sized blobs and pumps until the digest lands.
fn run_stream(mode: SchedulerMode, data: &Bytes, chunk: usize) -> usize {
    let pump = EventPump::new();
    let done = Arc::new(Mutex::new(None));

    let slot = Arc::clone(&done);
    let events = DigestEvents::new(move |digest| {
        *slot.lock().unwrap() = Some(digest);
    });

    let handle = MessageDigest::new(
        Sum32::new(),
        DigestConfig::new("sum32").with_scheduler(mode),
        events,
        pump.clone(),
    )
    .unwrap();

    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + chunk).min(data.len());
        handle
            .feed(data.slice(offset..end), end == data.len())
            .unwrap();
        offset = end;
    }

    assert!(pump.run_until(
        || done.lock().unwrap().is_some(),
        Duration::from_secs(30),
    ));
    done.lock().unwrap().as_ref().unwrap().len()
}

fn bench_schedulers(c: &mut Criterion) {
    let mut group = c.benchmark_group("schedulers");

    for size in [64 * 1024, 1024 * 1024] {
        let data: Bytes = (0..size).map(|i| (i * 7 + 13) as u8).collect::<Vec<_>>().into();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(format!("worker_{}kb", size / 1024), &data, |b, data| {
            b.iter(|| run_stream(SchedulerMode::Worker, black_box(data), 64 * 1024));
        });
        group.bench_with_input(format!("poll_{}kb", size / 1024), &data, |b, data| {
            b.iter(|| run_stream(SchedulerMode::Poll, black_box(data), 64 * 1024));
        });
    }

    group.finish();
}

fn bench_chunk_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_sizes");
    let size = 1024 * 1024;
    let data: Bytes = (0..size).map(|i| (i * 7 + 13) as u8).collect::<Vec<_>>().into();

    group.throughput(Throughput::Bytes(size as u64));
    for chunk in [4 * 1024, 64 * 1024, 1024 * 1024] {
        group.bench_with_input(format!("{}kb_blobs", chunk / 1024), &data, |b, data| {
            b.iter(|| run_stream(SchedulerMode::Worker, black_box(data), chunk));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_schedulers, bench_chunk_sizes);
criterion_main!(benches);
