//! # digestrs
//!
//! Streaming message digests for event-loop applications.
//!
//! `digestrs` feeds incrementally supplied input blobs through a pluggable
//! hashing backend and delivers per-blob completion callbacks plus the final
//! digest blob on the host's main loop. It exists because stream-oriented
//! crypto backends (kernel-crypto sockets being the motivating case) are
//! neither poll-friendly nor reliably non-blocking; the engine bridges that
//! mismatch to a cooperative event loop:
//!
//! - **Blocking backends** - A per-handle worker thread absorbs arbitrarily
//!   long backend calls; completions hop back to the loop thread
//! - **Threadless hosts** - A zero-delay polling tick drives non-blocking
//!   backends with identical caller-visible semantics
//! - **Partial writes** - Backends may accept any prefix of a feed; the
//!   engine retries and preserves the last-chunk marker exactly once
//! - **Bounded memory** - An optional feed ceiling rejects submissions
//!   before unconsumed input piles up
//!
//! ## Design Philosophy
//!
//! This crate intentionally maintains a narrow scope: **move byte streams
//! through a digest backend and report completions in order**. It
//! deliberately does not:
//!
//! - Choose or negotiate hash algorithms (the backend decides)
//! - Manage keys (pass them to your backend directly)
//! - Buffer indefinitely (set a feed ceiling to bound memory)
//! - Impose an event loop (implement [`MainLoop`] over your own, or pump
//!   the bundled [`EventPump`])
//!
//! ## Features
//!
//! - **Feature: `hash-blake3`** (default) - Enables the BLAKE3 reference
//!   backend
//!
//! # Examples
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//! use bytes::Bytes;
//! use digestrs::{Blake3Backend, DigestConfig, DigestEvents, EventPump, MessageDigest};
//!
//! fn main() -> Result<(), digestrs::DigestError> {
//!     let pump = EventPump::new();
//!
//!     let digest = Arc::new(Mutex::new(None));
//!     let slot = Arc::clone(&digest);
//!     let events = DigestEvents::new(move |output| {
//!         *slot.lock().unwrap() = Some(output);
//!     })
//!     .with_feed_done(|input, status| {
//!         assert!(status.is_ok());
//!         drop(input);
//!     });
//!
//!     let handle = MessageDigest::new(
//!         Blake3Backend::new(),
//!         DigestConfig::new("blake3"),
//!         events,
//!         pump.clone(),
//!     )?;
//!
//!     handle.feed(Bytes::from_static(b"streaming "), false)?;
//!     handle.feed(Bytes::from_static(b"digest"), true)?;
//!
//!     assert!(pump.run_until(
//!         || digest.lock().unwrap().is_some(),
//!         Duration::from_secs(5),
//!     ));
//!     assert_eq!(digest.lock().unwrap().as_ref().unwrap().len(), 32);
//!     Ok(())
//! }
//! ```
//!
//! ## Custom backends
//!
//! Implement [`DigestBackend`] over any stream-oriented hash interface.
//! Partial acceptance and would-block results are part of the contract; see
//! the trait documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Public modules
mod backend;
mod config;
mod digest;
mod error;
mod mainloop;

//
// Public API surface
//
// The public API is intentionally minimal. Only essential types are exported
// to keep the surface area small and the API stable.
//

/// Backend contract and bundled backends.
pub use backend::DigestBackend;

/// BLAKE3 reference backend (requires `hash-blake3`).
#[cfg(feature = "hash-blake3")]
pub use backend::Blake3Backend;

/// Handle configuration.
pub use config::{DigestConfig, SchedulerMode, DEFAULT_MAX_FEED_BLOCK_SIZE};

/// The engine surface.
pub use digest::{DigestEvents, DigestReadyFn, FeedDoneFn, MessageDigest};

/// Error types for digest operations.
pub use error::DigestError;

/// Main-loop integration.
pub use mainloop::{EventPump, MainLoop, Task, TimerTick};
