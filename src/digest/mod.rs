//! Streaming digest handles.
//!
//! This module implements the engine surface:
//!
//! - [`MessageDigest`] - A handle that hashes incrementally fed blobs
//! - [`DigestEvents`] - The completion callbacks a handle delivers
//!
//! A handle accepts input blobs in any chunking, drives them through its
//! backend on the configured scheduler, and reports progress through the
//! main loop: one `on_feed_done` per blob, in submission order, then one
//! `on_digest_ready` carrying the output blob.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//! use bytes::Bytes;
//! use digestrs::{Blake3Backend, DigestConfig, DigestEvents, EventPump, MessageDigest};
//!
//! # fn main() -> Result<(), digestrs::DigestError> {
//! let pump = EventPump::new();
//!
//! let result = Arc::new(Mutex::new(None));
//! let slot = Arc::clone(&result);
//! let events = DigestEvents::new(move |digest| {
//!     *slot.lock().unwrap() = Some(digest);
//! });
//!
//! let handle = MessageDigest::new(
//!     Blake3Backend::new(),
//!     DigestConfig::new("blake3"),
//!     events,
//!     pump.clone(),
//! )?;
//!
//! handle.feed(Bytes::from_static(b"hello "), false)?;
//! handle.feed(Bytes::from_static(b"world"), true)?;
//!
//! assert!(pump.run_until(
//!     || result.lock().unwrap().is_some(),
//!     Duration::from_secs(5),
//! ));
//! assert_eq!(result.lock().unwrap().as_ref().unwrap().len(), 32);
//! # Ok(())
//! # }
//! ```

mod poll;
mod state;
mod worker;

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::backend::DigestBackend;
use crate::config::DigestConfig;
use crate::digest::state::{Inner, Scheduler};
use crate::digest::worker::Command;
use crate::error::DigestError;
use crate::mainloop::MainLoop;

/// Callback invoked with the finished digest blob.
pub type DigestReadyFn = Box<dyn FnMut(Bytes) + Send>;

/// Callback invoked once per submitted blob with its final status:
/// `Ok(())` when fully consumed, `Err(Canceled)` when the handle was
/// dropped first.
pub type FeedDoneFn = Box<dyn FnMut(Bytes, Result<(), DigestError>) + Send>;

/// The completion callbacks of a digest handle.
///
/// `on_digest_ready` is required; `on_feed_done` is optional and typically
/// used for backpressure (release or reuse input buffers as the backend
/// consumes them). Both run on the thread that pumps the main loop, in
/// submission order; captured state replaces the usual user-data pointer.
///
/// # Example
///
/// ```
/// use digestrs::DigestEvents;
///
/// let events = DigestEvents::new(|digest| {
///     println!("digest ready: {} bytes", digest.len());
/// })
/// .with_feed_done(|input, status| {
///     println!("blob of {} bytes: {:?}", input.len(), status.is_ok());
/// });
/// # let _ = events;
/// ```
pub struct DigestEvents {
    pub(crate) on_digest_ready: DigestReadyFn,
    pub(crate) on_feed_done: Option<FeedDoneFn>,
}

impl DigestEvents {
    /// Creates the callback set with the required digest-ready callback.
    pub fn new(on_digest_ready: impl FnMut(Bytes) + Send + 'static) -> Self {
        Self {
            on_digest_ready: Box::new(on_digest_ready),
            on_feed_done: None,
        }
    }

    /// Adds the per-blob completion callback.
    pub fn with_feed_done(
        mut self,
        on_feed_done: impl FnMut(Bytes, Result<(), DigestError>) + Send + 'static,
    ) -> Self {
        self.on_feed_done = Some(Box::new(on_feed_done));
        self
    }
}

/// A streaming message-digest handle.
///
/// The handle owns its backend and, once fed, a scheduler resource: a worker
/// thread for blocking backends, or a polling tick for single-threaded
/// hosts. Dropping the handle cancels outstanding work; blobs not yet
/// consumed surface as `on_feed_done(.., Err(Canceled))` on the next pump
/// turn, and no digest is delivered.
///
/// # Ordering
///
/// `on_feed_done` fires in submission order; `on_digest_ready` fires after
/// the `on_feed_done` of the blob that carried `is_last`.
///
/// # Memory
///
/// The engine holds one reference per queued blob and never copies input
/// bytes. In-flight memory is bounded by the configured feed ceiling, or
/// unbounded without one.
pub struct MessageDigest<B: DigestBackend + Send + 'static> {
    inner: Arc<Inner<B>>,
}

impl<B: DigestBackend + Send + 'static> MessageDigest<B> {
    /// Creates a handle over `backend`.
    ///
    /// No scheduler resource is allocated yet; the first feed starts one.
    ///
    /// # Errors
    ///
    /// [`DigestError::InvalidArgument`] if the backend reports a zero digest
    /// size or the configuration fails validation.
    ///
    /// # Arguments
    ///
    /// * `backend` - The hash implementation; owned by the handle
    /// * `config` - Scheduling, ceiling, and clamping options
    /// * `events` - Completion callbacks
    /// * `main_loop` - Where completions are delivered
    pub fn new(
        backend: B,
        config: DigestConfig,
        events: DigestEvents,
        main_loop: Arc<dyn MainLoop>,
    ) -> Result<Self, DigestError> {
        let inner = Inner::new(backend, config, events, main_loop)?;
        Ok(Self { inner })
    }

    /// Submits one blob of the input stream.
    ///
    /// The blob is queued, the scheduler is started if idle, and the call
    /// returns; consumption is reported asynchronously through
    /// `on_feed_done`. `is_last` marks the final blob of the stream and
    /// arms digest delivery; it is accepted at most once.
    ///
    /// # Errors
    ///
    /// - [`DigestError::InvalidArgument`] after an is_last feed
    /// - [`DigestError::Overflow`] if the in-flight total would overflow
    /// - [`DigestError::NoSpace`] if the feed ceiling would be reached
    /// - [`DigestError::Scheduler`] if the worker thread could not start
    ///   (the submission is rolled back)
    ///
    /// # Example
    ///
    /// ```
    /// # use bytes::Bytes;
    /// # use digestrs::{Blake3Backend, DigestConfig, DigestEvents, EventPump, MessageDigest};
    /// # fn main() -> Result<(), digestrs::DigestError> {
    /// # let pump = EventPump::new();
    /// # let handle = MessageDigest::new(
    /// #     Blake3Backend::new(),
    /// #     DigestConfig::new("blake3"),
    /// #     DigestEvents::new(|_| {}),
    /// #     pump.clone(),
    /// # )?;
    /// handle.feed(Bytes::from_static(b"chunk"), false)?;
    /// assert!(handle.feed(Bytes::new(), true).is_ok());
    /// assert!(handle.feed(Bytes::from_static(b"late"), false).is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn feed(&self, blob: Bytes, is_last: bool) -> Result<(), DigestError> {
        self.inner.submit(blob, is_last)
    }

    /// Runs `f` with exclusive access to the backend.
    ///
    /// This is the window into backend-private state (keys, modes,
    /// counters). It serializes with the driver: if the backend is blocked
    /// inside a feed on the worker thread, this call waits.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        let mut backend = self.inner.lock_backend();
        f(&mut backend)
    }

    /// Returns the configured algorithm label.
    pub fn algorithm(&self) -> &str {
        self.inner.config().algorithm()
    }

    /// Returns the backend's digest size in bytes.
    pub fn digest_size(&self) -> usize {
        self.inner.digest_size()
    }

    /// Returns the bytes accepted but not yet consumed by the backend.
    ///
    /// Returns to zero once every submitted blob has been fed through.
    pub fn pending_bytes(&self) -> usize {
        self.inner.lock_state().accumulated_tx
    }
}

impl<B: DigestBackend + Send + 'static> Drop for MessageDigest<B> {
    /// Cancels the handle.
    ///
    /// Sets the deletion sentinel, stops the scheduler, and posts the final
    /// teardown to the main loop. Work already inside the backend completes
    /// there but is not reported; queued blobs surface as canceled.
    fn drop(&mut self) {
        self.inner.mark_deleted();

        debug!(
            algorithm = %self.inner.config().algorithm(),
            pending = self.inner.has_pending_feed(),
            "dropping digest handle"
        );

        let worker_running = {
            let state = self.inner.lock_state();
            match &state.scheduler {
                Scheduler::Worker(tx) => {
                    let _ = tx.send(Command::Cancel);
                    true
                }
                Scheduler::Poll | Scheduler::Idle => false,
            }
        };

        // The worker posts teardown when it exits; otherwise it is on us.
        if !worker_running {
            let inner = Arc::clone(&self.inner);
            self.inner
                .main_loop()
                .invoke(Box::new(move || inner.teardown()));
        }
    }
}
