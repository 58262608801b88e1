//! Configuration for digest handles.
//!
//! This module provides types to configure how a digest handle behaves:
//!
//! - [`DigestConfig`] - Controls the feed ceiling, block clamping, and scheduling
//! - [`SchedulerMode`] - Selects the worker-thread or polling-timer scheduler
//!
//! # Example
//!
//! ```
//! use digestrs::{DigestConfig, SchedulerMode};
//!
//! // Bound in-flight memory to 1 MiB and poll instead of spawning a thread
//! let config = DigestConfig::new("sha256")
//!     .with_feed_size(1024 * 1024)
//!     .with_scheduler(SchedulerMode::Poll);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::DigestError;

/// Default per-call feed clamp for the polling scheduler (40 KiB).
///
/// A polling tick must not monopolize the main loop, so poll mode slices
/// feeds to this size unless an explicit clamp is configured. The worker
/// scheduler runs on its own thread and applies no clamp by default.
pub const DEFAULT_MAX_FEED_BLOCK_SIZE: usize = 40960;

/// Selects how backend work is scheduled.
///
/// Both modes deliver identical semantics: callbacks fire on the thread that
/// pumps the main loop, in submission order. They differ in where the backend
/// runs and what it is allowed to do there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerMode {
    /// A dedicated worker thread per handle, created lazily on first feed.
    ///
    /// The backend may block arbitrarily long; completions hop back to the
    /// main loop through a dispatch queue.
    Worker,

    /// A zero-delay repeating tick on the main loop.
    ///
    /// For environments without threads. The backend must not block: it is
    /// expected to return [`std::io::ErrorKind::WouldBlock`] when not ready,
    /// prompting a re-tick. Feed from the thread that pumps the loop; the
    /// tick detaches itself when idle and a concurrent feed could race the
    /// re-arm.
    Poll,
}

/// Configuration for a message-digest handle.
///
/// `DigestConfig` carries everything about a handle that is not the backend
/// or the callbacks: a label for logging, the in-flight byte ceiling, the
/// per-call feed clamp, and the scheduler mode.
///
/// # Feed ceiling
///
/// `feed_size` bounds the bytes accepted but not yet consumed by the
/// backend. Zero means unbounded. The bound is exclusive: a submission that
/// would make the in-flight total equal to the ceiling is rejected with
/// [`DigestError::NoSpace`].
///
/// # Example
///
/// ```
/// use digestrs::DigestConfig;
///
/// let config = DigestConfig::new("blake3")
///     .with_feed_size(64 * 1024)
///     .with_max_block_size(8 * 1024);
/// assert_eq!(config.algorithm(), "blake3");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DigestConfig {
    /// Algorithm name, used only for logging and thread naming.
    algorithm: String,

    /// In-flight byte ceiling; 0 means unbounded.
    feed_size: usize,

    /// Explicit per-call feed clamp; `None` defers to the scheduler default.
    max_block_size: Option<usize>,

    /// Scheduler mode.
    scheduler: SchedulerMode,
}

impl DigestConfig {
    /// Creates a configuration for the named algorithm.
    ///
    /// The name is a label for logging; the backend alone determines what is
    /// actually computed. Defaults: unbounded feed ceiling, no explicit
    /// block clamp, worker-thread scheduling.
    ///
    /// # Example
    ///
    /// ```
    /// use digestrs::{DigestConfig, SchedulerMode};
    ///
    /// let config = DigestConfig::new("sha256");
    /// assert_eq!(config.scheduler(), SchedulerMode::Worker);
    /// assert_eq!(config.feed_size(), 0);
    /// ```
    pub fn new(algorithm: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            feed_size: 0,
            max_block_size: None,
            scheduler: SchedulerMode::Worker,
        }
    }

    /// Sets the in-flight byte ceiling (0 = unbounded).
    ///
    /// The ceiling is exclusive: feeding a blob that would bring the
    /// in-flight total to `size` or beyond is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use digestrs::DigestConfig;
    ///
    /// let config = DigestConfig::new("sha256").with_feed_size(4096);
    /// assert_eq!(config.feed_size(), 4096);
    /// ```
    pub fn with_feed_size(mut self, size: usize) -> Self {
        self.feed_size = size;
        self
    }

    /// Sets an explicit per-call feed clamp.
    ///
    /// Feeds larger than the clamp are sliced; the last-chunk marker is only
    /// presented to the backend on the final slice. Must be non-zero; use
    /// [`DigestConfig::validate`] to check.
    ///
    /// # Example
    ///
    /// ```
    /// use digestrs::DigestConfig;
    ///
    /// let config = DigestConfig::new("sha256").with_max_block_size(8192);
    /// assert_eq!(config.max_block_size(), Some(8192));
    /// ```
    pub fn with_max_block_size(mut self, size: usize) -> Self {
        self.max_block_size = Some(size);
        self
    }

    /// Sets the scheduler mode.
    ///
    /// # Example
    ///
    /// ```
    /// use digestrs::{DigestConfig, SchedulerMode};
    ///
    /// let config = DigestConfig::new("sha256").with_scheduler(SchedulerMode::Poll);
    /// assert_eq!(config.scheduler(), SchedulerMode::Poll);
    /// ```
    pub fn with_scheduler(mut self, mode: SchedulerMode) -> Self {
        self.scheduler = mode;
        self
    }

    /// Returns the algorithm label.
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Returns the in-flight byte ceiling (0 = unbounded).
    pub fn feed_size(&self) -> usize {
        self.feed_size
    }

    /// Returns the explicit per-call feed clamp, if any.
    pub fn max_block_size(&self) -> Option<usize> {
        self.max_block_size
    }

    /// Returns the scheduler mode.
    pub fn scheduler(&self) -> SchedulerMode {
        self.scheduler
    }

    /// Returns the clamp actually applied by the feed driver.
    ///
    /// An explicit clamp always wins; otherwise poll mode falls back to
    /// [`DEFAULT_MAX_FEED_BLOCK_SIZE`] and worker mode applies none.
    pub fn effective_max_block_size(&self) -> Option<usize> {
        match (self.max_block_size, self.scheduler) {
            (Some(size), _) => Some(size),
            (None, SchedulerMode::Poll) => Some(DEFAULT_MAX_FEED_BLOCK_SIZE),
            (None, SchedulerMode::Worker) => None,
        }
    }

    /// Validates the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DigestError::InvalidArgument`] if the explicit block clamp
    /// is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use digestrs::DigestConfig;
    ///
    /// let config = DigestConfig::new("sha256").with_max_block_size(0);
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), DigestError> {
        if self.max_block_size == Some(0) {
            return Err(DigestError::InvalidArgument {
                message: "max block size must be non-zero",
            });
        }
        Ok(())
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self::new("digest")
    }
}
