//! Error types for digestrs.
//!
//! This module defines the error type used throughout the crate.
//!
//! - [`DigestError`] - Represents all possible errors surfaced by the engine

use std::fmt;

/// Errors that can occur while driving a message digest.
///
/// `DigestError` covers synchronous rejections from the engine surface
/// (`new`, `feed`) and the asynchronous cancellation status delivered to
/// feed-completion callbacks. Backend transient errors (would-block,
/// interrupted) never surface here; the engine retries them internally.
///
/// # Variants
///
/// - [`DigestError::InvalidArgument`] - Bad input or bad handle state
/// - [`DigestError::Overflow`] - Accumulated in-flight byte count would overflow
/// - [`DigestError::NoSpace`] - The configured feed ceiling would be reached
/// - [`DigestError::Scheduler`] - The worker scheduler could not be started
/// - [`DigestError::Canceled`] - The handle was dropped before the blob was hashed
///
/// # Example
///
/// ```
/// use digestrs::DigestError;
///
/// fn handle_error(err: DigestError) {
///     match err {
///         DigestError::NoSpace { requested, ceiling } => {
///             eprintln!("feed ceiling hit: {} >= {}", requested, ceiling)
///         }
///         DigestError::Canceled => eprintln!("handle dropped before completion"),
///         other => eprintln!("feed rejected: {}", other),
///     }
/// }
/// ```
#[derive(Debug)]
pub enum DigestError {
    /// Bad input or bad handle state.
    ///
    /// Raised when the backend reports a zero digest size, the configuration
    /// fails validation, or a blob is fed after the is_last chunk.
    InvalidArgument {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// The accumulated in-flight byte count would overflow.
    Overflow,

    /// The configured feed ceiling would be reached or exceeded.
    ///
    /// The ceiling is an exclusive upper bound: a submission that would make
    /// the in-flight total equal to the ceiling is rejected.
    NoSpace {
        /// The in-flight total the submission would have produced.
        requested: usize,
        /// The configured ceiling.
        ceiling: usize,
    },

    /// The worker scheduler could not be started.
    ///
    /// Carries the thread-spawn failure. The offending submission is rolled
    /// back; the handle remains usable.
    Scheduler(std::io::Error),

    /// The handle was dropped before the blob reached the backend.
    ///
    /// Delivered asynchronously through `on_feed_done` for every blob still
    /// queued at teardown; never returned synchronously.
    Canceled,
}

impl fmt::Display for DigestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestError::InvalidArgument { message } => {
                write!(f, "invalid argument: {}", message)
            }
            DigestError::Overflow => write!(f, "in-flight byte count overflow"),
            DigestError::NoSpace { requested, ceiling } => {
                write!(f, "feed ceiling reached: {} >= {}", requested, ceiling)
            }
            DigestError::Scheduler(e) => write!(f, "scheduler start failed: {}", e),
            DigestError::Canceled => write!(f, "operation canceled"),
        }
    }
}

impl std::error::Error for DigestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DigestError::Scheduler(e) => Some(e),
            _ => None,
        }
    }
}
