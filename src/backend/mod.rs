//! Pluggable hashing backends.
//!
//! A backend is the component that actually computes a digest. The engine is
//! backend-agnostic: it slices pending blobs, retries partial writes, and
//! drains the finished digest, but never interprets the bytes.
//!
//! - [`DigestBackend`] - The contract between the engine and a hash implementation
//! - [`Blake3Backend`] - BLAKE3 reference backend (requires `hash-blake3`)

#[cfg(feature = "hash-blake3")]
mod blake3;

#[cfg(feature = "hash-blake3")]
pub use self::blake3::Blake3Backend;

use std::io;

/// The contract between the engine and a hash implementation.
///
/// Backends mirror stream-oriented crypto interfaces (kernel-crypto sockets
/// being the motivating case): writes may be partially accepted, reads may be
/// partial, and either call may report that it would block. The engine owns
/// the retry loop; the backend owns the hash state.
///
/// # Return discipline
///
/// Both [`feed`](DigestBackend::feed) and
/// [`read_digest`](DigestBackend::read_digest) return the number of bytes
/// accepted or produced, which may be less than the slice length.
/// [`io::ErrorKind::WouldBlock`] and [`io::ErrorKind::Interrupted`] mean
/// "retry later" and are silently absorbed by the engine; any other error is
/// logged and the call is re-attempted. The engine has no policy to fail a
/// digest; a persistently failing backend is abandoned by dropping the
/// handle.
///
/// # Blocking
///
/// Under [`SchedulerMode::Worker`](crate::SchedulerMode::Worker) the backend
/// runs on a dedicated thread and may block. Under
/// [`SchedulerMode::Poll`](crate::SchedulerMode::Poll) it runs on the main
/// loop and must return `WouldBlock` instead.
///
/// # Cleanup
///
/// Resource release is the backend's `Drop` impl, which runs exactly once,
/// when the last internal reference to the handle goes away.
///
/// # Example
///
/// ```
/// use std::io;
/// use digestrs::DigestBackend;
///
/// /// Sum of all fed bytes, little-endian.
/// struct Sum32 {
///     sum: u32,
///     digest: Option<[u8; 4]>,
///     read_pos: usize,
/// }
///
/// impl DigestBackend for Sum32 {
///     fn digest_size(&self) -> usize {
///         4
///     }
///
///     fn feed(&mut self, data: &[u8], is_last: bool) -> io::Result<usize> {
///         self.sum = data.iter().fold(self.sum, |s, &b| s.wrapping_add(b as u32));
///         if is_last {
///             self.digest = Some(self.sum.to_le_bytes());
///         }
///         Ok(data.len())
///     }
///
///     fn read_digest(&mut self, out: &mut [u8]) -> io::Result<usize> {
///         let digest = self.digest.as_ref().ok_or_else(|| {
///             io::Error::new(io::ErrorKind::WouldBlock, "digest not finalized")
///         })?;
///         let n = out.len().min(digest.len() - self.read_pos);
///         out[..n].copy_from_slice(&digest[self.read_pos..self.read_pos + n]);
///         self.read_pos += n;
///         Ok(n)
///     }
/// }
/// ```
pub trait DigestBackend {
    /// Returns the digest size in bytes.
    ///
    /// Must be non-zero and constant for the lifetime of the backend; the
    /// engine allocates the output blob at exactly this size.
    fn digest_size(&self) -> usize;

    /// Feeds a chunk of the input stream.
    ///
    /// `is_last` marks the final chunk of the whole stream. The engine
    /// guarantees it is true at most once across all calls, on the final
    /// slice of the final blob; a clamped slice is never marked last.
    ///
    /// Returns the number of bytes accepted, `0..=data.len()`. Unaccepted
    /// bytes are re-offered on the next call (with `is_last` preserved).
    fn feed(&mut self, data: &[u8], is_last: bool) -> io::Result<usize>;

    /// Reads the next portion of the finished digest into `out`.
    ///
    /// Called only after a feed with `is_last == true` has been fully
    /// accepted, repeatedly, until [`digest_size`](DigestBackend::digest_size)
    /// bytes have been produced in total.
    fn read_digest(&mut self, out: &mut [u8]) -> io::Result<usize>;
}

/// Whether a backend error belongs to the silent-retry class.
pub(crate) fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
