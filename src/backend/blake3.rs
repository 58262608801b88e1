//! BLAKE3 reference backend.
//!
//! Wraps the `blake3` crate's incremental hasher behind the
//! [`DigestBackend`] contract. BLAKE3 computes in memory, so feeds are
//! always fully accepted; the finished 32-byte digest is drained through
//! `read_digest` like any stream-oriented backend.

use std::io;

use crate::backend::DigestBackend;

/// A [`DigestBackend`] computing BLAKE3.
///
/// Feeds never block and are never partial. `read_digest` reports
/// [`io::ErrorKind::WouldBlock`] until the last chunk has been fed, then
/// drains the 32-byte digest, honoring short output slices.
///
/// # Example
///
/// ```
/// use digestrs::{Blake3Backend, DigestBackend};
///
/// let mut backend = Blake3Backend::new();
/// backend.feed(b"hello world", true).unwrap();
///
/// let mut out = [0u8; 32];
/// let n = backend.read_digest(&mut out).unwrap();
/// assert_eq!(n, 32);
/// assert_eq!(out, *blake3::hash(b"hello world").as_bytes());
/// ```
#[derive(Debug, Clone)]
pub struct Blake3Backend {
    hasher: blake3::Hasher,
    digest: Option<[u8; 32]>,
    read_pos: usize,
}

impl Blake3Backend {
    /// Creates a backend with default BLAKE3 parameters.
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
            digest: None,
            read_pos: 0,
        }
    }

    /// Creates a backend for keyed hashing.
    ///
    /// Keyed hashing uses a 32-byte key so that only key holders can verify
    /// or forge digests.
    ///
    /// # Arguments
    ///
    /// * `key` - A 32-byte key for the keyed hash
    pub fn new_keyed(key: &[u8; 32]) -> Self {
        Self {
            hasher: blake3::Hasher::new_keyed(key),
            digest: None,
            read_pos: 0,
        }
    }
}

impl DigestBackend for Blake3Backend {
    fn digest_size(&self) -> usize {
        32
    }

    fn feed(&mut self, data: &[u8], is_last: bool) -> io::Result<usize> {
        self.hasher.update(data);
        if is_last {
            self.digest = Some(*self.hasher.finalize().as_bytes());
        }
        Ok(data.len())
    }

    fn read_digest(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let digest = self.digest.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::WouldBlock, "digest not finalized")
        })?;
        let n = out.len().min(digest.len() - self.read_pos);
        out[..n].copy_from_slice(&digest[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Ok(n)
    }
}

impl Default for Blake3Backend {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut backend = Blake3Backend::new();
        backend.feed(b"hello ", false).unwrap();
        backend.feed(b"world", true).unwrap();

        let mut out = [0u8; 32];
        assert_eq!(backend.read_digest(&mut out).unwrap(), 32);
        assert_eq!(out, *blake3::hash(b"hello world").as_bytes());
    }

    #[test]
    fn test_read_before_finalize_would_block() {
        let mut backend = Blake3Backend::new();
        backend.feed(b"partial", false).unwrap();

        let mut out = [0u8; 32];
        let err = backend.read_digest(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_partial_digest_reads() {
        let mut backend = Blake3Backend::new();
        backend.feed(b"data", true).unwrap();

        // Drain in 7-byte slices
        let mut out = [0u8; 32];
        let mut offset = 0;
        while offset < 32 {
            let end = (offset + 7).min(32);
            let n = backend.read_digest(&mut out[offset..end]).unwrap();
            assert!(n > 0, "finalized digest reads must make progress");
            offset += n;
        }
        assert_eq!(out, *blake3::hash(b"data").as_bytes());
    }

    #[test]
    fn test_keyed_differs_from_unkeyed() {
        let mut plain = Blake3Backend::new();
        plain.feed(b"data", true).unwrap();
        let mut keyed = Blake3Backend::new_keyed(&[0x42u8; 32]);
        keyed.feed(b"data", true).unwrap();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        plain.read_digest(&mut a).unwrap();
        keyed.read_digest(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
