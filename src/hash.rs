//! Deterministic hashing for element id seeds.
//!
//! Server and client must derive the same ids for the same page, so the
//! hash has to be stable across processes and targets (blake3, not
//! `std::hash`).

/// Builder-style blake3 hasher producing a `u64`.
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update with raw bytes
    #[inline]
    pub fn update(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    /// Update with a length-prefixed string, so `("ab","c")` and
    /// `("a","bc")` hash differently.
    #[inline]
    pub fn update_str(self, s: &str) -> Self {
        self.update_u64(s.len() as u64).update(s.as_bytes())
    }

    #[inline]
    pub fn update_u64(self, v: u64) -> Self {
        self.update(&v.to_le_bytes())
    }

    /// First 8 bytes of the blake3 digest, little-endian.
    #[inline]
    pub fn finish(self) -> u64 {
        let hash = self.inner.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = StableHasher::new().update_str("/index.html").finish();
        let b = StableHasher::new().update_str("/index.html").finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_prefix_separates_fields() {
        let a = StableHasher::new().update_str("ab").update_str("c").finish();
        let b = StableHasher::new().update_str("a").update_str("bc").finish();
        assert_ne!(a, b);
    }
}
