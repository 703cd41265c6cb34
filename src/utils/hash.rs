//! Name hashing (StringHash)
//!
//! Bones and morph targets are looked up by a 32-bit hash of their name so
//! that matching across skeletons and morph lists with different ordering is
//! an integer comparison.
//!
//! The hash is the low 32 bits of xxh3-64, which is stable across runs and
//! platforms.

use std::fmt;

use xxhash_rust::xxh3::xxh3_64;

/// Compact, stable hash of a name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StringHash(u32);

impl StringHash {
    /// Hash of the empty string.
    pub const EMPTY: StringHash = StringHash(0);

    /// Hashes a name.
    ///
    /// The empty string always maps to [`StringHash::EMPTY`].
    #[inline]
    #[must_use]
    pub fn new(s: &str) -> Self {
        if s.is_empty() {
            return Self::EMPTY;
        }
        Self(xxh3_64(s.as_bytes()) as u32)
    }

    /// Wraps an already computed hash value.
    #[inline]
    #[must_use]
    pub const fn from_value(value: u32) -> Self {
        Self(value)
    }

    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<&str> for StringHash {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for StringHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringHash({:#010x})", self.0)
    }
}
