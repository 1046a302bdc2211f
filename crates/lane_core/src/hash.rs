//! Portable state hashing.
//!
//! `std`'s `DefaultHasher` may change between Rust releases, which would
//! invalidate every stored replay hash. [`StateHasher`] is 64-bit FNV-1a
//! over little-endian bytes, with `usize`/`isize` widened to 64 bits, so
//! a hash recorded on one build and platform verifies on any other.
//!
//! Not cryptographically secure; only used for equality checks.

use std::hash::Hasher;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Deterministic 64-bit FNV-1a [`Hasher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHasher {
    hash: u64,
}

impl StateHasher {
    /// Create a hasher at the FNV-1a offset basis.
    #[must_use]
    pub const fn new() -> Self {
        Self { hash: FNV_OFFSET }
    }
}

impl Default for StateHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for StateHasher {
    fn finish(&self) -> u64 {
        self.hash
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.hash = (self.hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME);
        }
    }

    fn write_u8(&mut self, i: u8) {
        self.write(&[i]);
    }

    fn write_u16(&mut self, i: u16) {
        self.write(&i.to_le_bytes());
    }

    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_u128(&mut self, i: u128) {
        self.write(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn write_i8(&mut self, i: i8) {
        self.write(&i.to_le_bytes());
    }

    fn write_i16(&mut self, i: i16) {
        self.write(&i.to_le_bytes());
    }

    fn write_i32(&mut self, i: i32) {
        self.write(&i.to_le_bytes());
    }

    fn write_i64(&mut self, i: i64) {
        self.write(&i.to_le_bytes());
    }

    fn write_i128(&mut self, i: i128) {
        self.write(&i.to_le_bytes());
    }

    fn write_isize(&mut self, i: isize) {
        self.write_i64(i as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hash;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = StateHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_known_fnv1a_values() {
        assert_eq!(StateHasher::new().finish(), 0xcbf2_9ce4_8422_2325);

        let mut hasher = StateHasher::new();
        hasher.write(b"a");
        assert_eq!(hasher.finish(), 0xaf63_dc4c_8601_ec8c);

        let mut hasher = StateHasher::new();
        hasher.write(b"foobar");
        assert_eq!(hasher.finish(), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn test_integers_hash_as_little_endian() {
        let mut bytes = StateHasher::new();
        bytes.write(&[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(hash_of(&0x1234_5678_u32), bytes.finish());
    }

    #[test]
    fn test_usize_widens_to_u64() {
        assert_eq!(hash_of(&7usize), hash_of(&7u64));
        assert_eq!(hash_of(&-3isize), hash_of(&-3i64));
    }

    #[test]
    fn test_order_matters() {
        assert_ne!(hash_of(&(1u32, 2u32)), hash_of(&(2u32, 1u32)));
    }
}
