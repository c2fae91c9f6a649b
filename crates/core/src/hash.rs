//! Blake3 digest primitive shared by every commitment in the chain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit digest.
pub type H256 = [u8; 32];

/// Number of hex digits in a rendered digest.
pub const HASH_HEX_LEN: usize = 64;

/// A 256-bit digest with lowercase hex rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The zero hash (all zeros).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a new Hash from raw bytes.
    pub fn from_bytes(bytes: H256) -> Self {
        Self(bytes)
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a lowercase hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let arr: H256 = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Count the leading zero hex digits of the rendered digest.
    pub fn leading_zero_nibbles(&self) -> usize {
        let mut total = 0;
        for byte in self.0 {
            if byte == 0 {
                total += 2;
                continue;
            }
            if byte >> 4 == 0 {
                total += 1;
            }
            break;
        }
        total
    }

    /// Whether the hex rendering starts with `difficulty` zero digits.
    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        self.leading_zero_nibbles() >= difficulty
    }

    /// First `n` hex digits, for compact log lines.
    pub fn short_hex(&self, n: usize) -> String {
        let mut s = self.to_hex();
        s.truncate(n.min(HASH_HEX_LEN));
        s
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}..)", self.short_hex(8))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl From<Hash> for H256 {
    fn from(hash: Hash) -> Self {
        hash.0
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Hash arbitrary data using Blake3.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}

/// Hash multiple pieces of data as if they were concatenated.
pub fn hash_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    Hash(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        assert_eq!(hash(data), hash(data));
    }

    #[test]
    fn test_hash_different_inputs() {
        assert_ne!(hash(b"hello"), hash(b"world"));
    }

    #[test]
    fn test_hash_hex_roundtrip() {
        let h = hash(b"test data");
        let hex_str = h.to_hex();
        assert_eq!(hex_str.len(), HASH_HEX_LEN);
        assert_eq!(Hash::from_hex(&hex_str).unwrap(), h);
        assert_eq!(Hash::from_hex(&format!("0x{hex_str}")).unwrap(), h);
    }

    #[test]
    fn test_from_hex_wrong_length() {
        assert!(Hash::from_hex("abcd").is_err());
    }

    #[test]
    fn test_display_is_plain_lowercase_hex() {
        let h = hash(b"test");
        let display = h.to_string();
        assert_eq!(display.len(), HASH_HEX_LEN);
        assert!(display.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_hash_concat() {
        assert_eq!(hash_concat(&[b"hello", b"world"]), hash(b"helloworld"));
    }

    #[test]
    fn test_leading_zero_nibbles() {
        assert_eq!(Hash::ZERO.leading_zero_nibbles(), 64);

        let mut bytes = [0xffu8; 32];
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 0);

        bytes[0] = 0x0f;
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 1);

        bytes[0] = 0x00;
        bytes[1] = 0x10;
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 2);

        bytes[1] = 0x01;
        assert_eq!(Hash(bytes).leading_zero_nibbles(), 3);
    }

    #[test]
    fn test_meets_difficulty_matches_hex_prefix() {
        for i in 0u32..64 {
            let h = hash(&i.to_le_bytes());
            let zeros = h.to_hex().chars().take_while(|c| *c == '0').count();
            assert!(h.meets_difficulty(zeros));
            assert!(!h.meets_difficulty(zeros + 1));
            assert!(h.meets_difficulty(0));
        }
    }
}
