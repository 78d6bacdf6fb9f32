use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Length of a digest in bytes (256 bits).
pub const DIGEST_LEN: usize = 32;

/// Integrity digest of a resource payload.
///
/// The digest is always computed over the original (uncompressed) bytes, so
/// the same payload yields the same digest whether or not it was stored
/// compressed. It serializes as a 64-character lowercase hex string, which is
/// the form kept in `metadata.json`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Wrap a pre-computed 32-byte digest.
    pub const fn from_hash(hash: [u8; DIGEST_LEN]) -> Self {
        Self(hash)
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters), for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string. Upper-case input is accepted.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(TypeError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.short_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; DIGEST_LEN]> for ContentDigest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn display_is_full_hex() {
        let digest = ContentDigest::from_hash([0xab; 32]);
        let display = format!("{digest}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, "ab".repeat(32));
    }

    #[test]
    fn short_hex_is_8_chars() {
        let digest = ContentDigest::from_hash([0x01; 32]);
        assert_eq!(digest.short_hex(), "01010101");
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        let err = ContentDigest::from_hex("abcd").unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 32, actual: 2 });
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        let err = ContentDigest::from_hex(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn from_hex_accepts_uppercase() {
        let digest = ContentDigest::from_hex(&"AB".repeat(32)).unwrap();
        assert_eq!(digest, ContentDigest::from_hash([0xab; 32]));
    }

    #[test]
    fn serializes_as_hex_string() {
        let digest = ContentDigest::from_hash([0x0f; 32]);
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", "0f".repeat(32)));
        let parsed: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn deserialize_rejects_garbage() {
        let result: Result<ContentDigest, _> = serde_json::from_str("\"not-a-digest\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn hex_roundtrip(bytes in proptest::array::uniform32(any::<u8>())) {
            let digest = ContentDigest::from_hash(bytes);
            let parsed: ContentDigest = digest.to_hex().parse().unwrap();
            prop_assert_eq!(parsed, digest);
        }
    }
}
