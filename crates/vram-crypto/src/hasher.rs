use sha2::{Digest, Sha256};
use vram_types::ContentDigest;

/// SHA-256 content hasher.
///
/// Digests are plain SHA-256 over the payload bytes with no domain prefix,
/// so a digest recorded in `metadata.json` can be checked with any standard
/// `sha256sum` against the original payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Hash a payload.
    pub fn hash(data: &[u8]) -> ContentDigest {
        ContentDigest::from_hash(Sha256::digest(data).into())
    }

    /// Verify that data produces the expected digest.
    pub fn verify(data: &[u8], expected: &ContentDigest) -> bool {
        Self::hash(data) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(
            ContentHasher::hash(b"hello world"),
            ContentHasher::hash(b"hello world")
        );
    }

    #[test]
    fn known_vector_hello_world() {
        assert_eq!(
            ContentHasher::hash(b"hello world").to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn known_vector_empty() {
        assert_eq!(
            ContentHasher::hash(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn different_data_produces_different_digests() {
        assert_ne!(ContentHasher::hash(b"hello"), ContentHasher::hash(b"world"));
    }

    #[test]
    fn verify_detects_tampering() {
        let digest = ContentHasher::hash(b"original");
        assert!(ContentHasher::verify(b"original", &digest));
        assert!(!ContentHasher::verify(b"tampered", &digest));
    }
}
