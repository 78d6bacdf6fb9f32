use std::path::PathBuf;

use vram_types::{ContentDigest, ResourceId, TypeError};

/// Errors from resource store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No resource is recorded under this identifier.
    #[error("resource not found: {0}")]
    NotFound(ResourceId),

    /// The metadata lists the resource but its payload file is gone.
    #[error("payload file missing for resource {id}: {}", path.display())]
    MissingPayload { id: ResourceId, path: PathBuf },

    /// Caller-supplied input was rejected before touching storage.
    #[error("validation error: {0}")]
    Validation(String),

    /// Recomputed digest differs from the recorded one (data corruption).
    #[error("integrity check failed for {id}: expected {expected}, computed {computed}")]
    Integrity {
        id: ResourceId,
        expected: ContentDigest,
        computed: ContentDigest,
    },

    /// Stored bytes flagged as compressed could not be decompressed.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// Filesystem failure while reading or writing.
    #[error("storage I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Metadata could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A thread panicked while holding the metadata lock.
    #[error("metadata lock poisoned")]
    LockPoisoned,
}

/// Coarse classification of [`StoreError`], used by transport layers to pick
/// a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Integrity,
    CorruptPayload,
    StorageIo,
    Internal,
}

impl StoreError {
    /// Build an I/O error carrying the path that failed.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::MissingPayload { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Integrity { .. } => ErrorKind::Integrity,
            Self::CorruptPayload(_) => ErrorKind::CorruptPayload,
            Self::Io { .. } => ErrorKind::StorageIo,
            Self::Serialization(_) | Self::LockPoisoned => ErrorKind::Internal,
        }
    }

    /// `true` for both an unknown id and a record whose payload vanished.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ResourceId {
        ResourceId::new("a").unwrap()
    }

    #[test]
    fn missing_payload_counts_as_not_found() {
        let err = StoreError::MissingPayload {
            id: id(),
            path: PathBuf::from("resources/a.bin"),
        };
        assert!(err.is_not_found());
        assert!(StoreError::NotFound(id()).is_not_found());
        assert!(!StoreError::Validation("x".into()).is_not_found());
    }

    #[test]
    fn kinds() {
        let digest = ContentDigest::from_hash([0; 32]);
        let integrity = StoreError::Integrity {
            id: id(),
            expected: digest,
            computed: digest,
        };
        assert_eq!(integrity.kind(), ErrorKind::Integrity);
        assert_eq!(
            StoreError::CorruptPayload("bad".into()).kind(),
            ErrorKind::CorruptPayload
        );
        let io = StoreError::io("x", std::io::Error::other("disk full"));
        assert_eq!(io.kind(), ErrorKind::StorageIo);
        assert_eq!(StoreError::LockPoisoned.kind(), ErrorKind::Internal);
    }

    #[test]
    fn io_display_names_path() {
        let err = StoreError::io("resources/a.bin", std::io::Error::other("disk full"));
        let msg = err.to_string();
        assert!(msg.contains("resources/a.bin"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn type_error_becomes_validation() {
        let err: StoreError = ResourceId::new("").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
