use thiserror::Error;
use vram_store::{ErrorKind, StoreError};
use vram_types::TypeError;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Store(#[from] StoreError),
}

impl ProtocolError {
    /// HTTP-style status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Store(e) => match e.kind() {
                ErrorKind::NotFound => 404,
                ErrorKind::Validation => 400,
                ErrorKind::Integrity
                | ErrorKind::CorruptPayload
                | ErrorKind::StorageIo
                | ErrorKind::Internal => 500,
            },
        }
    }
}

impl From<TypeError> for ProtocolError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
