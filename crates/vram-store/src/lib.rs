//! Resource storage for VRAM.
//!
//! Clients submit named binary resources; the store keeps each one as a
//! payload file (optionally compressed), records its digest, size, version
//! and usage in a single metadata document, and serves it back only after
//! the digest checks out.
//!
//! # Components
//!
//! - [`Compressor`] -- reversible zstd/gzip transform, codec detected on read
//! - [`MetadataStore`] -- `id -> record` and `id -> version`, saved atomically
//! - [`ResourceManager`] -- file-backed [`ResourceStore`] tying it together
//!
//! # Design Rules
//!
//! 1. Metadata is the only authority on which resources exist; payload files
//!    it does not list are never served.
//! 2. Payload first, metadata second: a failed write leaves the previous
//!    record and version in place.
//! 3. A digest mismatch or undecodable payload is an error, never data.
//! 4. Unusable metadata on startup degrades to an empty store with a warning.

pub mod codec;
pub mod config;
pub mod error;
pub mod manager;
pub mod metadata;
pub mod record;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use codec::Compressor;
pub use config::{Codec, CompressionConfig, StoreConfig};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use manager::ResourceManager;
pub use metadata::{MetadataStore, Recovery};
pub use record::{
    FetchedResource, ResourceInfo, ResourceRecord, ResourceSummary, StorageStats, StoreOptions,
    StoreReceipt, VerifyReport, DEFAULT_PRIORITY, DEFAULT_RESOURCE_TYPE,
};
pub use traits::ResourceStore;
pub use vram_types::{ContentDigest, ResourceId};
