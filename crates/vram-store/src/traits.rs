use vram_types::ResourceId;

use crate::error::StoreResult;
use crate::record::{
    FetchedResource, ResourceInfo, ResourceSummary, StorageStats, StoreOptions, StoreReceipt,
};

/// Named, versioned, integrity-checked resource storage.
///
/// All implementations must satisfy these invariants:
/// - A failed operation leaves records and versions as they were.
/// - Versions start at 1 and grow by exactly 1 per successful store.
/// - Data whose digest does not match its record is never returned.
/// - Only resources listed in the metadata are ever served.
pub trait ResourceStore: Send + Sync {
    /// Store `data` under `id`, replacing any previous resource of that id.
    fn store(&self, id: &ResourceId, data: &[u8], options: &StoreOptions)
        -> StoreResult<StoreReceipt>;

    /// Read, decompress and verify a resource, recording the access.
    fn get(&self, id: &ResourceId) -> StoreResult<FetchedResource>;

    /// Metadata and version without reading the payload or recording an access.
    fn info(&self, id: &ResourceId) -> StoreResult<ResourceInfo>;

    /// Summaries of all resources, most recently accessed first.
    fn list(&self, type_filter: Option<&str>) -> StoreResult<Vec<ResourceSummary>>;

    /// Current version of `id`.
    fn check_version(&self, id: &ResourceId) -> StoreResult<u64>;

    /// Remove a resource. Returns `true` if it existed.
    fn delete(&self, id: &ResourceId) -> StoreResult<bool>;

    /// Totals over current metadata. Payload files are not scanned.
    fn stats(&self) -> StoreResult<StorageStats>;
}
