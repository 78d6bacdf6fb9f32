//! File-backed resource manager.
//!
//! Layout under the resources directory:
//!
//! ```text
//! resources/
//!   metadata.json     records + versions for every live resource
//!   <id>.bin          stored bytes (compressed or raw) for each live id
//! ```
//!
//! A single mutex guards the metadata store and is held across each payload
//! read or write together with the metadata update that accompanies it.
//! Incoming payloads are hashed, compressed and staged in a temp file before
//! the lock is taken. A store saves metadata first and only then renames the
//! staged file into place.

use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SubsecRound, Utc};
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use vram_crypto::ContentHasher;
use vram_types::ResourceId;

use crate::codec::Compressor;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::metadata::{MetadataStore, Recovery};
use crate::record::{
    FetchedResource, ResourceInfo, ResourceRecord, ResourceSummary, StorageStats, StoreOptions,
    StoreReceipt, VerifyReport,
};
use crate::traits::ResourceStore;

/// Extension of payload files.
pub const PAYLOAD_EXTENSION: &str = "bin";
/// Prefix of in-flight temporary files in the resources directory.
const TEMP_PREFIX: &str = ".tmp";

/// Timestamps are kept at the precision they serialize with, so a record
/// compares equal before and after a metadata round trip.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Resource manager backed by a directory of payload files and one
/// metadata document.
pub struct ResourceManager {
    config: StoreConfig,
    compressor: Compressor,
    metadata: Mutex<MetadataStore>,
}

impl ResourceManager {
    /// Open (or create) the store described by `config`.
    ///
    /// Fails only if the resources directory cannot be created. Unusable
    /// metadata is replaced by an empty store, see [`MetadataStore::load`].
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.resources_dir)
            .map_err(|e| StoreError::io(&config.resources_dir, e))?;

        let metadata = MetadataStore::load(config.metadata_path(), config.sync_writes);
        info!(
            dir = %config.resources_dir.display(),
            resources = metadata.len(),
            codec = %config.compression.codec,
            "resource store opened"
        );

        Ok(Self {
            compressor: Compressor::new(config.compression.clone()),
            metadata: Mutex::new(metadata),
            config,
        })
    }

    /// Open a store in `dir` with default settings.
    pub fn at_path(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open(StoreConfig::with_resources_dir(dir))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Path of the payload file for `id`.
    pub fn payload_path(&self, id: &ResourceId) -> PathBuf {
        self.config
            .resources_dir
            .join(format!("{id}.{PAYLOAD_EXTENSION}"))
    }

    /// Why the metadata was discarded on open, if it was.
    pub fn recovery(&self) -> StoreResult<Option<Recovery>> {
        Ok(self.lock()?.recovery().cloned())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, MetadataStore>> {
        self.metadata.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Write `bytes` to a temp file in the resources directory. The caller
    /// renames it into place once the metadata agrees, so a reader sees
    /// either the previous payload or the complete new one.
    fn stage_payload(&self, bytes: &[u8]) -> StoreResult<NamedTempFile> {
        let dir = &self.config.resources_dir;
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| StoreError::io(dir, e))?;
        tmp.write_all(bytes)
            .map_err(|e| StoreError::io(tmp.path(), e))?;
        if self.config.sync_writes {
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        Ok(tmp)
    }

    /// Read the stored bytes of a live resource and undo compression and
    /// verify the digest. Does not touch access stats.
    fn load_verified(&self, id: &ResourceId, record: &ResourceRecord) -> StoreResult<Vec<u8>> {
        let path = self.payload_path(id);
        let stored = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                warn!(id = %id, path = %path.display(), "live resource has no payload file");
                return Err(StoreError::MissingPayload { id: id.clone(), path });
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };

        if record.compressed && stored.len() as u64 != record.compressed_size {
            error!(
                id = %id,
                expected = record.compressed_size,
                actual = stored.len(),
                "stored payload has the wrong length"
            );
            return Err(StoreError::CorruptPayload(format!(
                "{id}: expected {} stored bytes, found {}",
                record.compressed_size,
                stored.len()
            )));
        }

        let data = if record.compressed {
            self.compressor.decompress(&stored).inspect_err(|e| {
                error!(id = %id, error = %e, "stored payload failed to decompress");
            })?
        } else {
            stored
        };

        if !ContentHasher::verify(&data, &record.hash) {
            let computed = ContentHasher::hash(&data);
            error!(
                id = %id,
                expected = %record.hash.short_hex(),
                computed = %computed.short_hex(),
                "hash mismatch"
            );
            return Err(StoreError::Integrity {
                id: id.clone(),
                expected: record.hash,
                computed,
            });
        }
        Ok(data)
    }

    /// Re-read and check one resource without recording an access.
    pub fn verify(&self, id: &ResourceId) -> StoreResult<()> {
        let metadata = self.lock()?;
        let record = metadata
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.load_verified(id, record).map(|_| ())
    }

    /// Check every live resource. I/O failures other than a missing payload
    /// abort the sweep.
    pub fn verify_all(&self) -> StoreResult<VerifyReport> {
        let metadata = self.lock()?;
        let mut report = VerifyReport::default();
        for (id, record, _) in metadata.iter() {
            match self.load_verified(id, record) {
                Ok(_) => report.ok.push(id.clone()),
                Err(StoreError::MissingPayload { .. }) => report.missing.push(id.clone()),
                Err(StoreError::Integrity { .. }) | Err(StoreError::CorruptPayload(_)) => {
                    report.corrupt.push(id.clone())
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            ok = report.ok.len(),
            missing = report.missing.len(),
            corrupt = report.corrupt.len(),
            "verification finished"
        );
        Ok(report)
    }

    /// Delete payload files the metadata does not list, and temp files left
    /// behind by interrupted writes. Returns the removed paths.
    pub fn prune_orphans(&self) -> StoreResult<Vec<PathBuf>> {
        let metadata = self.lock()?;
        let dir = &self.config.resources_dir;
        let mut removed = Vec::new();

        for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() || path == metadata.path() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let orphan = if name.starts_with(TEMP_PREFIX) {
                true
            } else if let Some(stem) = name.strip_suffix(&format!(".{PAYLOAD_EXTENSION}")) {
                ResourceId::new(stem)
                    .map(|id| !metadata.contains(&id))
                    .unwrap_or(true)
            } else {
                false
            };

            if orphan {
                fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
                warn!(path = %path.display(), "removed orphaned file");
                removed.push(path);
            }
        }
        Ok(removed)
    }
}

impl ResourceStore for ResourceManager {
    fn store(
        &self,
        id: &ResourceId,
        data: &[u8],
        options: &StoreOptions,
    ) -> StoreResult<StoreReceipt> {
        let hash = ContentHasher::hash(data);
        let compressed_bytes;
        let storage: &[u8] = if options.compress {
            compressed_bytes = self.compressor.compress(data)?;
            &compressed_bytes
        } else {
            data
        };

        let staged = self.stage_payload(storage).inspect_err(|e| {
            error!(id = %id, error = %e, "failed to write payload");
        })?;

        let mut metadata = self.lock()?;
        let prior = metadata.snapshot(id);
        let record = ResourceRecord::new(
            options.resource_type.clone(),
            data.len() as u64,
            storage.len() as u64,
            hash,
            options.compress,
            options.priority,
            now(),
        );
        let version = metadata.put(id.clone(), record);
        // Metadata first: if it cannot be saved, the staged file is dropped
        // and the previous payload is still in place.
        if let Err(e) = metadata.save() {
            error!(id = %id, error = %e, "failed to save metadata; rolling back");
            metadata.restore(id, prior);
            return Err(e);
        }

        let path = self.payload_path(id);
        if let Err(e) = staged.persist(&path) {
            error!(id = %id, error = %e.error, "failed to move payload into place; rolling back");
            metadata.restore(id, prior);
            if let Err(save_err) = metadata.save() {
                error!(id = %id, error = %save_err, "failed to save rolled-back metadata");
            }
            return Err(StoreError::io(path, e.error));
        }

        info!(
            id = %id,
            size = data.len(),
            compressed_size = storage.len(),
            version,
            "stored resource"
        );
        Ok(StoreReceipt {
            resource_id: id.clone(),
            size: data.len() as u64,
            compressed_size: storage.len() as u64,
            version,
            hash,
        })
    }

    fn get(&self, id: &ResourceId) -> StoreResult<FetchedResource> {
        let mut metadata = self.lock()?;
        let record = metadata
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let data = self.load_verified(id, &record)?;

        let mut updated = record.clone();
        updated.touch(now());
        if let Some(slot) = metadata.get_mut(id) {
            *slot = updated.clone();
        }
        if let Err(e) = metadata.save() {
            if let Some(slot) = metadata.get_mut(id) {
                *slot = record;
            }
            return Err(e);
        }

        debug!(id = %id, size = data.len(), access_count = updated.access_count, "retrieved resource");
        Ok(FetchedResource {
            id: id.clone(),
            data,
            record: updated,
        })
    }

    fn info(&self, id: &ResourceId) -> StoreResult<ResourceInfo> {
        let metadata = self.lock()?;
        let record = metadata
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(ResourceInfo {
            resource_id: id.clone(),
            metadata: record.clone(),
            version: metadata.version(id).unwrap_or(1),
        })
    }

    fn list(&self, type_filter: Option<&str>) -> StoreResult<Vec<ResourceSummary>> {
        let metadata = self.lock()?;
        let mut summaries: Vec<ResourceSummary> = metadata
            .iter()
            .filter(|(_, record, _)| type_filter.map_or(true, |t| record.resource_type == t))
            .map(|(id, record, version)| ResourceSummary::new(id.clone(), record, version))
            .collect();
        // Stable sort: equal timestamps keep id order.
        summaries.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed));
        Ok(summaries)
    }

    fn check_version(&self, id: &ResourceId) -> StoreResult<u64> {
        self.lock()?
            .version(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn delete(&self, id: &ResourceId) -> StoreResult<bool> {
        let mut metadata = self.lock()?;
        let Some(prior) = metadata.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = metadata.save() {
            error!(id = %id, error = %e, "failed to save metadata; rolling back delete");
            metadata.restore(id, Some(prior));
            return Err(e);
        }

        // The resource is gone once metadata says so; a leftover file is an
        // orphan for prune_orphans.
        let path = self.payload_path(id);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => warn!(id = %id, error = %e, "could not remove payload file"),
        }

        info!(id = %id, "deleted resource");
        Ok(true)
    }

    fn stats(&self) -> StoreResult<StorageStats> {
        let metadata = self.lock()?;
        Ok(StorageStats::from_records(metadata.records()))
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("resources_dir", &self.config.resources_dir)
            .field("codec", &self.compressor.codec())
            .finish()
    }
}
