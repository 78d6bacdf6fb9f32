//! The metadata store: the single source of truth for which resources exist.
//!
//! Both mappings (`id -> record` and `id -> version`) live in one JSON
//! document and are always written together:
//!
//! ```text
//! {
//!   "resources": { "<id>": { "type": ..., "size": ..., ... } },
//!   "versions":  { "<id>": 3 }
//! }
//! ```
//!
//! The document is held fully in memory. Every save rewrites it through a
//! temporary file in the same directory followed by a rename, so a crash
//! mid-save leaves either the old or the new document on disk.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vram_types::ResourceId;

use crate::error::{StoreError, StoreResult};
use crate::record::ResourceRecord;

/// On-disk shape as read, keyed by raw strings so one bad key cannot sink
/// the whole file.
#[derive(Deserialize)]
struct MetadataDocument {
    #[serde(default)]
    resources: BTreeMap<String, ResourceRecord>,
    #[serde(default)]
    versions: BTreeMap<String, u64>,
}

/// On-disk shape as written.
#[derive(Serialize)]
struct MetadataDocumentRef<'a> {
    resources: &'a BTreeMap<ResourceId, ResourceRecord>,
    versions: &'a BTreeMap<ResourceId, u64>,
}

/// Why [`MetadataStore::load`] fell back to an empty store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recovery {
    /// The file could not be read.
    Unreadable(String),
    /// The file was read but is not a valid metadata document.
    Unparseable(String),
}

/// In-memory mirror of the metadata file.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    resources: BTreeMap<ResourceId, ResourceRecord>,
    versions: BTreeMap<ResourceId, u64>,
    sync_writes: bool,
    recovery: Option<Recovery>,
}

impl MetadataStore {
    /// Empty store that will save to `path`.
    pub fn empty(path: impl Into<PathBuf>, sync_writes: bool) -> Self {
        Self {
            path: path.into(),
            resources: BTreeMap::new(),
            versions: BTreeMap::new(),
            sync_writes,
            recovery: None,
        }
    }

    /// Load the metadata file at `path`.
    ///
    /// Never fails: a missing file yields an empty store, and an unreadable
    /// or unparseable one yields an empty store plus a warning and a
    /// [`Recovery`] note. Records and versions that lost their partner are
    /// repaired so both mappings carry the same ids.
    pub fn load(path: impl Into<PathBuf>, sync_writes: bool) -> Self {
        let mut store = Self::empty(path, sync_writes);

        let contents = match fs::read(&store.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %store.path.display(), "no metadata file; starting empty");
                return store;
            }
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "metadata file unreadable; starting with empty metadata"
                );
                store.recovery = Some(Recovery::Unreadable(e.to_string()));
                return store;
            }
        };

        let doc: MetadataDocument = match serde_json::from_slice(&contents) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    path = %store.path.display(),
                    error = %e,
                    "metadata file unparseable; starting with empty metadata"
                );
                store.recovery = Some(Recovery::Unparseable(e.to_string()));
                return store;
            }
        };

        for (key, record) in doc.resources {
            match ResourceId::new(key) {
                Ok(id) => {
                    store.resources.insert(id, record);
                }
                Err(e) => warn!(error = %e, "dropping metadata record with invalid id"),
            }
        }
        for (key, version) in doc.versions {
            if let Ok(id) = ResourceId::new(key) {
                store.versions.insert(id, version);
            }
        }
        store.reconcile();

        debug!(
            path = %store.path.display(),
            resources = store.resources.len(),
            "metadata loaded"
        );
        store
    }

    /// Restore the pairing of records and versions.
    fn reconcile(&mut self) {
        let resources = &self.resources;
        self.versions.retain(|id, _| {
            let keep = resources.contains_key(id);
            if !keep {
                warn!(id = %id, "dropping version without a resource record");
            }
            keep
        });
        for id in self.resources.keys() {
            if !self.versions.contains_key(id) {
                warn!(id = %id, "resource record had no version; assuming 1");
                self.versions.insert(id.clone(), 1);
            }
        }
    }

    /// Persist both mappings, replacing the previous file atomically.
    pub fn save(&self) -> StoreResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        {
            let doc = MetadataDocumentRef {
                resources: &self.resources,
                versions: &self.versions,
            };
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &doc)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            writer.flush().map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        if self.sync_writes {
            tmp.as_file()
                .sync_all()
                .map_err(|e| StoreError::io(tmp.path(), e))?;
        }
        tmp.persist(&self.path)
            .map_err(|e| StoreError::io(&self.path, e.error))?;

        debug!(path = %self.path.display(), resources = self.resources.len(), "metadata saved");
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set when the last load discarded an unusable file.
    pub fn recovery(&self) -> Option<&Recovery> {
        self.recovery.as_ref()
    }

    pub fn get(&self, id: &ResourceId) -> Option<&ResourceRecord> {
        self.resources.get(id)
    }

    pub fn get_mut(&mut self, id: &ResourceId) -> Option<&mut ResourceRecord> {
        self.resources.get_mut(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.resources.contains_key(id)
    }

    /// Current version of `id`, if it exists.
    pub fn version(&self, id: &ResourceId) -> Option<u64> {
        self.versions.get(id).copied()
    }

    /// Insert or replace the record for `id` and bump its version.
    /// Returns the new version.
    pub fn put(&mut self, id: ResourceId, record: ResourceRecord) -> u64 {
        let version = self.versions.get(&id).copied().unwrap_or(0) + 1;
        self.versions.insert(id.clone(), version);
        self.resources.insert(id, record);
        version
    }

    /// Remove both entries for `id`, returning what was there.
    pub fn remove(&mut self, id: &ResourceId) -> Option<(ResourceRecord, u64)> {
        let record = self.resources.remove(id)?;
        let version = self.versions.remove(id).unwrap_or(1);
        Some((record, version))
    }

    /// Put back a prior state captured with [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, id: &ResourceId, prior: Option<(ResourceRecord, u64)>) {
        match prior {
            Some((record, version)) => {
                self.resources.insert(id.clone(), record);
                self.versions.insert(id.clone(), version);
            }
            None => {
                self.resources.remove(id);
                self.versions.remove(id);
            }
        }
    }

    /// Copy of both entries for `id`, for rollback.
    pub fn snapshot(&self, id: &ResourceId) -> Option<(ResourceRecord, u64)> {
        let record = self.resources.get(id)?.clone();
        Some((record, self.version(id).unwrap_or(1)))
    }

    /// All live resources with their versions, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &ResourceRecord, u64)> + '_ {
        self.resources
            .iter()
            .map(|(id, record)| (id, record, self.versions.get(id).copied().unwrap_or(1)))
    }

    pub fn records(&self) -> impl Iterator<Item = &ResourceRecord> + '_ {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vram_types::ContentDigest;

    fn id(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    fn record(size: u64) -> ResourceRecord {
        ResourceRecord::new(
            "text",
            size,
            size,
            ContentDigest::from_hash([1; 32]),
            false,
            1,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn missing_file_loads_empty_without_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::load(dir.path().join("metadata.json"), false);
        assert!(store.is_empty());
        assert!(store.recovery().is_none());
    }

    #[test]
    fn corrupt_file_loads_empty_with_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, b"{ this is not json").unwrap();
        let store = MetadataStore::load(&path, false);
        assert!(store.is_empty());
        assert!(matches!(store.recovery(), Some(Recovery::Unparseable(_))));
    }

    #[test]
    fn directory_in_place_of_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::create_dir(&path).unwrap();
        let store = MetadataStore::load(&path, false);
        assert!(store.is_empty());
        assert!(matches!(store.recovery(), Some(Recovery::Unreadable(_))));
    }

    #[test]
    fn put_bumps_versions() {
        let mut store = MetadataStore::empty("unused.json", false);
        assert_eq!(store.put(id("a"), record(1)), 1);
        assert_eq!(store.put(id("a"), record(2)), 2);
        assert_eq!(store.put(id("b"), record(3)), 1);
        assert_eq!(store.version(&id("a")), Some(2));
        assert_eq!(store.get(&id("a")).unwrap().size, 2);
    }

    #[test]
    fn remove_drops_both_entries() {
        let mut store = MetadataStore::empty("unused.json", false);
        store.put(id("a"), record(1));
        let (rec, version) = store.remove(&id("a")).unwrap();
        assert_eq!(rec.size, 1);
        assert_eq!(version, 1);
        assert!(store.get(&id("a")).is_none());
        assert!(store.version(&id("a")).is_none());
        assert!(store.remove(&id("a")).is_none());
    }

    #[test]
    fn snapshot_and_restore() {
        let mut store = MetadataStore::empty("unused.json", false);
        store.put(id("a"), record(1));
        let prior = store.snapshot(&id("a"));
        store.put(id("a"), record(2));
        store.restore(&id("a"), prior);
        assert_eq!(store.version(&id("a")), Some(1));
        assert_eq!(store.get(&id("a")).unwrap().size, 1);

        store.restore(&id("b"), None);
        assert!(!store.contains(&id("b")));
        store.put(id("c"), record(3));
        store.restore(&id("c"), None);
        assert!(!store.contains(&id("c")));
        assert!(store.version(&id("c")).is_none());
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let mut store = MetadataStore::empty(&path, true);
        store.put(id("a"), record(10));
        store.put(id("a"), record(11));
        store.put(id("b"), record(20));
        store.save().unwrap();

        let loaded = MetadataStore::load(&path, true);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.version(&id("a")), Some(2));
        assert_eq!(loaded.get(&id("b")), store.get(&id("b")));
        assert!(loaded.recovery().is_none());
    }

    #[test]
    fn save_writes_both_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let mut store = MetadataStore::empty(&path, false);
        store.put(id("a"), record(1));
        store.save().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["versions"]["a"], 1);
        assert_eq!(value["resources"]["a"]["size"], 1);
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let mut store = MetadataStore::empty(&path, false);
        for i in 0..5 {
            store.put(id(&format!("r{i}")), record(i));
            store.save().unwrap();
        }
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("metadata.json")]);
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metadata.json");
        MetadataStore::empty(&path, false).save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn load_reconciles_unpaired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let doc = serde_json::json!({
            "resources": { "orphan_record": serde_json::to_value(record(5)).unwrap() },
            "versions": { "orphan_version": 7 }
        });
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let store = MetadataStore::load(&path, false);
        assert_eq!(store.version(&id("orphan_record")), Some(1));
        assert!(store.version(&id("orphan_version")).is_none());
        assert!(store.recovery().is_none());
    }

    #[test]
    fn load_skips_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let rec = serde_json::to_value(record(5)).unwrap();
        let doc = serde_json::json!({
            "resources": { "../escape": rec.clone(), "fine": rec },
            "versions": { "../escape": 1, "fine": 4 }
        });
        fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let store = MetadataStore::load(&path, false);
        assert_eq!(store.len(), 1);
        assert_eq!(store.version(&id("fine")), Some(4));
    }

    #[test]
    fn load_accepts_missing_top_level_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        fs::write(&path, b"{}").unwrap();
        let store = MetadataStore::load(&path, false);
        assert!(store.is_empty());
        assert!(store.recovery().is_none());
    }

    #[test]
    fn iter_is_ordered_by_id() {
        let mut store = MetadataStore::empty("unused.json", false);
        store.put(id("c"), record(3));
        store.put(id("a"), record(1));
        store.put(id("b"), record(2));
        let ids: Vec<_> = store.iter().map(|(id, _, _)| id.as_str().to_string()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
