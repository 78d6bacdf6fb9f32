//! Typed metadata records and operation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vram_types::{ContentDigest, ResourceId};

/// Default classification for stored resources.
pub const DEFAULT_RESOURCE_TYPE: &str = "generic";
/// Default writer priority.
pub const DEFAULT_PRIORITY: i64 = 1;

/// Descriptive record kept for every live resource.
///
/// The identifier is the key of the metadata map and is not repeated inside
/// the record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Free-form classification ("text", "binary", ...).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Length of the original payload.
    pub size: u64,
    /// Length of the bytes written to disk.
    pub compressed_size: u64,
    /// Digest of the original payload.
    pub hash: ContentDigest,
    /// Whether the stored bytes must be decompressed on read.
    pub compressed: bool,
    /// Writer-supplied hint. Stored, never interpreted.
    pub priority: i64,
    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

impl ResourceRecord {
    /// Record for a payload stored at `now`, with no reads yet.
    pub fn new(
        resource_type: impl Into<String>,
        size: u64,
        compressed_size: u64,
        hash: ContentDigest,
        compressed: bool,
        priority: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            size,
            compressed_size,
            hash,
            compressed,
            priority,
            created: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    /// Note a successful read.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
        self.access_count += 1;
    }
}

/// Writer options for [`store`](crate::ResourceStore::store).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub priority: i64,
    pub compress: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            resource_type: DEFAULT_RESOURCE_TYPE.into(),
            priority: DEFAULT_PRIORITY,
            compress: true,
        }
    }
}

impl StoreOptions {
    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Outcome of a successful store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub resource_id: ResourceId,
    pub size: u64,
    pub compressed_size: u64,
    pub version: u64,
    pub hash: ContentDigest,
}

/// Payload and its updated record, as returned by a read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedResource {
    pub id: ResourceId,
    pub data: Vec<u8>,
    pub record: ResourceRecord,
}

/// Metadata and version without the payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub resource_id: ResourceId,
    pub metadata: ResourceRecord,
    pub version: u64,
}

/// One row of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    pub id: ResourceId,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub size: u64,
    pub compressed_size: u64,
    pub priority: i64,
    pub version: u64,
    #[serde(with = "timestamp")]
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

impl ResourceSummary {
    pub fn new(id: ResourceId, record: &ResourceRecord, version: u64) -> Self {
        Self {
            id,
            resource_type: record.resource_type.clone(),
            size: record.size,
            compressed_size: record.compressed_size,
            priority: record.priority,
            version,
            last_accessed: record.last_accessed,
            access_count: record.access_count,
        }
    }
}

/// Aggregate usage over all live records.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub resource_count: usize,
    pub total_size: u64,
    pub total_compressed_size: u64,
    /// `total_compressed_size / total_size`, or 0 for an empty store.
    pub compression_ratio: f64,
    pub disk_usage_mb: f64,
}

impl StorageStats {
    /// Fold a sequence of records into totals.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ResourceRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.resource_count += 1;
            stats.total_size += record.size;
            stats.total_compressed_size += record.compressed_size;
        }
        if stats.total_size > 0 {
            stats.compression_ratio = stats.total_compressed_size as f64 / stats.total_size as f64;
        }
        stats.disk_usage_mb = stats.total_compressed_size as f64 / (1024.0 * 1024.0);
        stats
    }
}

/// Result of an integrity sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Resources whose payload decoded and matched its digest.
    pub ok: Vec<ResourceId>,
    /// Resources whose payload file is absent.
    pub missing: Vec<ResourceId>,
    /// Resources whose payload failed decompression or digest comparison.
    pub corrupt: Vec<ResourceId>,
}

impl VerifyReport {
    /// `true` when every checked resource verified.
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }

    pub fn checked(&self) -> usize {
        self.ok.len() + self.missing.len() + self.corrupt.len()
    }
}

/// RFC 3339 timestamps. Earlier deployments wrote local ISO-8601 without
/// an offset; those are read as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse(s: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {s:?}: {e}"))
    }
}
