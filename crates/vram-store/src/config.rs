//! Store configuration with TOML file and environment variable loading.
//!
//! Environment variables (applied on top of file values):
//! - `VRAM_RESOURCES_DIR`: directory holding payload files and metadata
//! - `VRAM_CODEC`: `zstd` or `gzip`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Environment variable overriding [`StoreConfig::resources_dir`].
pub const ENV_RESOURCES_DIR: &str = "VRAM_RESOURCES_DIR";
/// Environment variable overriding [`CompressionConfig::codec`].
pub const ENV_CODEC: &str = "VRAM_CODEC";

/// Compression format used when a store request asks for compression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    Zstd,
    Gzip,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zstd => f.write_str("zstd"),
            Self::Gzip => f.write_str("gzip"),
        }
    }
}

impl FromStr for Codec {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zstd" => Ok(Self::Zstd),
            "gzip" | "gz" => Ok(Self::Gzip),
            other => Err(StoreError::Validation(format!("unknown codec: {other}"))),
        }
    }
}

/// Compression settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Codec used for new writes. Reads detect the codec from the payload.
    pub codec: Codec,
    /// Codec-specific level (zstd 1-22, gzip 0-9).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: Codec::Zstd,
            level: 3,
        }
    }
}

/// Configuration for a [`ResourceManager`](crate::ResourceManager).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `<id>.bin` payload files and the metadata file.
    pub resources_dir: PathBuf,
    /// Metadata file name, relative to `resources_dir`.
    pub metadata_file_name: String,
    /// Compression settings for new writes.
    pub compression: CompressionConfig,
    /// `fsync` payload and metadata files before renaming them into place.
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            resources_dir: PathBuf::from("resources"),
            metadata_file_name: "metadata.json".into(),
            compression: CompressionConfig::default(),
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    /// Default configuration rooted at `dir`.
    pub fn with_resources_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            resources_dir: dir.into(),
            ..Default::default()
        }
    }

    /// Parse a TOML document. Settings live under a `[store]` table; a
    /// document without one yields the defaults.
    ///
    /// ```toml
    /// [store]
    /// resources_dir = "/var/lib/vram/resources"
    /// sync_writes = true
    ///
    /// [store.compression]
    /// codec = "zstd"
    /// level = 3
    /// ```
    pub fn from_toml_str(contents: &str) -> StoreResult<Self> {
        #[derive(Deserialize)]
        struct Document {
            #[serde(default)]
            store: StoreConfig,
        }

        let doc: Document = toml::from_str(contents)
            .map_err(|e| StoreError::Validation(format!("invalid store config: {e}")))?;
        Ok(doc.store)
    }

    /// Load a TOML config file.
    pub fn from_file(path: &Path) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml_str(&contents)
    }

    /// Apply `VRAM_*` environment overrides.
    pub fn apply_env(mut self) -> StoreResult<Self> {
        self.apply_overrides(
            std::env::var(ENV_RESOURCES_DIR).ok(),
            std::env::var(ENV_CODEC).ok(),
        )?;
        Ok(self)
    }

    fn apply_overrides(
        &mut self,
        resources_dir: Option<String>,
        codec: Option<String>,
    ) -> StoreResult<()> {
        if let Some(dir) = resources_dir.filter(|d| !d.is_empty()) {
            self.resources_dir = PathBuf::from(dir);
        }
        if let Some(codec) = codec {
            self.compression.codec = codec.parse()?;
        }
        Ok(())
    }

    /// Full path of the metadata file.
    pub fn metadata_path(&self) -> PathBuf {
        self.resources_dir.join(&self.metadata_file_name)
    }
}
