//! Payload compression.
//!
//! Resources record only a `compressed` flag, not the codec, so the reverse
//! transform identifies the format from the frame magic. This lets a store
//! hold gzip payloads written by earlier deployments next to zstd payloads
//! written now.

use std::io::{Read, Write};

use crate::config::{Codec, CompressionConfig};
use crate::error::{StoreError, StoreResult};

/// Leading bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
/// Leading bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Reversible payload transform.
#[derive(Clone, Debug, Default)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Codec used for new writes.
    pub fn codec(&self) -> Codec {
        self.config.codec
    }

    /// Compress `data` with the configured codec.
    pub fn compress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        match self.config.codec {
            Codec::Zstd => zstd_encode(data, self.config.level)
                .map_err(|e| StoreError::Serialization(format!("zstd compression failed: {e}"))),
            Codec::Gzip => gzip_encode(data, self.config.level)
                .map_err(|e| StoreError::Serialization(format!("gzip compression failed: {e}"))),
        }
    }

    /// Reverse [`compress`](Self::compress) for either codec.
    ///
    /// Fails with [`StoreError::CorruptPayload`] when `data` is not a valid
    /// frame of a known codec.
    pub fn decompress(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        match detect_codec(data) {
            Some(Codec::Zstd) => zstd::decode_all(data)
                .map_err(|e| StoreError::CorruptPayload(format!("zstd: {e}"))),
            Some(Codec::Gzip) => {
                let mut out = Vec::new();
                let mut decoder = flate2::bufread::GzDecoder::new(data);
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| StoreError::CorruptPayload(format!("gzip: {e}")))?;
                let trailing = decoder.into_inner().len();
                if trailing > 0 {
                    return Err(StoreError::CorruptPayload(format!(
                        "gzip: {trailing} trailing bytes after member"
                    )));
                }
                Ok(out)
            }
            None => Err(StoreError::CorruptPayload(format!(
                "unrecognized compression header ({} bytes)",
                data.len()
            ))),
        }
    }
}

/// zstd frame with a content checksum, so damage to the frame is reported
/// by the decoder itself.
fn zstd_encode(data: &[u8], level: i32) -> std::io::Result<Vec<u8>> {
    let mut encoder = zstd::stream::Encoder::new(Vec::new(), level)?;
    encoder.include_checksum(true)?;
    encoder.write_all(data)?;
    encoder.finish()
}

fn gzip_encode(data: &[u8], level: i32) -> std::io::Result<Vec<u8>> {
    let level = flate2::Compression::new(level.clamp(0, 9) as u32);
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Identify the codec of a compressed payload from its header.
pub fn detect_codec(data: &[u8]) -> Option<Codec> {
    if data.starts_with(&ZSTD_MAGIC) {
        Some(Codec::Zstd)
    } else if data.starts_with(&GZIP_MAGIC) {
        Some(Codec::Gzip)
    } else {
        None
    }
}
