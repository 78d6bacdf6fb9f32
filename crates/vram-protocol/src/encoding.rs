//! Payload encoding for JSON bodies.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{ProtocolError, ProtocolResult};

/// Value of the `encoding` field on inline payloads.
pub const PAYLOAD_ENCODING: &str = "base64";

/// Encode raw bytes for a JSON body.
pub fn encode_payload(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode a base64 payload from a JSON body. Embedded whitespace (line
/// wrapping) is ignored.
pub fn decode_payload(encoded: &str) -> ProtocolResult<Vec<u8>> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ProtocolError::Validation(format!("Invalid base64 data: {e}")))
}
