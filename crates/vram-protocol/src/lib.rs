//! Request/response contract for the VRAM resource store.
//!
//! This crate is the boundary a transport (HTTP or otherwise) talks to. It
//! decodes client input into typed requests, runs them against any
//! [`ResourceStore`](vram_store::ResourceStore), and produces JSON-ready
//! responses with a status code. It does no routing or socket handling.

pub mod encoding;
pub mod endpoint;
pub mod error;
pub mod handler;
pub mod message;

pub use encoding::{decode_payload, encode_payload, PAYLOAD_ENCODING};
pub use endpoint::endpoints;
pub use error::{ProtocolError, ProtocolResult};
pub use handler::{dispatch, ProtocolConfig};
pub use message::{ApiRequest, ApiResponse, ResponseBody, Status, StoreRequest};
