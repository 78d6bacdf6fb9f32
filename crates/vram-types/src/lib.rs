//! Foundation types for the VRAM resource store.
//!
//! Every other VRAM crate depends on `vram-types`.
//!
//! # Key Types
//!
//! - [`ResourceId`]: Client-chosen resource name, validated to be safe as a file stem
//! - [`ContentDigest`]: 256-bit integrity digest of a payload

pub mod digest;
pub mod error;
pub mod resource_id;

pub use digest::ContentDigest;
pub use error::TypeError;
pub use resource_id::ResourceId;
