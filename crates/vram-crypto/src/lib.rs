//! Content hashing for the VRAM resource store.
//!
//! Wraps an established SHA-256 implementation; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
