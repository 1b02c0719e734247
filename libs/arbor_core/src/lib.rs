//! Handle-based boundary over the `arbor_crypto` Merkle engine.
//!
//! Host integrations (foreign-function shims, scripting bindings) talk to
//! `MerkleEngine` through opaque single-owner `TreeHandle`s and receive
//! `ErrorCode`s; they own any human-readable messages themselves.

pub mod config;
pub mod engine;
pub mod errors;

/// Size in bytes of every digest crossing the boundary.
pub const HASH_SIZE: usize = arbor_crypto::types::STANDARD_ARRAY_LENGTH;
