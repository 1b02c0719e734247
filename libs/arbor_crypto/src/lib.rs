//! Merkle tree engine used by the Arbor workspace.
//!
//! This crate provides small, focused building blocks:
//! - Hashing traits, a SHA3-256 default hasher and leaf/node domain handling
//! - Variable-arity Merkle tree construction over opaque data blocks
//! - Generation and verification of inclusion proofs
//! - A bounded binary wire format for proofs and configuration
//!
//! None of the public APIs in this crate perform network or filesystem I/O,
//! with the exception of the explicit load/save helpers in `serialization`.

/// Error type shared by every fallible operation in this crate.
pub mod errors;
/// Reusable hashing traits and a default SHA3-256 hasher.
pub mod hashing;
/// Merkle tree construction and the layered tree type.
pub mod merkle;
/// Utilities for generating and verifying Merkle proofs of inclusion.
pub mod proofs;
/// Binary encoding of proofs and other serde types.
pub mod serialization;
/// Common type aliases and constants used by this crate.
pub mod types;
