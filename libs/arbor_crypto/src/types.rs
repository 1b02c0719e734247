//! Common type aliases used across cryptographic components.

/// Standard byte array length used for digests (32 bytes).
pub const STANDARD_ARRAY_LENGTH: usize = 32;
/// Fixed-size 32-byte array holding a digest.
pub type StdByteArray = [u8; STANDARD_ARRAY_LENGTH];
