use std::path::Path;

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::errors::MerkleError;

/// Upper bound on any encoded value accepted by `deserialize_merkle`.
pub const MAX_SERIALIZED_LEN: u64 = 16 * 1024 * 1024;

fn encoding() -> impl Options {
    bincode::DefaultOptions::new()
        .with_limit(MAX_SERIALIZED_LEN)
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

/// Bounded bincode encoding for proofs and configuration.
///
/// Decoding untrusted bytes never panics: oversized lengths, truncated input
/// and trailing garbage all come back as `MerkleError::Serialization`.
pub trait MerkleSerialize: Serialize + for<'a> Deserialize<'a> + Sized {
    fn serialize_merkle(&self) -> Result<Vec<u8>, MerkleError> {
        Ok(encoding().serialize(self)?)
    }

    fn deserialize_merkle(data: &[u8]) -> Result<Self, MerkleError> {
        Ok(encoding().deserialize(data)?)
    }

    fn save(&self, path: &Path) -> Result<(), MerkleError> {
        std::fs::write(path, self.serialize_merkle()?)?;
        Ok(())
    }

    fn load(path: &Path) -> Result<Self, MerkleError> {
        let data = std::fs::read(path)?;
        Self::deserialize_merkle(&data)
    }
}

impl MerkleSerialize for crate::proofs::MerkleProof {}
