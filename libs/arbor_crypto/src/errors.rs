use thiserror::Error;

/// Errors from Merkle tree construction, proof handling and encoding.
#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("no data blocks were supplied")]
    EmptyInput,
    #[error("branching factor must be at least 2, got {0}")]
    InvalidBranchingFactor(usize),
    #[error("data block {index} has zero length")]
    EmptyBlock { index: usize },
    #[error("failed to allocate node storage")]
    AllocationFailure,
    #[error("tree construction failed: {0}")]
    TreeBuildFailure(String),
    #[error("leaf index {index} out of range for {leaf_count} leaves")]
    IndexOutOfRange { index: usize, leaf_count: usize },
    #[error("no leaf matches the given data")]
    LeafNotFound,
    #[error("invalid proof: {0}")]
    ProofInvalid(String),
    #[error("no data has been added to the hasher")]
    EmptyDigestInput,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<std::collections::TryReserveError> for MerkleError {
    fn from(_: std::collections::TryReserveError) -> Self {
        MerkleError::AllocationFailure
    }
}

impl From<bincode::Error> for MerkleError {
    fn from(err: bincode::Error) -> Self {
        MerkleError::Serialization(err.to_string())
    }
}
