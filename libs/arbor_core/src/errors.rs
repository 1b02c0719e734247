use arbor_crypto::errors::MerkleError;

/// Status codes returned across the boundary.
///
/// A closed set: hosts map these to their own messages.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Success = 0,
    /// A required handle or buffer was missing.
    NullArgument = -1,
    /// An argument was present but unusable (stale handle, index out of range).
    BadArgument = -2,
    /// A buffer or block had the wrong length.
    BadLength = -3,
    AllocationFailure = -4,
    TreeBuildFailure = -5,
    /// The proof was malformed or did not reach the expected root.
    ProofInvalid = -6,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ErrorCode::Success),
            -1 => Ok(ErrorCode::NullArgument),
            -2 => Ok(ErrorCode::BadArgument),
            -3 => Ok(ErrorCode::BadLength),
            -4 => Ok(ErrorCode::AllocationFailure),
            -5 => Ok(ErrorCode::TreeBuildFailure),
            -6 => Ok(ErrorCode::ProofInvalid),
            other => Err(other),
        }
    }
}

impl From<&MerkleError> for ErrorCode {
    fn from(err: &MerkleError) -> Self {
        match err {
            MerkleError::EmptyInput
            | MerkleError::InvalidBranchingFactor(_)
            | MerkleError::IndexOutOfRange { .. }
            | MerkleError::LeafNotFound
            | MerkleError::Io(_) => ErrorCode::BadArgument,
            MerkleError::EmptyBlock { .. } => ErrorCode::BadLength,
            MerkleError::AllocationFailure => ErrorCode::AllocationFailure,
            MerkleError::TreeBuildFailure(_) | MerkleError::EmptyDigestInput => ErrorCode::TreeBuildFailure,
            MerkleError::ProofInvalid(_) | MerkleError::Serialization(_) => ErrorCode::ProofInvalid,
        }
    }
}
