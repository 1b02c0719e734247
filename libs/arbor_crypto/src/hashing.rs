//! Hashing traits, the default SHA3-256 implementation and leaf/node domains.
//!
//! The `Hashable` trait abstracts how a type contributes bytes to a hash
//! function. The `HashFunction` trait exposes a minimal update/finalize API
//! to keep implementations simple and easily swappable in tests.
//!
//! `HashDomain` decides how leaf digests and internal node digests are
//! formed. Both use the same `HashFunction`; the tagged domain prefixes leaf
//! input with `LEAF_DOMAIN_TAG` and node input with `NODE_DOMAIN_TAG` so a
//! leaf can never be read back as a concatenation of child digests.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::{errors::MerkleError, types::StdByteArray};

/// Prefix fed before leaf data when hashing in the tagged domain.
pub const LEAF_DOMAIN_TAG: u8 = 0x00;
/// Prefix fed before concatenated child digests in the tagged domain.
pub const NODE_DOMAIN_TAG: u8 = 0x01;

/// A trait for objects that can be hashed using a hash function.
///
/// Implementors should call `hasher.update(...)` for each field to include
/// and then return `hasher.digest()`.
pub trait Hashable {
    /// Computes the hash of the object using the provided hash function.
    ///
    /// # Arguments
    ///
    /// * `hasher` - A mutable instance of a type implementing the `HashFunction` trait.
    ///
    /// # Returns
    ///
    /// * `Ok(StdByteArray)` containing the hash of the object.
    /// * `Err(MerkleError)` if hashing fails.
    fn hash(&self, hasher: &mut impl HashFunction) -> Result<StdByteArray, MerkleError>;
}

/// A trait for hash functions that support updating with data and producing a digest.
pub trait HashFunction {
    /// Updates the hash function with the given data.
    ///
    /// # Arguments
    ///
    /// * `data` - The data to be hashed.
    fn update(&mut self, data: impl AsRef<[u8]>);

    /// Finalizes the hash computation, returns the digest and resets the
    /// function so it can be reused.
    ///
    /// # Returns
    ///
    /// * `Ok(StdByteArray)` containing the hash digest.
    /// * `Err(MerkleError::EmptyDigestInput)` if no data was added before finalizing.
    fn digest(&mut self) -> Result<StdByteArray, MerkleError>;
}

/// A struct implementing the SHA3-256 hash function.
///
/// This wrapper tracks whether any data was provided before finalizing. Calling
/// `digest` without prior `update` returns `MerkleError::EmptyDigestInput`.
#[derive(Clone)]
pub struct DefaultHash {
    /// The internal SHA3-256 hasher.
    hasher: Sha3_256,
    /// The number of parameters added to the hasher.
    n_parameters: usize,
}

impl Default for DefaultHash {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultHash {
    /// Creates a new instance of the SHA3-256 hash function.
    pub fn new() -> Self {
        DefaultHash {
            hasher: Sha3_256::new(),
            n_parameters: 0,
        }
    }
}

impl HashFunction for DefaultHash {
    fn update(&mut self, data: impl AsRef<[u8]>) {
        Digest::update(&mut self.hasher, data);
        self.n_parameters += 1;
    }

    fn digest(&mut self) -> Result<StdByteArray, MerkleError> {
        if self.n_parameters == 0 {
            return Err(MerkleError::EmptyDigestInput);
        }
        self.n_parameters = 0;
        Ok(self.hasher.finalize_reset().into())
    }
}

/// How leaf and internal node digests are separated from each other.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum HashDomain {
    /// `leaf = H(data)`, `node = H(child_0 || ... || child_n)`.
    #[default]
    Plain,
    /// `leaf = H(0x00 || data)`, `node = H(0x01 || child_0 || ... || child_n)`.
    Tagged,
}

impl HashDomain {
    /// Digest of a single leaf item.
    pub fn leaf_digest(
        &self,
        item: &(impl Hashable + ?Sized),
        hasher: &mut impl HashFunction,
    ) -> Result<StdByteArray, MerkleError> {
        if *self == HashDomain::Tagged {
            hasher.update([LEAF_DOMAIN_TAG]);
        }
        item.hash(hasher)
    }

    /// Digest of a parent node over its children, in slot order.
    pub fn node_digest<'a>(
        &self,
        children: impl IntoIterator<Item = &'a StdByteArray>,
        hasher: &mut impl HashFunction,
    ) -> Result<StdByteArray, MerkleError> {
        if *self == HashDomain::Tagged {
            hasher.update([NODE_DOMAIN_TAG]);
        }
        for child in children {
            hasher.update(child);
        }
        hasher.digest()
    }
}

mod implementations {
    use crate::{errors::MerkleError, hashing::Hashable, types::StdByteArray};

    // blocks reach the leaf layer as byte slices
    impl Hashable for [u8] {
        fn hash(&self, hasher: &mut impl super::HashFunction) -> Result<StdByteArray, MerkleError> {
            hasher.update(self);
            hasher.digest()
        }
    }
}
