use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_crypto::{
    errors::MerkleError,
    hashing::DefaultHash,
    merkle::{MerkleTree, generate_tree},
    proofs::{MerkleProof, check_proof_of_inclusion, generate_proof_of_inclusion},
    serialization::MerkleSerialize,
    types::StdByteArray,
};
use slotmap::{Key, KeyData, SlotMap, new_key_type};
use tracing::instrument;

use crate::{HASH_SIZE, config::EngineConfig, errors::ErrorCode};

new_key_type! {
    /// Opaque single-owner reference to a tree held by a `MerkleEngine`.
    pub struct TreeHandle;
}

impl TreeHandle {
    /// Integer form for hosts that cannot hold a Rust value. Never 0.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Inverse of `to_raw`; 0 is the null handle.
    pub fn from_raw(raw: u64) -> Option<TreeHandle> {
        if raw == 0 {
            return None;
        }
        Some(KeyData::from_ffi(raw).into())
    }
}

/// Arena of built trees plus the settings they are built with.
///
/// Every tree is owned by the engine and reachable through exactly one
/// handle; `destroy_tree` releases it. Reads share the lock, so root queries
/// and proof generation run concurrently, while destruction waits for them.
/// A destroyed handle is recognised as stale and never reaches another tree.
pub struct MerkleEngine {
    config: EngineConfig,
    trees: RwLock<SlotMap<TreeHandle, MerkleTree>>,
}

impl Default for MerkleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl MerkleEngine {
    /// Engine over an already validated config. An invalid one is logged and
    /// kept, so every tree it would build is refused; prefer `try_new`.
    pub fn new(config: EngineConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("Engine created with invalid config: {}", e);
        }
        MerkleEngine {
            config,
            trees: RwLock::new(SlotMap::with_key()),
        }
    }

    pub fn try_new(config: EngineConfig) -> Result<Self, MerkleError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of live trees.
    pub fn tree_count(&self) -> usize {
        self.read().len()
    }

    // trees are immutable once inserted, so a poisoned lock still guards valid data
    fn read(&self) -> RwLockReadGuard<'_, SlotMap<TreeHandle, MerkleTree>> {
        self.trees.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotMap<TreeHandle, MerkleTree>> {
        self.trees.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a tree and register it, reporting why on failure.
    #[instrument(skip(self, blocks), fields(count = blocks.len()))]
    pub fn try_create_tree(&self, blocks: &[&[u8]], branching_factor: usize) -> Result<TreeHandle, ErrorCode> {
        if let Some(max_leaves) = self.config.max_leaves
            && blocks.len() > max_leaves
        {
            tracing::warn!("Refusing tree of {} leaves, limit is {}", blocks.len(), max_leaves);
            return Err(ErrorCode::BadArgument);
        }
        let tree = generate_tree(blocks, branching_factor, self.config.domain, &mut DefaultHash::new())
            .map_err(|e| {
                tracing::warn!("Tree creation failed: {}", e);
                ErrorCode::from(&e)
            })?;
        let handle = self.write().insert(tree);
        tracing::debug!("Registered tree {:?}", handle);
        Ok(handle)
    }

    /// Build a tree and register it. `None` on any failure.
    pub fn create_tree(&self, blocks: &[&[u8]], branching_factor: usize) -> Option<TreeHandle> {
        self.try_create_tree(blocks, branching_factor).ok()
    }

    pub fn create_tree_with_default_factor(&self, blocks: &[&[u8]]) -> Option<TreeHandle> {
        self.create_tree(blocks, self.config.default_branching_factor)
    }

    /// Release a tree. No-op for a null or already destroyed handle.
    #[instrument(skip(self))]
    pub fn destroy_tree(&self, handle: Option<TreeHandle>) {
        let Some(handle) = handle else {
            return;
        };
        match self.write().remove(handle) {
            Some(tree) => tracing::debug!("Destroyed tree with {} leaves", tree.leaf_count()),
            None => tracing::warn!("Destroy called on stale handle {:?}", handle),
        }
    }

    /// Copy the root digest of a tree into `out`, which must be exactly `HASH_SIZE` bytes.
    pub fn get_root_hash(&self, handle: Option<TreeHandle>, out: Option<&mut [u8]>) -> ErrorCode {
        let (Some(handle), Some(out)) = (handle, out) else {
            return ErrorCode::NullArgument;
        };
        if out.len() != HASH_SIZE {
            return ErrorCode::BadLength;
        }
        match self.root_hash(handle) {
            Ok(root) => {
                out.copy_from_slice(&root);
                ErrorCode::Success
            }
            Err(code) => code,
        }
    }

    pub fn root_hash(&self, handle: TreeHandle) -> Result<StdByteArray, ErrorCode> {
        self.read()
            .get(handle)
            .map(MerkleTree::root_hash)
            .ok_or(ErrorCode::BadArgument)
    }

    /// Serialized inclusion proof for one leaf of a registered tree.
    #[instrument(skip(self))]
    pub fn generate_proof(&self, handle: Option<TreeHandle>, leaf_index: usize) -> Result<Vec<u8>, ErrorCode> {
        let handle = handle.ok_or(ErrorCode::NullArgument)?;
        let proof = {
            let trees = self.read();
            let tree = trees.get(handle).ok_or_else(|| {
                tracing::warn!("Proof requested for stale handle");
                ErrorCode::BadArgument
            })?;
            generate_proof_of_inclusion(tree, leaf_index).map_err(|e| {
                tracing::warn!("Proof generation failed: {}", e);
                ErrorCode::from(&e)
            })?
        };
        proof.serialize_merkle().map_err(|e| ErrorCode::from(&e))
    }

    /// Check a serialized proof for `leaf` against `expected_root`.
    ///
    /// Independent of any registered tree. Proofs built in a different hash
    /// domain than this engine's are rejected.
    #[instrument(skip_all, fields(proof_len = proof.len()))]
    pub fn verify_proof(&self, leaf: &[u8], proof: &[u8], expected_root: &[u8]) -> ErrorCode {
        if leaf.is_empty() {
            return ErrorCode::BadLength;
        }
        let Ok(root) = StdByteArray::try_from(expected_root) else {
            return ErrorCode::BadLength;
        };
        let proof = match MerkleProof::deserialize_merkle(proof) {
            Ok(proof) => proof,
            Err(e) => {
                tracing::debug!("Undecodable proof: {}", e);
                return ErrorCode::ProofInvalid;
            }
        };
        if proof.domain != self.config.domain {
            tracing::debug!("Proof domain {:?} does not match engine", proof.domain);
            return ErrorCode::ProofInvalid;
        }
        match check_proof_of_inclusion(leaf, &proof, root, &mut DefaultHash::new()) {
            Ok(()) => ErrorCode::Success,
            Err(e) => {
                tracing::debug!("Proof rejected: {}", e);
                ErrorCode::ProofInvalid
            }
        }
    }
}
