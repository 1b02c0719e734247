use serde::{Deserialize, Serialize};

use crate::{
    errors::MerkleError,
    hashing::{HashDomain, HashFunction},
    merkle::{MerkleTree, layer_sizes},
    types::StdByteArray,
};

/// One layer of an inclusion proof.
#[derive(Debug, Clone, Deserialize, Serialize, Hash, PartialEq, Eq)]
pub struct ProofStep {
    /// Slot of the proven node within its group.
    pub position: u64,
    /// Number of nodes in the group, including the proven one.
    pub group_size: u64,
    /// Every other member of the group, tagged with its slot.
    pub siblings: Vec<(u64, StdByteArray)>,
}

impl ProofStep {
    /// Lay out the group in slot order with `own` at `position`.
    fn arrange(&self, own: StdByteArray) -> Result<Vec<StdByteArray>, MerkleError> {
        let group_size = usize::try_from(self.group_size)
            .map_err(|_| MerkleError::ProofInvalid("group size overflows".to_string()))?;
        if self.position >= self.group_size {
            return Err(MerkleError::ProofInvalid(format!(
                "position {} outside group of {}",
                self.position, self.group_size
            )));
        }
        // checked before allocating anything sized by the untrusted group size
        if self.siblings.len() + 1 != group_size {
            return Err(MerkleError::ProofInvalid(format!(
                "{} siblings for group of {}",
                self.siblings.len(),
                group_size
            )));
        }

        let mut slots: Vec<Option<StdByteArray>> = vec![None; group_size];
        slots[self.position as usize] = Some(own);
        for (slot, digest) in &self.siblings {
            let entry = usize::try_from(*slot)
                .ok()
                .and_then(|slot| slots.get_mut(slot))
                .ok_or_else(|| MerkleError::ProofInvalid(format!("sibling slot {slot} out of range")))?;
            if entry.is_some() {
                return Err(MerkleError::ProofInvalid(format!("slot {slot} assigned twice")));
            }
            *entry = Some(*digest);
        }
        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| MerkleError::ProofInvalid("group has an empty slot".to_string()))
    }
}

/// Proof that a leaf is included in a tree with a given root.
#[derive(Debug, Clone, Deserialize, Serialize, Hash, PartialEq, Eq)]
pub struct MerkleProof {
    pub leaf_index: u64,
    pub leaf_count: u64,
    pub branching_factor: u64,
    pub domain: HashDomain,
    /// Digest of the proven leaf.
    pub leaf_hash: StdByteArray,
    /// One step per layer, from the leaves up to the layer below the root.
    pub steps: Vec<ProofStep>,
}

/// The leaf a proof is checked against: raw block data, or its digest.
///
/// Byte slices and arrays convert to `Data`; an owned `StdByteArray`
/// converts to `Digest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a> {
    Data(&'a [u8]),
    Digest(StdByteArray),
}

impl<'a> From<&'a [u8]> for Leaf<'a> {
    fn from(data: &'a [u8]) -> Self {
        Leaf::Data(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Leaf<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Leaf::Data(data)
    }
}

impl<'a> From<&'a Vec<u8>> for Leaf<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Leaf::Data(data)
    }
}

impl From<StdByteArray> for Leaf<'_> {
    fn from(digest: StdByteArray) -> Self {
        Leaf::Digest(digest)
    }
}

/// Generate a Merkle proof for the leaf at `leaf_index`.
pub fn generate_proof_of_inclusion(merkle_tree: &MerkleTree, leaf_index: usize) -> Result<MerkleProof, MerkleError> {
    let leaf_count = merkle_tree.leaf_count();
    if leaf_index >= leaf_count {
        return Err(MerkleError::IndexOutOfRange { index: leaf_index, leaf_count });
    }
    let branching_factor = merkle_tree.branching_factor();
    let leaf_hash = merkle_tree.leaves()[leaf_index];

    let mut steps = Vec::new();
    steps.try_reserve_exact(merkle_tree.layer_count() - 1)?;
    let mut position = leaf_index;
    for depth in 0..merkle_tree.layer_count() - 1 {
        let layer = merkle_tree
            .layer(depth)
            .ok_or_else(|| MerkleError::TreeBuildFailure(format!("missing layer {depth}")))?;
        let group_start = (position / branching_factor) * branching_factor;
        let group_end = (group_start + branching_factor).min(layer.len());

        let siblings = (group_start..group_end)
            .filter(|&p| p != position)
            .map(|p| ((p - group_start) as u64, layer[p]))
            .collect();
        steps.push(ProofStep {
            position: (position - group_start) as u64,
            group_size: (group_end - group_start) as u64,
            siblings,
        });
        position /= branching_factor;
    }

    Ok(MerkleProof {
        leaf_index: leaf_index as u64,
        leaf_count: leaf_count as u64,
        branching_factor: branching_factor as u64,
        domain: merkle_tree.domain(),
        leaf_hash,
        steps,
    })
}

/// Generate a Merkle proof for the first leaf whose block equals `data`.
pub fn generate_proof_for_data(
    merkle_tree: &MerkleTree,
    data: &[u8],
    hash_function: &mut impl HashFunction,
) -> Result<MerkleProof, MerkleError> {
    let target_hash = merkle_tree.domain().leaf_digest(data, hash_function)?;
    let leaf_index = merkle_tree
        .leaf_index_of(&target_hash)
        .ok_or(MerkleError::LeafNotFound)?;
    generate_proof_of_inclusion(merkle_tree, leaf_index)
}

/// Check a Merkle proof, reporting why it was rejected.
///
/// The shape of every step is checked against the shape implied by the
/// proof's leaf index, leaf count and branching factor before any hashing.
pub fn check_proof_of_inclusion<'a>(
    leaf: impl Into<Leaf<'a>>,
    proof: &MerkleProof,
    root: StdByteArray,
    hash_function: &mut impl HashFunction,
) -> Result<(), MerkleError> {
    let invalid = |reason: &str| MerkleError::ProofInvalid(reason.to_string());

    let branching_factor = usize::try_from(proof.branching_factor).map_err(|_| invalid("branching factor overflows"))?;
    let leaf_count = usize::try_from(proof.leaf_count).map_err(|_| invalid("leaf count overflows"))?;
    let leaf_index = usize::try_from(proof.leaf_index).map_err(|_| invalid("leaf index overflows"))?;
    if branching_factor < 2 {
        return Err(invalid("branching factor below 2"));
    }
    if leaf_index >= leaf_count {
        return Err(invalid("leaf index outside tree"));
    }

    let sizes = layer_sizes(leaf_count, branching_factor);
    if proof.steps.len() + 1 != sizes.len() {
        return Err(MerkleError::ProofInvalid(format!(
            "{} steps for a tree of {} layers",
            proof.steps.len(),
            sizes.len()
        )));
    }

    let mut current_hash = match leaf.into() {
        Leaf::Data([]) => return Err(invalid("empty leaf data")),
        Leaf::Data(data) => proof.domain.leaf_digest(data, hash_function)?,
        Leaf::Digest(digest) => digest,
    };
    if current_hash != proof.leaf_hash {
        return Err(invalid("leaf does not match proof"));
    }

    let mut position = leaf_index;
    for (depth, (step, &layer_size)) in proof.steps.iter().zip(&sizes).enumerate() {
        let group_start = (position / branching_factor) * branching_factor;
        let group_size = (layer_size - group_start).min(branching_factor);
        if step.position != (position - group_start) as u64 || step.group_size != group_size as u64 {
            return Err(MerkleError::ProofInvalid(format!(
                "step {depth} has slot {} of {}, expected {} of {}",
                step.position,
                step.group_size,
                position - group_start,
                group_size
            )));
        }
        let children = step.arrange(current_hash)?;
        current_hash = proof.domain.node_digest(&children, hash_function)?;
        position /= branching_factor;
    }

    if current_hash != root {
        return Err(invalid("recomputed root does not match"));
    }
    Ok(())
}

/// Verify a Merkle proof, logging the reason on rejection.
///
/// Same checks as `check_proof_of_inclusion`, reduced to a yes/no answer.
pub fn verify_proof_of_inclusion<'a>(
    leaf: impl Into<Leaf<'a>>,
    proof: &MerkleProof,
    root: StdByteArray,
    hash_function: &mut impl HashFunction,
) -> bool {
    match check_proof_of_inclusion(leaf, proof, root, hash_function) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Proof for leaf {} rejected: {}", proof.leaf_index, e);
            false
        }
    }
}

impl MerkleProof {
    pub fn verify<'a>(&self, leaf: impl Into<Leaf<'a>>, root: StdByteArray, hash_function: &mut impl HashFunction) -> bool {
        verify_proof_of_inclusion(leaf, self, root, hash_function)
    }
}
