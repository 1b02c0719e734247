use crate::{
    errors::MerkleError,
    hashing::{HashDomain, HashFunction},
    types::StdByteArray,
};

/// A Merkle tree with a fixed branching factor.
///
/// Every layer is retained: `layers[0]` holds one digest per data block in
/// input order and the last layer holds the root alone. A node at layer
/// `k > 0`, position `p`, is the digest of the nodes at layer `k - 1`,
/// positions `p * branching_factor .. min((p + 1) * branching_factor, len)`.
/// A trailing group smaller than the branching factor is hashed as is,
/// including a group of one.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<StdByteArray>>,
    branching_factor: usize,
    domain: HashDomain,
}

impl MerkleTree {
    pub fn root_hash(&self) -> StdByteArray {
        // construction guarantees a non-empty last layer
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or_default()
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    pub fn domain(&self) -> HashDomain {
        self.domain
    }

    pub fn leaf_count(&self) -> usize {
        self.layers.first().map_or(0, Vec::len)
    }

    /// Number of layers including the leaves and the root.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn leaves(&self) -> &[StdByteArray] {
        self.layer(0).unwrap_or_default()
    }

    pub fn layer(&self, layer: usize) -> Option<&[StdByteArray]> {
        self.layers.get(layer).map(Vec::as_slice)
    }

    pub fn node(&self, layer: usize, position: usize) -> Option<&StdByteArray> {
        self.layers.get(layer)?.get(position)
    }

    /// Position of the first leaf with the given digest.
    pub fn leaf_index_of(&self, leaf_hash: &StdByteArray) -> Option<usize> {
        self.leaves().iter().position(|leaf| leaf == leaf_hash)
    }
}

/// Node count of every layer, leaves first, for a tree of the given shape.
///
/// Empty if the shape is not buildable.
pub fn layer_sizes(leaf_count: usize, branching_factor: usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    if leaf_count == 0 || branching_factor < 2 {
        return sizes;
    }
    let mut size = leaf_count;
    sizes.push(size);
    while size > 1 {
        size = size.div_ceil(branching_factor);
        sizes.push(size);
    }
    sizes
}

/// Generate a Merkle tree over the given data blocks.
///
/// Blocks are hashed during the call and not retained. All arguments are
/// validated before any node storage is reserved.
///
/// # Errors
///
/// * `EmptyInput` if `blocks` is empty.
/// * `InvalidBranchingFactor` if `branching_factor < 2`.
/// * `EmptyBlock` if any block has zero length.
/// * `AllocationFailure` if node storage cannot be reserved.
/// * `TreeBuildFailure` if a layer comes out with an unexpected node count.
pub fn generate_tree<B: AsRef<[u8]>>(
    blocks: &[B],
    branching_factor: usize,
    domain: HashDomain,
    hash_function: &mut impl HashFunction,
) -> Result<MerkleTree, MerkleError> {
    if blocks.is_empty() {
        return Err(MerkleError::EmptyInput);
    }
    if branching_factor < 2 {
        return Err(MerkleError::InvalidBranchingFactor(branching_factor));
    }
    if let Some(index) = blocks.iter().position(|block| block.as_ref().is_empty()) {
        return Err(MerkleError::EmptyBlock { index });
    }

    let sizes = layer_sizes(blocks.len(), branching_factor);
    let mut layers: Vec<Vec<StdByteArray>> = Vec::new();
    layers.try_reserve_exact(sizes.len())?;

    // Create leaves
    let mut leaves = Vec::new();
    leaves.try_reserve_exact(blocks.len())?;
    for block in blocks {
        leaves.push(domain.leaf_digest(block.as_ref(), hash_function)?);
    }
    layers.push(leaves);

    // Build up the tree
    for (depth, &size) in sizes.iter().enumerate().skip(1) {
        let parents = {
            let previous = layers.last().ok_or_else(|| {
                MerkleError::TreeBuildFailure("missing previous layer".to_string())
            })?;
            let mut parents = Vec::new();
            parents.try_reserve_exact(size)?;
            for group in previous.chunks(branching_factor) {
                parents.push(domain.node_digest(group, hash_function)?);
            }
            parents
        };
        if parents.len() != size {
            return Err(MerkleError::TreeBuildFailure(format!(
                "layer {depth} has {} nodes, expected {size}",
                parents.len()
            )));
        }
        tracing::trace!("Layer {} built with {} nodes", depth, size);
        layers.push(parents);
    }

    let tree = MerkleTree {
        layers,
        branching_factor,
        domain,
    };
    tracing::debug!(
        "Built tree with {} leaves, {} layers, branching factor {}",
        tree.leaf_count(),
        tree.layer_count(),
        branching_factor
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use sha3::{Digest, Sha3_256};

    use super::*;
    use crate::hashing::DefaultHash;

    fn sha3(parts: &[&[u8]]) -> StdByteArray {
        let mut hasher = Sha3_256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    fn build(blocks: &[&[u8]], branching_factor: usize) -> MerkleTree {
        generate_tree(blocks, branching_factor, HashDomain::Plain, &mut DefaultHash::new()).unwrap()
    }

    fn random_blocks(count: usize) -> Vec<Vec<u8>> {
        let mut rng = rand::rng();
        (0..count)
            .map(|_| {
                let len = rng.random_range(1..64);
                (0..len).map(|_| rng.random::<u8>()).collect()
            })
            .collect()
    }

    #[test]
    fn test_generate_tree() {
        let tree = build(&[b"tx0", b"tx1", b"tx2", b"tx3"], 2);
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.layer_count(), 3);
        assert_eq!(tree.layer(1).unwrap().len(), 2);
        assert_eq!(tree.layer(2).unwrap(), &[tree.root_hash()]);
        assert!(tree.layer(3).is_none());
    }

    #[test]
    fn test_foo_bar_baz_binary() {
        let tree = build(&[b"foo", b"bar", b"baz"], 2);

        let foo = sha3(&[b"foo"]);
        let bar = sha3(&[b"bar"]);
        let baz = sha3(&[b"baz"]);
        assert_eq!(tree.leaves(), &[foo, bar, baz]);

        let p1 = sha3(&[&foo, &bar]);
        // the lone trailing node is still hashed
        let p2 = sha3(&[&baz]);
        assert_eq!(tree.layer(1).unwrap(), &[p1, p2]);

        assert_eq!(tree.root_hash(), sha3(&[&p1, &p2]));
        assert_eq!(tree.layer_count(), 3);
    }

    #[test]
    fn test_tagged_tree() {
        let tree = generate_tree(
            &[b"foo".as_slice(), b"bar".as_slice()],
            2,
            HashDomain::Tagged,
            &mut DefaultHash::new(),
        )
        .unwrap();
        let foo = sha3(&[&[0x00], b"foo"]);
        let bar = sha3(&[&[0x00], b"bar"]);
        assert_eq!(tree.root_hash(), sha3(&[&[0x01], &foo, &bar]));
        assert_eq!(tree.domain(), HashDomain::Tagged);
        assert_ne!(tree.root_hash(), build(&[b"foo", b"bar"], 2).root_hash());
    }

    #[test]
    fn test_single_block() {
        let tree = build(&[b"only"], 3);
        assert_eq!(tree.layer_count(), 1);
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.root_hash(), sha3(&[b"only"]));
    }

    #[test]
    fn test_branching_factor_above_count() {
        let tree = build(&[b"a", b"b", b"c"], 8);
        assert_eq!(tree.layer_count(), 2);
        let expected = sha3(&[&sha3(&[b"a"]), &sha3(&[b"b"]), &sha3(&[b"c"])]);
        assert_eq!(tree.root_hash(), expected);
    }

    #[test]
    fn test_ternary_layers() {
        let blocks = random_blocks(10);
        let tree = generate_tree(&blocks, 3, HashDomain::Plain, &mut DefaultHash::new()).unwrap();
        // 10 -> 4 -> 2 -> 1
        let sizes: Vec<usize> = (0..tree.layer_count()).map(|k| tree.layer(k).unwrap().len()).collect();
        assert_eq!(sizes, vec![10, 4, 2, 1]);
        let last = tree.layer(1).unwrap()[3];
        assert_eq!(last, sha3(&[tree.node(0, 9).unwrap()]));
    }

    #[test]
    fn test_layer_sizes() {
        assert_eq!(layer_sizes(1, 2), vec![1]);
        assert_eq!(layer_sizes(8, 2), vec![8, 4, 2, 1]);
        assert_eq!(layer_sizes(9, 3), vec![9, 3, 1]);
        assert_eq!(layer_sizes(100, 4), vec![100, 25, 7, 2, 1]);
        assert!(layer_sizes(0, 2).is_empty());
        assert!(layer_sizes(5, 1).is_empty());
    }

    #[test]
    fn test_layer_count_matches_log() {
        for branching_factor in 2..=8usize {
            for leaf_count in 1..=64usize {
                let sizes = layer_sizes(leaf_count, branching_factor);
                let mut expected = 1;
                let mut capacity = 1;
                while capacity < leaf_count {
                    capacity *= branching_factor;
                    expected += 1;
                }
                assert_eq!(sizes.len(), expected, "n={leaf_count} b={branching_factor}");
            }
        }
    }

    #[test]
    fn test_empty_tree() {
        let data: Vec<&[u8]> = vec![];
        let result = generate_tree(&data, 2, HashDomain::Plain, &mut DefaultHash::new());
        assert!(matches!(result, Err(MerkleError::EmptyInput)));
    }

    #[test]
    fn test_invalid_branching_factor() {
        for branching_factor in [0, 1] {
            let result = generate_tree(&[b"a"], branching_factor, HashDomain::Plain, &mut DefaultHash::new());
            assert!(matches!(result, Err(MerkleError::InvalidBranchingFactor(b)) if b == branching_factor));
        }
    }

    #[test]
    fn test_empty_block_rejected() {
        let data: Vec<&[u8]> = vec![b"a", b"", b"c"];
        let result = generate_tree(&data, 2, HashDomain::Plain, &mut DefaultHash::new());
        assert!(matches!(result, Err(MerkleError::EmptyBlock { index: 1 })));
    }

    #[test]
    fn test_deterministic() {
        let blocks = random_blocks(37);
        for branching_factor in 2..=8 {
            let first = generate_tree(&blocks, branching_factor, HashDomain::Plain, &mut DefaultHash::new()).unwrap();
            let second = generate_tree(&blocks, branching_factor, HashDomain::Plain, &mut DefaultHash::new()).unwrap();
            assert_eq!(first.root_hash(), second.root_hash());
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_order_sensitive() {
        let tree = build(&[b"foo", b"bar", b"baz"], 2);
        let swapped = build(&[b"bar", b"foo", b"baz"], 2);
        assert_ne!(tree.root_hash(), swapped.root_hash());

        let mut blocks = random_blocks(16);
        // distinct by construction so the transposition always changes the order
        blocks[3].push(0x03);
        blocks[11].push(0x0b);
        let mut transposed = blocks.clone();
        transposed.swap(3, 11);
        let a = generate_tree(&blocks, 4, HashDomain::Plain, &mut DefaultHash::new()).unwrap();
        let b = generate_tree(&transposed, 4, HashDomain::Plain, &mut DefaultHash::new()).unwrap();
        assert_ne!(a.root_hash(), b.root_hash());
    }

    #[test]
    fn test_leaf_index_of() {
        let tree = build(&[b"foo", b"bar", b"foo"], 2);
        assert_eq!(tree.leaf_index_of(&sha3(&[b"bar"])), Some(1));
        assert_eq!(tree.leaf_index_of(&sha3(&[b"foo"])), Some(0));
        assert_eq!(tree.leaf_index_of(&sha3(&[b"qux"])), None);
    }
}
