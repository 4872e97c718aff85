//! Append-only Merkle tree state for note commitments.
//!
//! The tree mirrors the credit-note circuit's hash domain: fixed depth,
//! MiMC sponge as the pairwise combiner, and a keccak-derived zero element
//! for unfilled positions. It provides insertion plus authentication path
//! queries for previously inserted leaves.

use privacy_crypto::{keccak_to_field, Fr, MimcSponge};
use thiserror::Error;

/// Binary Merkle tree.
const BRANCH_FACTOR: usize = 2;

/// Depth of the credit-note anonymity set.
pub const TREE_DEPTH: usize = 30;

/// Domain string whose keccak256, reduced into the field, fills empty leaves.
pub const ZERO_VALUE_DOMAIN: &str = "credit-note-pool";

pub fn zero_value() -> Fr {
    keccak_to_field(ZERO_VALUE_DOMAIN.as_bytes())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MerkleError {
    #[error("tree depth must be between 1 and {max}")]
    InvalidDepth { max: usize },
    #[error("merkle tree is full")]
    TreeFull,
    #[error("leaf index {0} is out of range")]
    InvalidLeafIndex(usize),
}

/// Pairwise node combiner.
pub trait NodeHasher {
    fn hash_pair(&self, left: Fr, right: Fr) -> Fr;
}

impl NodeHasher for MimcSponge {
    fn hash_pair(&self, left: Fr, right: Fr) -> Fr {
        self.hash_left_right(left, right)
    }
}

impl<H: NodeHasher + ?Sized> NodeHasher for &H {
    fn hash_pair(&self, left: Fr, right: Fr) -> Fr {
        (**self).hash_pair(left, right)
    }
}

/// Authentication path for one leaf, ordered from the leaf level upwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub leaf_index: usize,
    pub siblings: Vec<Fr>,
    /// `0` when the running node is the left child at that level, `1` when right.
    pub indices: Vec<u8>,
}

impl MerklePath {
    pub fn compute_root<H: NodeHasher>(&self, hasher: &H, leaf: Fr) -> Fr {
        self.siblings
            .iter()
            .zip(&self.indices)
            .fold(leaf, |node, (sibling, side)| {
                if *side == 0 {
                    hasher.hash_pair(node, *sibling)
                } else {
                    hasher.hash_pair(*sibling, node)
                }
            })
    }
}

#[derive(Clone, Debug)]
pub struct CommitmentTree<H> {
    hasher: H,
    depth: usize,
    leaf_count: usize,
    default_nodes: Vec<Fr>,
    levels: Vec<Vec<Fr>>,
    root_history: Vec<Fr>,
}

impl<H: NodeHasher> CommitmentTree<H> {
    pub fn new(hasher: H, depth: usize, zero: Fr) -> Result<Self, MerkleError> {
        let max = usize::BITS as usize - 1;
        if depth == 0 || depth > max {
            return Err(MerkleError::InvalidDepth { max });
        }
        let mut default_nodes = Vec::with_capacity(depth + 1);
        default_nodes.push(zero);
        for level in 0..depth {
            let prev = default_nodes[level];
            default_nodes.push(hasher.hash_pair(prev, prev));
        }
        let levels = vec![Vec::new(); depth + 1];
        let root = default_nodes[depth];
        Ok(Self {
            hasher,
            depth,
            leaf_count: 0,
            default_nodes,
            levels,
            root_history: vec![root],
        })
    }

    /// Tree with the credit-note pool's depth and zero element.
    pub fn anonymity_set(hasher: H) -> Result<Self, MerkleError> {
        Self::new(hasher, TREE_DEPTH, zero_value())
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    pub fn capacity(&self) -> usize {
        1usize << self.depth
    }

    pub fn is_full(&self) -> bool {
        self.leaf_count == self.capacity()
    }

    pub fn root(&self) -> Fr {
        self.root_history[self.root_history.len() - 1]
    }

    pub fn root_history(&self) -> &[Fr] {
        &self.root_history
    }

    pub fn zero_node(&self, level: usize) -> Option<Fr> {
        self.default_nodes.get(level).copied()
    }

    /// Index of the first leaf equal to `value`.
    pub fn position(&self, value: &Fr) -> Option<usize> {
        self.levels[0].iter().position(|leaf| leaf == value)
    }

    pub fn append(&mut self, value: Fr) -> Result<(usize, Fr), MerkleError> {
        if self.is_full() {
            return Err(MerkleError::TreeFull);
        }
        let index = self.leaf_count;
        self.leaf_count += 1;
        self.levels[0].push(value);
        let mut current = value;
        let mut position = index;
        for level in 0..self.depth {
            if position % BRANCH_FACTOR == 0 {
                current = self.hasher.hash_pair(current, self.default_nodes[level]);
            } else {
                let left = self.levels[level][position - 1];
                current = self.hasher.hash_pair(left, current);
            }
            position /= BRANCH_FACTOR;
            if self.levels[level + 1].len() == position {
                self.levels[level + 1].push(current);
            } else {
                self.levels[level + 1][position] = current;
            }
        }
        let root = current;
        self.root_history.push(root);
        Ok((index, root))
    }

    pub fn extend<I>(&mut self, values: I) -> Result<Vec<Fr>, MerkleError>
    where
        I: IntoIterator<Item = Fr>,
    {
        let mut roots = Vec::new();
        for value in values {
            let (_, root) = self.append(value)?;
            roots.push(root);
        }
        Ok(roots)
    }

    pub fn authentication_path(&self, index: usize) -> Result<MerklePath, MerkleError> {
        if index >= self.leaf_count {
            return Err(MerkleError::InvalidLeafIndex(index));
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut indices = Vec::with_capacity(self.depth);
        let mut position = index;
        for level in 0..self.depth {
            let sibling_pos = if position % BRANCH_FACTOR == 0 {
                position + 1
            } else {
                position - 1
            };
            let sibling = if sibling_pos < self.levels[level].len() {
                self.levels[level][sibling_pos]
            } else {
                self.default_nodes[level]
            };
            siblings.push(sibling);
            indices.push((position % BRANCH_FACTOR) as u8);
            position /= BRANCH_FACTOR;
        }
        Ok(MerklePath {
            leaf_index: index,
            siblings,
            indices,
        })
    }
}
