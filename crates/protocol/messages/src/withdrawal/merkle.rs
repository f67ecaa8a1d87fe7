//! The positional send Merkle tree.
//!
//! Leaves are `keccak256(sendHash)` in send position order. Parents are `keccak256(left ‖ right)`
//! without sorting, so the path of a leaf is its position. A node without a right sibling is
//! paired with the zero hash.

use alloy_primitives::{B256, keccak256};

/// Hashes a send into its leaf.
pub fn send_leaf(send_hash: B256) -> B256 {
    keccak256(send_hash)
}

fn hash_pair(left: &B256, right: &B256, buffer: &mut [u8; 64]) -> B256 {
    buffer[..32].copy_from_slice(left.as_slice());
    buffer[32..].copy_from_slice(right.as_slice());
    keccak256(&buffer[..])
}

/// A fully materialised send tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTree {
    /// Every layer from the leaves up to the root.
    layers: Vec<Vec<B256>>,
}

impl SendTree {
    /// Builds the tree over `leaves`. Returns `None` for an empty set.
    pub fn from_leaves(leaves: Vec<B256>) -> Option<Self> {
        if leaves.is_empty() {
            return None;
        }

        let mut buffer = [0u8; 64];
        let mut layers = vec![leaves];
        while let Some(layer) = layers.last().filter(|layer| layer.len() > 1) {
            let parents = layer
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&B256::ZERO), &mut buffer))
                .collect();
            layers.push(parents);
        }
        Some(Self { layers })
    }

    /// Returns the number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// Returns the root.
    pub fn root(&self) -> B256 {
        self.layers.last().and_then(|layer| layer.first()).copied().unwrap_or_default()
    }

    /// Returns the siblings from leaf `index` up to the root, or `None` if out of bounds.
    ///
    /// A single leaf tree has an empty proof.
    pub fn proof(&self, index: usize) -> Option<Vec<B256>> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut current = index;
        let mut proof = Vec::with_capacity(self.layers.len() - 1);
        for layer in &self.layers[..self.layers.len() - 1] {
            proof.push(layer.get(current ^ 1).copied().unwrap_or(B256::ZERO));
            current /= 2;
        }
        Some(proof)
    }
}

/// Recomputes the root from `leaf` at `index` and its `proof`.
pub fn verify_proof(root: B256, leaf: B256, index: u64, proof: &[B256]) -> bool {
    let mut buffer = [0u8; 64];
    let mut current = leaf;
    let mut path = index;
    for sibling in proof {
        current = if path & 1 == 0 {
            hash_pair(&current, sibling, &mut buffer)
        } else {
            hash_pair(sibling, &current, &mut buffer)
        };
        path >>= 1;
    }
    path == 0 && current == root
}
