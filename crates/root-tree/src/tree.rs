use sha2::{Digest, Sha256};

use crate::{
    error::RootTreeError,
    proof::{MerkleProof, ProofStep, Side},
};

pub type Hash = [u8; 32];

/// A named component of application state that contributes one leaf to the root.
pub trait RootTreeLeaf {
    fn name(&self) -> &str;

    fn leaf_hash(&self) -> Hash;
}

/// Hashes two sibling nodes into their parent.
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

#[derive(Clone, Debug)]
pub struct RootTree {
    names: Vec<String>,

    /// `levels[0]` holds the leaf hashes, the last level holds the root.
    levels: Vec<Vec<Hash>>,
}

impl RootTree {
    /// Builds a tree from leaves in their fixed order.
    pub fn from_leaves<'a>(leaves: impl IntoIterator<Item = &'a dyn RootTreeLeaf>) -> Self {
        Self::from_hashes(
            leaves
                .into_iter()
                .map(|leaf| (leaf.name().to_owned(), leaf.leaf_hash())),
        )
    }

    pub fn from_hashes(leaves: impl IntoIterator<Item = (String, Hash)>) -> Self {
        let (names, hashes): (Vec<_>, Vec<_>) = leaves.into_iter().unzip();
        Self {
            names,
            levels: build_levels(hashes),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn root_hash(&self) -> Hash {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or([0; 32])
    }

    pub fn leaf_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn leaf_hash(&self, name: &str) -> Option<Hash> {
        self.leaf_index(name).map(|i| self.levels[0][i])
    }

    /// Replaces the hash of a leaf and rebuilds the upper levels.
    pub fn update_leaf(&mut self, name: &str, hash: Hash) -> Result<(), RootTreeError> {
        let index = self
            .leaf_index(name)
            .ok_or_else(|| RootTreeError::UnknownLeaf(name.to_owned()))?;

        let mut leaves = self.levels.swap_remove(0);
        leaves[index] = hash;
        self.levels = build_levels(leaves);
        Ok(())
    }

    pub fn proof(&self, leaf_index: usize) -> Result<MerkleProof, RootTreeError> {
        if leaf_index >= self.len() {
            return Err(RootTreeError::LeafIndexOutOfRange {
                index: leaf_index,
                len: self.len(),
            });
        }

        let mut steps = Vec::new();
        let mut index = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            if let Some(hash) = level.get(sibling) {
                let side = if index % 2 == 0 {
                    Side::Right
                } else {
                    Side::Left
                };
                steps.push(ProofStep {
                    sibling: *hash,
                    side,
                });
            }
            index /= 2;
        }

        Ok(MerkleProof::new(leaf_index, steps))
    }

    pub fn proof_for(&self, name: &str) -> Result<MerkleProof, RootTreeError> {
        let index = self
            .leaf_index(name)
            .ok_or_else(|| RootTreeError::UnknownLeaf(name.to_owned()))?;
        self.proof(index)
    }
}

fn build_levels(leaves: Vec<Hash>) -> Vec<Vec<Hash>> {
    let mut levels = vec![leaves];
    while levels[levels.len() - 1].len() > 1 {
        let next = levels[levels.len() - 1]
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => hash_pair(left, right),
                [single] => *single,
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();
        levels.push(next);
    }
    levels
}
