use crate::tree::{hash_pair, Hash};

/// Which side of the running hash a sibling sits on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Hash,
    pub side: Side,
}

/// Inclusion proof for one leaf of a [`RootTree`](crate::RootTree).
///
/// Levels where the node was promoted without a sibling contribute no step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    leaf_index: usize,
    steps: Vec<ProofStep>,
}

impl MerkleProof {
    pub(crate) fn new(leaf_index: usize, steps: Vec<ProofStep>) -> Self {
        Self { leaf_index, steps }
    }

    pub fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    pub fn steps(&self) -> &[ProofStep] {
        &self.steps
    }

    /// Recomputes the root from `leaf_hash` and compares it to `root`.
    pub fn verify(&self, leaf_hash: &Hash, root: &Hash) -> bool {
        let computed = self
            .steps
            .iter()
            .fold(*leaf_hash, |acc, step| match step.side {
                Side::Left => hash_pair(&step.sibling, &acc),
                Side::Right => hash_pair(&acc, &step.sibling),
            });
        computed == *root
    }
}
