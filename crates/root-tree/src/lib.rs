//! Root tree over a fixed, ordered set of named state leaves.
//!
//! Each leaf (a store in the state sink, for example) exposes its current hash. The
//! root tree combines them with a binary SHA-256 Merkle construction into a single
//! root hash and can produce inclusion proofs for individual leaves.
//!
//! - an empty tree has an all-zero root
//! - a tree with a single leaf has that leaf's hash as root
//! - at each level, a node without a sibling is promoted unchanged

mod error;
mod proof;
mod tree;

pub use error::RootTreeError;
pub use proof::{MerkleProof, ProofStep, Side};
pub use tree::{hash_pair, Hash, RootTree, RootTreeLeaf};
