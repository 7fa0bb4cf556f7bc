use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RootTreeError {
    #[error("leaf index {index} out of range for tree with {len} leaves")]
    LeafIndexOutOfRange { index: usize, len: usize },

    #[error("unknown leaf: {0}")]
    UnknownLeaf(String),
}
