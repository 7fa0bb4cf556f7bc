use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::BlockHash;

/// The last block whose effects were durably applied.
///
/// "Nothing synced yet" is expressed as `Option::<SyncPosition>::None` by the
/// code that stores positions, never as a sentinel value here.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SyncPosition {
    height: u64,
    hash: BlockHash,
}

impl SyncPosition {
    pub fn new(height: u64, hash: BlockHash) -> Self {
        Self { height, hash }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    /// Height of the block expected to extend this position.
    pub fn next_height(&self) -> u64 {
        self.height + 1
    }
}

impl fmt::Display for SyncPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.height, self.hash)
    }
}

impl fmt::Debug for SyncPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SyncPosition(height={}, hash={:?})",
            self.height, self.hash
        )
    }
}
