use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{hash::BlockHash, position::SyncPosition};

/// Opaque state-transition payload carried by a block.
///
/// The reader never looks inside; interpretation belongs to the state sink.
#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct StateTransition(#[serde(with = "hex::serde")] Vec<u8>);

impl StateTransition {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self(payload.into())
    }

    pub fn payload(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for StateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateTransition({} bytes)", self.0.len())
    }
}

/// A block as retrieved from the chain source.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    height: u64,
    hash: BlockHash,

    /// `None` only for the chain's genesis block.
    prev_hash: Option<BlockHash>,

    state_transitions: Vec<StateTransition>,
}

impl Block {
    pub fn new(
        height: u64,
        hash: BlockHash,
        prev_hash: Option<BlockHash>,
        state_transitions: Vec<StateTransition>,
    ) -> Self {
        Self {
            height,
            hash,
            prev_hash,
            state_transitions,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn hash(&self) -> &BlockHash {
        &self.hash
    }

    pub fn prev_hash(&self) -> Option<&BlockHash> {
        self.prev_hash.as_ref()
    }

    pub fn state_transitions(&self) -> &[StateTransition] {
        &self.state_transitions
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }

    /// Position the sync checkpoint moves to once this block is applied.
    pub fn position(&self) -> SyncPosition {
        SyncPosition::new(self.height, self.hash)
    }

    /// Returns true if `self` directly extends `parent`.
    pub fn extends(&self, parent: &SyncPosition) -> bool {
        self.prev_hash.as_ref() == Some(parent.hash())
            && parent.height().checked_add(1) == Some(self.height)
    }
}
