use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use platform_sync_primitives::{hash::sha256d, Block, BlockHash, StateTransition};

use crate::{error::ChainSourceError, traits::ChainSource};

/// Chain source backed by an in-memory chain that can be extended, rewound and
/// forked.
#[derive(Debug)]
pub struct MemoryChainSource {
    state: Mutex<ChainState>,
}

#[derive(Debug)]
struct ChainState {
    genesis_height: u64,
    blocks: BTreeMap<u64, Block>,
    available: bool,
}

impl MemoryChainSource {
    /// Creates a chain holding only its genesis block at `genesis_height`.
    pub fn new(genesis_height: u64) -> Self {
        let source = Self {
            state: Mutex::new(ChainState {
                genesis_height,
                blocks: BTreeMap::new(),
                available: true,
            }),
        };
        source.mine(Vec::new());
        source
    }

    pub fn tip(&self) -> Option<Block> {
        self.state
            .lock()
            .blocks
            .last_key_value()
            .map(|(_, b)| b.clone())
    }

    pub fn block(&self, height: u64) -> Option<Block> {
        self.state.lock().blocks.get(&height).cloned()
    }

    /// Appends a block carrying `transitions` on top of the tip.
    pub fn mine(&self, transitions: Vec<StateTransition>) -> Block {
        self.mine_with_salt(transitions, 0)
    }

    /// Like [`mine`](Self::mine), with `salt` mixed into the hash so a fork at
    /// the same height gets a different block.
    pub fn mine_with_salt(&self, transitions: Vec<StateTransition>, salt: u8) -> Block {
        let mut state = self.state.lock();
        let (height, prev_hash) = match state.blocks.last_key_value() {
            Some((height, tip)) => (height + 1, Some(*tip.hash())),
            None => (state.genesis_height, None),
        };

        let mut preimage = Vec::new();
        preimage.extend_from_slice(&height.to_le_bytes());
        preimage.extend_from_slice(prev_hash.unwrap_or_else(BlockHash::zero).as_bytes());
        preimage.push(salt);
        for transition in &transitions {
            preimage.extend_from_slice(transition.payload());
        }

        let block = Block::new(height, sha256d(&preimage), prev_hash, transitions);
        state.blocks.insert(height, block.clone());
        block
    }

    /// Mines `count` blocks with one non-empty transition each.
    pub fn mine_many(&self, count: usize, salt: u8) -> Vec<Block> {
        (0..count)
            .map(|_| {
                let next = self.tip().map_or(0, |tip| tip.height() + 1);
                let payload = format!("transition-{next}-{salt}");
                self.mine_with_salt(vec![StateTransition::new(payload)], salt)
            })
            .collect()
    }

    /// Drops every block at or above `height`, returning them.
    pub fn rewind(&self, height: u64) -> Vec<Block> {
        let mut state = self.state.lock();
        let removed = state.blocks.split_off(&height);
        removed.into_values().collect()
    }

    /// Stores `block` at its height as-is, without any linkage checks.
    pub fn insert(&self, block: Block) {
        self.state.lock().blocks.insert(block.height(), block);
    }

    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }
}

#[async_trait]
impl ChainSource for MemoryChainSource {
    async fn best_block_height(&self) -> Result<u64, ChainSourceError> {
        let state = self.state.lock();
        if !state.available {
            return Err(ChainSourceError::unavailable("memory chain offline"));
        }
        state
            .blocks
            .last_key_value()
            .map(|(height, _)| *height)
            .ok_or_else(|| ChainSourceError::unavailable("memory chain is empty"))
    }

    async fn block_at(&self, height: u64) -> Result<Block, ChainSourceError> {
        let state = self.state.lock();
        if !state.available {
            return Err(ChainSourceError::unavailable("memory chain offline"));
        }
        state
            .blocks
            .get(&height)
            .cloned()
            .ok_or(ChainSourceError::MissingBlock(height))
    }
}
