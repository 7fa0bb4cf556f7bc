use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use platform_sync_primitives::{hash::sha256, Block, BlockHash, SyncPosition};
use platform_sync_root_tree::{Hash, RootTree, RootTreeLeaf};

use crate::{error::StateSinkError, traits::StateSink};

const TRANSITIONS_LEAF: &str = "transitions";
const SYNC_POSITION_LEAF: &str = "sync_position";

/// State sink that keeps everything in memory.
///
/// Applied transitions are folded into a running digest per height, so
/// re-applying a height after a reorg replaces what the old block contributed.
/// A block with an empty state transition is rejected as invalid.
#[derive(Debug, Default)]
pub struct MemoryStateSink {
    state: Mutex<SinkState>,
}

#[derive(Debug, Default)]
struct SinkState {
    positions: BTreeMap<u64, BlockHash>,

    /// Running digest of applied transitions after the block at each height.
    digests: BTreeMap<u64, Hash>,

    /// Heights passed to `apply_block` that succeeded, in call order.
    apply_log: Vec<u64>,
}

impl SinkState {
    fn tip_position(&self) -> Option<SyncPosition> {
        self.positions
            .last_key_value()
            .map(|(height, hash)| SyncPosition::new(*height, *hash))
    }

    fn transitions_digest(&self) -> Hash {
        self.digests
            .last_key_value()
            .map(|(_, digest)| *digest)
            .unwrap_or([0; 32])
    }
}

impl MemoryStateSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink that already synced up to `position`.
    ///
    /// No transitions are recorded for the blocks below it.
    pub fn with_position(position: SyncPosition) -> Self {
        let sink = Self::new();
        sink.state
            .lock()
            .positions
            .insert(position.height(), *position.hash());
        sink
    }

    /// Heights of every successful `apply_block` call, in order.
    pub fn applied_heights(&self) -> Vec<u64> {
        self.state.lock().apply_log.clone()
    }

    /// Digest over the transitions of every block applied on the current chain.
    pub fn transitions_digest(&self) -> Hash {
        self.state.lock().transitions_digest()
    }

    /// Root over the sink's leaves: applied transitions, then sync position.
    pub fn root_tree(&self) -> RootTree {
        let state = self.state.lock();
        let transitions = DigestLeaf {
            name: TRANSITIONS_LEAF,
            hash: state.transitions_digest(),
        };
        let position = DigestLeaf {
            name: SYNC_POSITION_LEAF,
            hash: state.tip_position().map_or([0; 32], |p| position_hash(&p)),
        };
        RootTree::from_leaves([&transitions as &dyn RootTreeLeaf, &position])
    }

    pub fn root_hash(&self) -> Hash {
        self.root_tree().root_hash()
    }
}

fn position_hash(position: &SyncPosition) -> Hash {
    let mut buf = Vec::with_capacity(8 + 32);
    buf.extend_from_slice(&position.height().to_le_bytes());
    buf.extend_from_slice(position.hash().as_bytes());
    sha256(&buf)
}

struct DigestLeaf {
    name: &'static str,
    hash: Hash,
}

impl RootTreeLeaf for DigestLeaf {
    fn name(&self) -> &str {
        self.name
    }

    fn leaf_hash(&self) -> Hash {
        self.hash
    }
}

#[async_trait]
impl StateSink for MemoryStateSink {
    async fn sync_position(&self) -> Result<Option<SyncPosition>, StateSinkError> {
        Ok(self.state.lock().tip_position())
    }

    async fn recent_positions(&self, limit: usize) -> Result<Vec<SyncPosition>, StateSinkError> {
        let state = self.state.lock();
        let mut recent: Vec<_> = state
            .positions
            .iter()
            .rev()
            .take(limit)
            .map(|(height, hash)| SyncPosition::new(*height, *hash))
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn apply_block(&self, block: &Block) -> Result<(), StateSinkError> {
        // validate everything before touching state
        if let Some(index) = block.state_transitions().iter().position(|t| t.is_empty()) {
            return Err(StateSinkError::invalid_block(format!(
                "empty state transition at index {index}"
            )));
        }

        let mut state = self.state.lock();
        let height = block.height();
        state.digests.retain(|h, _| *h < height);

        let mut digest = state.transitions_digest();
        for transition in block.state_transitions() {
            let mut buf = Vec::with_capacity(32 + transition.len());
            buf.extend_from_slice(&digest);
            buf.extend_from_slice(transition.payload());
            digest = sha256(&buf);
        }
        state.digests.insert(height, digest);
        state.apply_log.push(height);
        Ok(())
    }

    async fn commit_position(&self, position: SyncPosition) -> Result<(), StateSinkError> {
        // committing below the tip rolls back what the dropped blocks applied
        let mut state = self.state.lock();
        state.positions.retain(|h, _| *h < position.height());
        state.digests.retain(|h, _| *h <= position.height());
        state.positions.insert(position.height(), *position.hash());
        Ok(())
    }

    async fn reset_to_empty(&self) -> Result<(), StateSinkError> {
        let mut state = self.state.lock();
        state.positions.clear();
        state.digests.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use platform_sync_primitives::StateTransition;

    use super::*;

    fn block(height: u64, tag: u8, payloads: &[&[u8]]) -> Block {
        Block::new(
            height,
            BlockHash::new([tag; 32]),
            None,
            payloads.iter().map(|p| StateTransition::new(*p)).collect(),
        )
    }

    fn pos(height: u64, tag: u8) -> SyncPosition {
        SyncPosition::new(height, BlockHash::new([tag; 32]))
    }

    #[tokio::test]
    async fn test_empty_sink() {
        let sink = MemoryStateSink::new();
        assert_eq!(sink.sync_position().await.unwrap(), None);
        assert!(sink.recent_positions(5).await.unwrap().is_empty());
        assert_eq!(sink.transitions_digest(), [0; 32]);
    }

    #[tokio::test]
    async fn test_commit_replaces_positions_above() {
        let sink = MemoryStateSink::new();
        for height in 1..=5 {
            sink.commit_position(pos(height, 1)).await.unwrap();
        }
        sink.commit_position(pos(3, 2)).await.unwrap();

        assert_eq!(sink.sync_position().await.unwrap(), Some(pos(3, 2)));
        assert_eq!(
            sink.recent_positions(2).await.unwrap(),
            vec![pos(2, 1), pos(3, 2)]
        );
    }

    #[tokio::test]
    async fn test_commit_below_tip_rolls_back_transitions() {
        let sink = MemoryStateSink::new();
        let shorter = MemoryStateSink::new();
        for (height, payload) in [(1, &b"a"[..]), (2, &b"b"[..]), (3, &b"c"[..])] {
            let block = block(height, 1, &[payload]);
            sink.apply_block(&block).await.unwrap();
            sink.commit_position(block.position()).await.unwrap();
            if height < 3 {
                shorter.apply_block(&block).await.unwrap();
                shorter.commit_position(block.position()).await.unwrap();
            }
        }

        sink.commit_position(pos(2, 1)).await.unwrap();

        assert_eq!(sink.transitions_digest(), shorter.transitions_digest());
        assert_eq!(sink.root_hash(), shorter.root_hash());
    }

    #[tokio::test]
    async fn test_invalid_block_leaves_no_effect() {
        let sink = MemoryStateSink::new();
        sink.apply_block(&block(1, 1, &[b"a"])).await.unwrap();
        let before = sink.transitions_digest();

        let err = sink
            .apply_block(&block(2, 2, &[b"b", b""]))
            .await
            .unwrap_err();
        assert!(matches!(err, StateSinkError::InvalidBlock(_)));
        assert_eq!(sink.transitions_digest(), before);
        assert_eq!(sink.applied_heights(), vec![1]);
    }

    #[tokio::test]
    async fn test_reapplying_height_replaces_effects() {
        let main = MemoryStateSink::new();
        main.apply_block(&block(1, 1, &[b"a"])).await.unwrap();
        main.apply_block(&block(2, 2, &[b"b"])).await.unwrap();
        main.apply_block(&block(2, 3, &[b"c"])).await.unwrap();

        let fresh = MemoryStateSink::new();
        fresh.apply_block(&block(1, 1, &[b"a"])).await.unwrap();
        fresh.apply_block(&block(2, 3, &[b"c"])).await.unwrap();

        assert_eq!(main.transitions_digest(), fresh.transitions_digest());
    }

    #[tokio::test]
    async fn test_root_hash_tracks_position_and_transitions() {
        let sink = MemoryStateSink::new();
        let empty_root = sink.root_hash();

        sink.apply_block(&block(1, 1, &[b"a"])).await.unwrap();
        let applied_root = sink.root_hash();
        assert_ne!(applied_root, empty_root);

        sink.commit_position(pos(1, 1)).await.unwrap();
        let committed_root = sink.root_hash();
        assert_ne!(committed_root, applied_root);

        let tree = sink.root_tree();
        let proof = tree.proof_for(SYNC_POSITION_LEAF).unwrap();
        assert!(proof.verify(&position_hash(&pos(1, 1)), &committed_root));

        sink.reset_to_empty().await.unwrap();
        assert_eq!(sink.root_hash(), empty_root);
        assert_eq!(sink.sync_position().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_with_position() {
        let sink = MemoryStateSink::with_position(pos(100, 7));
        assert_eq!(sink.sync_position().await.unwrap(), Some(pos(100, 7)));
        assert_eq!(sink.recent_positions(13).await.unwrap(), vec![pos(100, 7)]);
    }
}
