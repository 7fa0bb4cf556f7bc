use async_trait::async_trait;
use platform_sync_primitives::{Block, SyncPosition};

use crate::error::StateSinkError;

/// Local application state the reader applies blocks to.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait StateSink: Send + Sync {
    /// Returns the last committed position, or `None` if nothing was synced yet.
    async fn sync_position(&self) -> Result<Option<SyncPosition>, StateSinkError>;

    /// Returns up to `limit` of the most recently committed positions, oldest
    /// first. The last entry equals [`sync_position`](Self::sync_position).
    async fn recent_positions(&self, limit: usize) -> Result<Vec<SyncPosition>, StateSinkError>;

    /// Applies every state transition of `block`.
    ///
    /// Must be all-or-nothing: on [`StateSinkError::InvalidBlock`] no effect of
    /// the block may remain.
    async fn apply_block(&self, block: &Block) -> Result<(), StateSinkError>;

    /// Durably records `position` as the last synced block. Recorded positions
    /// at or above `position.height()` are replaced.
    async fn commit_position(&self, position: SyncPosition) -> Result<(), StateSinkError>;

    /// Discards all applied state and the sync position.
    async fn reset_to_empty(&self) -> Result<(), StateSinkError>;
}
