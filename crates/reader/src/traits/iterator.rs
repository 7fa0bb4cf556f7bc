use async_trait::async_trait;
use platform_sync_primitives::Block;

use crate::error::ChainSourceError;

/// Cursor over the blocks of the chain source, in ascending height order.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait BlockIterator: Send {
    /// Returns true if a block exists at [`next_height`](Self::next_height).
    ///
    /// May query the source for its current tip.
    async fn has_next(&mut self) -> Result<bool, ChainSourceError>;

    /// Retrieves the block at the cursor and advances it by one.
    async fn next_block(&mut self) -> Result<Block, ChainSourceError>;

    /// Moves the cursor so the next block returned is at `height`.
    fn reset(&mut self, height: u64);

    /// Height of the block the next call to `next_block` returns.
    fn next_height(&self) -> u64;

    /// Returns true if the last check found the cursor past the source tip.
    fn is_done(&self) -> bool;
}
