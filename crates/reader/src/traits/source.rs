use async_trait::async_trait;
use platform_sync_primitives::Block;

use crate::error::ChainSourceError;

/// Read access to the external chain daemon.
///
/// A source always has at least its genesis block, so the tip height is
/// always defined.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Returns the height of the current chain tip.
    async fn best_block_height(&self) -> Result<u64, ChainSourceError>;

    /// Retrieves the block at `height` on the current best chain, with its
    /// state transitions.
    async fn block_at(&self, height: u64) -> Result<Block, ChainSourceError>;
}

/// Retrieves the block at `height`, checking that the source returned the
/// block that was asked for.
pub async fn block_at_checked(
    source: &impl ChainSource,
    height: u64,
) -> Result<Block, ChainSourceError> {
    let block = source.block_at(height).await?;
    if block.height() != height {
        return Err(ChainSourceError::UnexpectedHeight {
            requested: height,
            got: block.height(),
        });
    }
    Ok(block)
}
