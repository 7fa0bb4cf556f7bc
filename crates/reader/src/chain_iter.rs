use std::sync::Arc;

use async_trait::async_trait;
use platform_sync_primitives::Block;
use tracing::*;

use crate::{
    error::ChainSourceError,
    traits::{block_at_checked, BlockIterator, ChainSource},
};

/// [`BlockIterator`] that walks a [`ChainSource`] by height up to its tip.
///
/// The tip is re-queried whenever the cursor catches up with the last known
/// one, and after every [`reset`](BlockIterator::reset).
#[derive(Debug)]
pub struct ChainBlockIterator<C> {
    source: Arc<C>,
    next_height: u64,
    known_tip: Option<u64>,
    done: bool,
}

impl<C: ChainSource> ChainBlockIterator<C> {
    pub fn new(source: Arc<C>, start_height: u64) -> Self {
        Self {
            source,
            next_height: start_height,
            known_tip: None,
            done: false,
        }
    }

    pub fn source(&self) -> &Arc<C> {
        &self.source
    }
}

#[async_trait]
impl<C: ChainSource> BlockIterator for ChainBlockIterator<C> {
    async fn has_next(&mut self) -> Result<bool, ChainSourceError> {
        if self.known_tip.is_some_and(|tip| self.next_height <= tip) {
            return Ok(true);
        }

        let tip = self.source.best_block_height().await?;
        trace!(%tip, next = self.next_height, "refreshed chain tip");
        self.known_tip = Some(tip);
        self.done = self.next_height > tip;
        Ok(!self.done)
    }

    async fn next_block(&mut self) -> Result<Block, ChainSourceError> {
        if !self.has_next().await? {
            return Err(ChainSourceError::Exhausted(self.next_height));
        }

        let block = block_at_checked(self.source.as_ref(), self.next_height).await?;
        self.next_height += 1;
        Ok(block)
    }

    fn reset(&mut self, height: u64) {
        self.next_height = height;
        self.known_tip = None;
        self.done = false;
    }

    fn next_height(&self) -> u64 {
        self.next_height
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
