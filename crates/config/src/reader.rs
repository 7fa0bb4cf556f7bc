use serde::{Deserialize, Serialize};

/// Default value for `max_synced_block_age_limit` in [`ReaderConfig`].
const DEFAULT_MAX_SYNCED_BLOCK_AGE_LIMIT: u64 = 12;

/// Default value for `initial_block_height` in [`ReaderConfig`].
const DEFAULT_INITIAL_BLOCK_HEIGHT: u64 = 1;

/// Blockchain reader configuration. Fixed once the reader is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Skip blocks whose state transitions fail to apply instead of aborting the pass.
    #[serde(default)]
    pub skip_blocks_with_errors: bool,

    /// How many blocks behind the last synced position a candidate block may be before
    /// the reader gives up on incremental reconciliation and resyncs from scratch. Also
    /// bounds how far a reorg walk-back may go.
    #[serde(default = "default_max_synced_block_age_limit")]
    pub max_synced_block_age_limit: u64,

    /// First block height the platform cares about.
    #[serde(default = "default_initial_block_height")]
    pub initial_block_height: u64,
}

impl ReaderConfig {
    pub fn new(
        skip_blocks_with_errors: bool,
        max_synced_block_age_limit: u64,
        initial_block_height: u64,
    ) -> Self {
        Self {
            skip_blocks_with_errors,
            max_synced_block_age_limit,
            initial_block_height,
        }
    }

    /// Number of recently applied positions the reader keeps for reorg walk-back.
    pub fn history_window(&self) -> usize {
        self.max_synced_block_age_limit.saturating_add(1) as usize
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            skip_blocks_with_errors: false,
            max_synced_block_age_limit: DEFAULT_MAX_SYNCED_BLOCK_AGE_LIMIT,
            initial_block_height: DEFAULT_INITIAL_BLOCK_HEIGHT,
        }
    }
}

fn default_max_synced_block_age_limit() -> u64 {
    DEFAULT_MAX_SYNCED_BLOCK_AGE_LIMIT
}

fn default_initial_block_height() -> u64 {
    DEFAULT_INITIAL_BLOCK_HEIGHT
}
