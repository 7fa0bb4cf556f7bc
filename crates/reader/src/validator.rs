//! Classification of a candidate block against the last sync position.

use std::fmt;

use platform_sync_config::ReaderConfig;
use platform_sync_primitives::{Block, SyncPosition};

/// How a candidate block relates to the last sync position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The block is the next block to apply.
    Continue,

    /// Blocks between the last position and the candidate are missing.
    Gap { expected_height: u64, got_height: u64 },

    /// The candidate does not extend the last position; the chain diverged
    /// from what was applied at or below `diverged_at_height + 1`.
    Reorg { diverged_at_height: u64 },

    /// The candidate is older than the age limit allows to roll back to.
    InitialOutOfBounds {
        chain_height: u64,
        required_min_height: u64,
    },
}

impl SyncOutcome {
    /// Height the block iterator must restart at, or `None` for [`Continue`].
    ///
    /// [`Continue`]: SyncOutcome::Continue
    pub fn resume_height(&self, config: &ReaderConfig) -> Option<u64> {
        match *self {
            SyncOutcome::Continue => None,
            SyncOutcome::Gap {
                expected_height, ..
            } => Some(expected_height),
            SyncOutcome::Reorg { diverged_at_height } => Some(diverged_at_height),
            SyncOutcome::InitialOutOfBounds { .. } => Some(config.initial_block_height),
        }
    }
}

/// Why the reader restarted iteration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RestartReason {
    Gap { expected_height: u64, got_height: u64 },
    Reorg { diverged_at_height: u64 },
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartReason::Gap {
                expected_height,
                got_height,
            } => write!(f, "gap (expected {expected_height}, got {got_height})"),
            RestartReason::Reorg { diverged_at_height } => {
                write!(f, "reorg (diverged at {diverged_at_height})")
            }
        }
    }
}

/// Classifies `candidate` against the last applied position.
///
/// Rules, first match wins:
/// 1. nothing synced and the candidate is at the initial height: continue
/// 2. nothing synced otherwise: gap, expecting the initial height
/// 3. the candidate links to `previous` by hash and height: continue
/// 4. the candidate is more than the age limit below `previous`: out of bounds
/// 5. the candidate is at most one above `previous`: reorg below the candidate
/// 6. otherwise: gap, expecting the block after `previous`
pub fn validate(
    previous: Option<&SyncPosition>,
    candidate: &Block,
    config: &ReaderConfig,
) -> SyncOutcome {
    let height = candidate.height();

    let Some(previous) = previous else {
        if height == config.initial_block_height {
            return SyncOutcome::Continue;
        }
        return SyncOutcome::Gap {
            expected_height: config.initial_block_height,
            got_height: height,
        };
    };

    if candidate.extends(previous) {
        return SyncOutcome::Continue;
    }

    let prev_height = previous.height();
    if height <= prev_height && prev_height - height > config.max_synced_block_age_limit {
        return SyncOutcome::InitialOutOfBounds {
            chain_height: height,
            required_min_height: prev_height - config.max_synced_block_age_limit,
        };
    }

    if height <= prev_height.saturating_add(1) {
        return SyncOutcome::Reorg {
            diverged_at_height: height.saturating_sub(1),
        };
    }

    SyncOutcome::Gap {
        expected_height: prev_height + 1,
        got_height: height,
    }
}
