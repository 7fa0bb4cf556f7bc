use platform_sync_config::ReaderConfig;
use platform_sync_primitives::Block;
use tracing::*;

use crate::error::ReaderError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorAction {
    Abort,
    SkipAndContinue,
}

/// What the reader does after a block failed to apply.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ErrorDecision {
    pub action: ErrorAction,

    /// Height to resume at when skipping.
    pub resume_from: Option<u64>,
}

impl ErrorDecision {
    fn abort() -> Self {
        Self {
            action: ErrorAction::Abort,
            resume_from: None,
        }
    }
}

/// Decides how to continue after `block` failed to apply with `error`.
///
/// `source_exhausted` is true when `block` is the last block the source has,
/// in which case there is nothing to skip to.
pub fn handle_block_error(
    error: &ReaderError,
    block: &Block,
    config: &ReaderConfig,
    source_exhausted: bool,
) -> ErrorDecision {
    if !config.skip_blocks_with_errors {
        debug!(height = block.height(), %error, "skipping disabled, aborting");
        return ErrorDecision::abort();
    }

    if source_exhausted {
        debug!(height = block.height(), %error, "failed block is the source tip");
        return ErrorDecision::abort();
    }

    ErrorDecision {
        action: ErrorAction::SkipAndContinue,
        resume_from: Some(block.height() + 1),
    }
}
