use thiserror::Error;

/// Errors raised by a [`ChainSource`](crate::ChainSource) or a block iterator.
#[derive(Debug, Error)]
pub enum ChainSourceError {
    /// The chain daemon could not be reached or answered with an error.
    #[error("chain source unavailable: {0}")]
    Unavailable(String),

    #[error("no block at height {0}")]
    MissingBlock(u64),

    #[error("requested block {requested}, source returned block {got}")]
    UnexpectedHeight { requested: u64, got: u64 },

    /// `next_block` was called with no block left at or below the tip.
    #[error("block iterator exhausted at height {0}")]
    Exhausted(u64),
}

impl ChainSourceError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

/// Errors raised by a [`StateSink`](crate::StateSink).
#[derive(Debug, Error)]
pub enum StateSinkError {
    /// The block's state transitions were rejected. Nothing was applied.
    #[error("invalid block: {0}")]
    InvalidBlock(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StateSinkError {
    pub fn invalid_block(msg: impl Into<String>) -> Self {
        Self::InvalidBlock(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

/// Errors that end a sync pass.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(#[from] ChainSourceError),

    /// A block's transitions could not be applied. Only this kind is subject
    /// to the block error policy.
    #[error("failed to apply block {height}: {reason}")]
    Apply { height: u64, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ReaderError {
    /// Maps a failure from [`StateSink::apply_block`](crate::StateSink::apply_block).
    pub(crate) fn from_apply(height: u64, err: StateSinkError) -> Self {
        match err {
            StateSinkError::InvalidBlock(reason) => Self::Apply { height, reason },
            StateSinkError::Database(msg) => Self::Persistence(msg),
        }
    }

    pub fn is_apply(&self) -> bool {
        matches!(self, Self::Apply { .. })
    }

    /// Returns true if the failure is expected to clear on its own, so a later
    /// pass may succeed without intervention.
    ///
    /// Only an unreachable chain source qualifies. Apply failures repeat until
    /// the block is skipped, and persistence failures are fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SourceUnavailable(_) => true,
            Self::Persistence(_) | Self::Apply { .. } => false,
        }
    }
}

/// Outside `apply_block`, every state sink failure is a persistence failure.
impl From<StateSinkError> for ReaderError {
    fn from(err: StateSinkError) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub(crate) type Result<T> = std::result::Result<T, ReaderError>;
