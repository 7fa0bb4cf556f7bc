//! Blockchain reader: pulls blocks from a chain source, checks that they form a
//! consistent sequence and applies them to local state.
//!
//! Passes are started through a [`ThrottledTrigger`], which never runs two at
//! once and folds concurrent triggers into a single rerun, or through a
//! [`ReadQueue`] of explicit resume points. Gaps, reorganizations and blocks
//! older than the configured age limit are detected by [`validate`] and
//! handled by restarting iteration; blocks that fail to apply go through
//! [`handle_block_error`]. Everything the reader does is reported as a
//! [`ReaderEvent`].

mod chain_iter;
mod error;
mod events;
mod handle;
mod history;
mod policy;
mod read_queue;
mod reader;
pub mod stubs;
mod task;
#[cfg(test)]
pub(crate) mod test_utils;
mod throttle;
mod traits;
mod validator;

pub use chain_iter::ChainBlockIterator;
pub use error::{ChainSourceError, ReaderError, StateSinkError};
pub use events::{EventSink, ReaderEvent};
pub use handle::{
    CaughtUpFn, PassFn, PassFuture, ReadFn, ReaderBuilder, ReaderHandle, SyncReadQueue,
    SyncTrigger,
};
pub use policy::{handle_block_error, ErrorAction, ErrorDecision};
pub use read_queue::{ReadQueue, RequestOutcome};
pub use reader::{BlockchainReader, ResumePoint};
pub use throttle::{ThrottledTrigger, TriggerOutcome};
#[cfg(any(test, feature = "test-utils"))]
pub use traits::{MockBlockIterator, MockChainSource, MockStateSink};
pub use traits::{block_at_checked, BlockIterator, ChainSource, StateSink};
pub use validator::{validate, RestartReason, SyncOutcome};
