use platform_sync_primitives::{BlockHash, SyncPosition};
use tokio::sync::broadcast;
use tracing::*;

use crate::validator::RestartReason;

/// Lifecycle events reported by a reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReaderEvent {
    /// The source has no block past the position. `None` if nothing was synced.
    FullySynced(Option<SyncPosition>),

    BlockApplied { height: u64, hash: BlockHash },

    /// A previously applied block is no longer on the source's best chain.
    BlockStale(SyncPosition),

    /// Iteration restarts at `resume_from`.
    RestartRequired {
        reason: RestartReason,
        resume_from: u64,
    },

    /// Local state was too far from the chain to roll back and gets reset.
    ///
    /// `chain_height` is the height of the offending block, or one below the
    /// oldest remembered height when the source fell below all of them.
    OutOfBounds {
        chain_height: u64,
        required_min_height: u64,
    },

    /// The block failed to apply and its child is applied on top of it.
    BlockSkipped { height: u64, error: String },

    SyncFailed { error: String },
}

/// Sending half of the event channel.
///
/// Emission never blocks. Slow subscribers lose the oldest events.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: broadcast::Sender<ReaderEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ReaderEvent) {
        trace!(?event, "emitting reader event");
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}
