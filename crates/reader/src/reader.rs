use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use platform_sync_config::ReaderConfig;
use platform_sync_primitives::{Block, SyncPosition};
use tokio::sync::{broadcast, Mutex};
use tracing::*;

use crate::{
    error::{ReaderError, Result},
    events::{EventSink, ReaderEvent},
    history::SyncHistory,
    policy::{handle_block_error, ErrorAction},
    traits::{BlockIterator, StateSink},
    validator::{validate, RestartReason, SyncOutcome},
};

/// Where a sync pass starts reading.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResumePoint {
    /// The committed sync position. Its block is read again to confirm it is
    /// still on the source's chain.
    Current,

    /// Re-read starting at this height.
    Height(u64),
}

impl fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumePoint::Current => f.write_str("current"),
            ResumePoint::Height(height) => write!(f, "height {height}"),
        }
    }
}

/// Whether the pass loop keeps going after handling a block.
enum Flow {
    Next,
    Done,
}

/// Pulls blocks from the iterator, validates their sequence and applies them
/// to the state sink.
///
/// Only one pass runs at a time; a second caller waits for the iterator.
pub struct BlockchainReader<I, S> {
    config: ReaderConfig,
    iterator: Mutex<I>,
    sink: Arc<S>,
    events: EventSink,
    caught_up: AtomicBool,
}

impl<I, S> fmt::Debug for BlockchainReader<I, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockchainReader")
            .field("config", &self.config)
            .field("caught_up", &self.caught_up)
            .finish_non_exhaustive()
    }
}

impl<I: BlockIterator, S: StateSink> BlockchainReader<I, S> {
    pub fn new(config: ReaderConfig, iterator: I, sink: Arc<S>, events: EventSink) -> Self {
        Self {
            config,
            iterator: Mutex::new(iterator),
            sink,
            events,
            caught_up: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<S> {
        &self.sink
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    /// Returns true if the last pass found no block past the source tip.
    pub fn is_caught_up(&self) -> bool {
        self.caught_up.load(Ordering::Acquire)
    }

    /// Reads every block after the committed position.
    pub async fn run(&self) -> Result<()> {
        self.run_from(ResumePoint::Current).await
    }

    /// Runs a sync pass starting at `resume`.
    ///
    /// Any error that ends the pass is also reported as
    /// [`ReaderEvent::SyncFailed`]. The committed position is never moved past
    /// a block whose effects were not applied, except for blocks skipped by
    /// the error policy.
    #[instrument(name = "sync_pass", skip_all, fields(%resume))]
    pub async fn run_from(&self, resume: ResumePoint) -> Result<()> {
        let mut iterator = self.iterator.lock().await;
        let res = self.read_blocks(&mut *iterator, resume).await;
        if let Err(err) = &res {
            error!(%err, "sync pass failed");
            self.events.emit(ReaderEvent::SyncFailed {
                error: err.to_string(),
            });
        }
        res
    }

    async fn read_blocks(&self, iterator: &mut I, resume: ResumePoint) -> Result<()> {
        let mut history = self.load_history().await?;
        let start = match resume {
            ResumePoint::Current => history
                .tip()
                .map_or(self.config.initial_block_height, SyncPosition::height),
            ResumePoint::Height(height) => height,
        };
        debug!(%start, tip = ?history.tip(), "starting sync pass");
        iterator.reset(start);

        if let (ResumePoint::Current, Some(tip)) = (resume, history.tip().copied()) {
            self.retreat_to_source(iterator, &mut history, tip).await?;
        }

        loop {
            let has_next = iterator.has_next().await?;
            self.caught_up.store(iterator.is_done(), Ordering::Release);
            if !has_next {
                let position = history.tip().copied();
                info!(?position, "fully synced");
                self.events.emit(ReaderEvent::FullySynced(position));
                return Ok(());
            }

            let block = iterator.next_block().await?;
            if history.contains(&block) {
                trace!(height = block.height(), "block already applied");
                continue;
            }

            let outcome = validate(history.tip(), &block, &self.config);
            let flow = match outcome {
                SyncOutcome::Continue => self.handle_next(iterator, &mut history, &block).await?,

                SyncOutcome::Gap {
                    expected_height,
                    got_height,
                } => {
                    let reason = RestartReason::Gap {
                        expected_height,
                        got_height,
                    };
                    self.restart_required(reason, expected_height);
                    iterator.reset(expected_height);
                    Flow::Next
                }

                SyncOutcome::Reorg { diverged_at_height } => {
                    self.handle_reorg(iterator, &mut history, &block, diverged_at_height)
                        .await?;
                    Flow::Next
                }

                SyncOutcome::InitialOutOfBounds {
                    chain_height,
                    required_min_height,
                } => {
                    self.reset_out_of_bounds(
                        iterator,
                        &mut history,
                        chain_height,
                        required_min_height,
                    )
                    .await?;
                    Flow::Next
                }
            };

            if let Flow::Done = flow {
                return Ok(());
            }
        }
    }

    /// Seeds the history from the sink, trusting only entries that end at the
    /// committed position.
    async fn load_history(&self) -> Result<SyncHistory> {
        let window = self.config.history_window();
        let Some(position) = self.sink.sync_position().await? else {
            return Ok(SyncHistory::new(window));
        };

        let recent = self.sink.recent_positions(window).await?;
        if recent.last() != Some(&position) {
            warn!(%position, "recent positions do not end at the sync position, ignoring them");
            return Ok(SyncHistory::from_positions(window, [position]));
        }
        Ok(SyncHistory::from_positions(window, recent))
    }

    /// Applies a block that extends the history, or runs the error policy if
    /// it fails to apply.
    async fn handle_next(
        &self,
        iterator: &mut I,
        history: &mut SyncHistory,
        block: &Block,
    ) -> Result<Flow> {
        let height = block.height();
        let err = match self.apply_and_commit(block).await {
            Ok(()) => {
                history.push(block.position());
                info!(%height, hash = %block.hash(), "applied block");
                self.events.emit(ReaderEvent::BlockApplied {
                    height,
                    hash: *block.hash(),
                });
                return Ok(Flow::Next);
            }
            Err(err) if err.is_apply() => err,
            Err(err) => return Err(err),
        };

        let source_exhausted = !iterator.has_next().await?;
        self.caught_up.store(iterator.is_done(), Ordering::Release);

        let decision = handle_block_error(&err, block, &self.config, source_exhausted);
        match (decision.action, decision.resume_from) {
            (ErrorAction::SkipAndContinue, resume_from) => {
                // the child links to this block, so its position is kept
                self.sink.commit_position(block.position()).await?;
                history.push(block.position());
                warn!(%height, %err, "skipped block that failed to apply");
                self.events.emit(ReaderEvent::BlockSkipped {
                    height,
                    error: err.to_string(),
                });
                iterator.reset(resume_from.unwrap_or(height + 1));
                Ok(Flow::Next)
            }
            (ErrorAction::Abort, _) if self.config.skip_blocks_with_errors => {
                // not skipped yet: it is only skipped once a child can follow it
                warn!(%height, %err, "failed block is the source tip, retrying on the next pass");
                Ok(Flow::Done)
            }
            (ErrorAction::Abort, _) => Err(err),
        }
    }

    async fn apply_and_commit(&self, block: &Block) -> Result<()> {
        self.sink
            .apply_block(block)
            .await
            .map_err(|err| ReaderError::from_apply(block.height(), err))?;
        // a crash before this leaves the position at the parent, so the block
        // is re-applied rather than lost
        self.sink.commit_position(block.position()).await?;
        Ok(())
    }

    fn restart_required(&self, reason: RestartReason, resume_from: u64) {
        warn!(%reason, %resume_from, "restarting block iteration");
        self.events.emit(ReaderEvent::RestartRequired {
            reason,
            resume_from,
        });
    }

    /// Walks the history back below the divergence point. Falls back to a
    /// full reset if no remembered ancestor is left.
    async fn handle_reorg(
        &self,
        iterator: &mut I,
        history: &mut SyncHistory,
        block: &Block,
        diverged_at_height: u64,
    ) -> Result<()> {
        self.restart_required(RestartReason::Reorg { diverged_at_height }, diverged_at_height);
        let stale = self.drop_stale(history, diverged_at_height);

        let Some(ancestor) = history.tip().copied() else {
            let required_min_height = stale
                .first()
                .map_or(self.config.initial_block_height, SyncPosition::height);
            warn!(
                height = block.height(),
                %required_min_height,
                "reorg deeper than the sync history"
            );
            return self
                .reset_out_of_bounds(iterator, history, block.height(), required_min_height)
                .await;
        };

        iterator.reset(ancestor.next_height());
        Ok(())
    }

    /// Checks that the source still serves the committed height.
    ///
    /// If its chain is now shorter, steps down through the remembered heights
    /// to the highest one it has, marks everything above as stale and rolls
    /// the committed position back to it. The block there is then read and
    /// validated as usual. Falls back to a full reset if the source is below
    /// every remembered height.
    async fn retreat_to_source(
        &self,
        iterator: &mut I,
        history: &mut SyncHistory,
        tip: SyncPosition,
    ) -> Result<()> {
        if iterator.has_next().await? {
            return Ok(());
        }

        let floor = history.oldest().map_or(tip.height(), SyncPosition::height);
        let mut height = tip.height();
        while height > floor {
            height -= 1;
            iterator.reset(height);
            if !iterator.has_next().await? {
                continue;
            }

            let diverged_at_height = height + 1;
            self.restart_required(RestartReason::Reorg { diverged_at_height }, height);
            self.drop_stale(history, diverged_at_height);
            if let Some(ancestor) = history.tip().copied() {
                self.sink.commit_position(ancestor).await?;
            }
            return Ok(());
        }

        warn!(%tip, %floor, "source is below every remembered height");
        self.drop_stale(history, floor);
        self.reset_out_of_bounds(iterator, history, floor.saturating_sub(1), floor)
            .await
    }

    /// Drops remembered positions at or above `height`, reporting each one
    /// newest first.
    fn drop_stale(&self, history: &mut SyncHistory, height: u64) -> Vec<SyncPosition> {
        let stale = history.rollback_from(height);
        for position in stale.iter().rev() {
            debug!(%position, "block no longer on the best chain");
            self.events.emit(ReaderEvent::BlockStale(*position));
        }
        stale
    }

    async fn reset_out_of_bounds(
        &self,
        iterator: &mut I,
        history: &mut SyncHistory,
        chain_height: u64,
        required_min_height: u64,
    ) -> Result<()> {
        warn!(
            %chain_height,
            %required_min_height,
            "chain is out of bounds of the sync position, resetting state"
        );
        self.events.emit(ReaderEvent::OutOfBounds {
            chain_height,
            required_min_height,
        });
        self.sink.reset_to_empty().await?;
        history.clear();
        iterator.reset(self.config.initial_block_height);
        Ok(())
    }
}
