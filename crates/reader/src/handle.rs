use std::{future::Future, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use platform_sync_config::{ReaderConfig, SyncTaskConfig};
use tokio::sync::{broadcast, mpsc};

use crate::{
    error::ReaderError,
    events::{EventSink, ReaderEvent},
    read_queue::{ReadQueue, RequestOutcome},
    reader::{BlockchainReader, ResumePoint},
    task::{reader_task, ReaderTaskCtx},
    throttle::{ThrottledTrigger, TriggerOutcome},
    traits::{BlockIterator, StateSink},
};

/// Default ms between sync passes when no new block is announced
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
/// Default number of buffered events per subscriber
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

pub type PassFuture = BoxFuture<'static, Result<(), ReaderError>>;
pub type PassFn = Box<dyn Fn() -> PassFuture + Send + Sync>;
pub type ReadFn = Box<dyn Fn(ResumePoint) -> PassFuture + Send + Sync>;
pub type CaughtUpFn = Box<dyn Fn() -> bool + Send + Sync>;

/// Trigger running [`BlockchainReader::run`].
pub type SyncTrigger = ThrottledTrigger<PassFn>;
/// Queue running [`BlockchainReader::run_from`].
pub type SyncReadQueue = ReadQueue<ReadFn, CaughtUpFn>;

/// Handle for driving a reader and observing its events.
///
/// The reader task exits once every clone of the handle is dropped.
#[derive(Clone, Debug)]
pub struct ReaderHandle {
    trigger: Arc<SyncTrigger>,
    read_queue: Arc<SyncReadQueue>,
    events: EventSink,
    new_block_tx: mpsc::Sender<()>,
}

impl ReaderHandle {
    /// Returns a receiver for reader events emitted from now on.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ReaderEvent> {
        self.events.subscribe()
    }

    /// Runs a sync pass, or coalesces into the one in flight.
    pub async fn sync(&self) -> Result<TriggerOutcome, ReaderError> {
        self.trigger.trigger().await
    }

    /// Runs a sync pass that starts after this call, waiting out any pass
    /// already in flight instead of coalescing into it.
    pub async fn sync_and_wait(&self) -> Result<TriggerOutcome, ReaderError> {
        self.trigger.trigger_and_wait().await
    }

    /// Queues a re-read starting at `resume`.
    pub async fn read_since(&self, resume: ResumePoint) -> Result<RequestOutcome, ReaderError> {
        self.read_queue.request(resume).await
    }

    /// Tells the reader task a new block is available.
    ///
    /// Returns false if the task is gone. Notifications arriving while one is
    /// already pending are merged.
    pub fn notify_new_block(&self) -> bool {
        match self.new_block_tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.trigger.is_running() || self.read_queue.is_running()
    }
}

/// Builder for creating a reader with custom configuration.
#[derive(Debug)]
pub struct ReaderBuilder<I, S> {
    config: ReaderConfig,
    iterator: I,
    sink: Arc<S>,
    poll_interval_ms: Option<u64>,
    event_channel_capacity: Option<usize>,
}

impl<I, S> ReaderBuilder<I, S> {
    pub fn new(config: ReaderConfig, iterator: I, sink: Arc<S>) -> Self {
        Self {
            config,
            iterator,
            sink,
            poll_interval_ms: None,
            event_channel_capacity: None,
        }
    }

    /// Sets the interval between periodic sync passes in milliseconds.
    pub fn with_poll_interval_ms(mut self, v: u64) -> Self {
        self.poll_interval_ms = Some(v);
        self
    }

    /// Sets how many events a subscriber may fall behind before losing some.
    pub fn with_event_channel_capacity(mut self, v: usize) -> Self {
        self.event_channel_capacity = Some(v);
        self
    }

    /// Applies the task settings from the config file.
    pub fn with_task_config(self, config: &SyncTaskConfig) -> Self {
        self.with_poll_interval_ms(config.poll_interval_ms)
            .with_event_channel_capacity(config.event_channel_capacity)
    }

    /// Builds and returns the reader handle and task.
    pub fn build(self) -> (ReaderHandle, impl Future<Output = ()>)
    where
        I: BlockIterator + 'static,
        S: StateSink + 'static,
    {
        let events = EventSink::new(
            self.event_channel_capacity
                .unwrap_or(DEFAULT_EVENT_CHANNEL_CAPACITY),
        );
        let reader = Arc::new(BlockchainReader::new(
            self.config,
            self.iterator,
            self.sink,
            events.clone(),
        ));

        let run_reader = reader.clone();
        let run: PassFn = Box::new(move || -> PassFuture {
            let reader = run_reader.clone();
            Box::pin(async move { reader.run().await })
        });
        let read_reader = reader.clone();
        let read: ReadFn = Box::new(move |resume| -> PassFuture {
            let reader = read_reader.clone();
            Box::pin(async move { reader.run_from(resume).await })
        });
        let caught_up: CaughtUpFn = Box::new(move || reader.is_caught_up());

        let trigger = Arc::new(ThrottledTrigger::new(run));
        let (new_block_tx, new_block_rx) = mpsc::channel(1);
        let handle = ReaderHandle {
            trigger: trigger.clone(),
            read_queue: Arc::new(ReadQueue::new(read, caught_up)),
            events,
            new_block_tx,
        };
        let ctx = ReaderTaskCtx {
            trigger,
            new_block_rx,
            poll_interval: Duration::from_millis(
                self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        };
        let task = reader_task(ctx);

        (handle, task)
    }
}
