use std::time::Duration;

use platform_sync_config::ReaderConfig;
use platform_sync_primitives::BlockHash;
use tokio::sync::broadcast;

use crate::events::ReaderEvent;

pub(crate) fn make_config(skip: bool, age_limit: u64, initial: u64) -> ReaderConfig {
    ReaderConfig::new(skip, age_limit, initial)
}

pub(crate) fn make_hash(n: u8) -> BlockHash {
    BlockHash::new([n; 32])
}

/// Returns every event currently buffered in `rx`.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<ReaderEvent>) -> Vec<ReaderEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Waits up to 5s for an event matching `pred`, discarding others.
pub(crate) async fn wait_for_event(
    rx: &mut broadcast::Receiver<ReaderEvent>,
    pred: impl Fn(&ReaderEvent) -> bool,
) -> ReaderEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(err) => panic!("event channel failed: {err}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
