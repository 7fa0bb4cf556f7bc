use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tracing::*;

use crate::{error::ReaderError, handle::SyncTrigger};

pub(crate) struct ReaderTaskCtx {
    pub(crate) trigger: Arc<SyncTrigger>,
    pub(crate) new_block_rx: mpsc::Receiver<()>,
    pub(crate) poll_interval: Duration,
}

/// Triggers a sync pass on every poll tick and every new block notification.
///
/// Runs until every [`ReaderHandle`](crate::ReaderHandle) is dropped.
pub(crate) async fn reader_task(mut ctx: ReaderTaskCtx) {
    let mut ticker = interval(ctx.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = ticker.tick() => {}
            msg = ctx.new_block_rx.recv() => {
                if msg.is_none() {
                    info!("all reader handles dropped; exiting");
                    return;
                }
                debug!("new block announced");
            }
        }

        match ctx.trigger.trigger().await {
            Ok(outcome) => trace!(?outcome, "sync trigger finished"),
            Err(error) => handle_reader_error(error),
        }
    }
}

/// Logs a failed pass. The task keeps running either way; the next tick
/// retries.
fn handle_reader_error(error: ReaderError) {
    if error.is_transient() {
        warn!(%error, "transient error in sync pass");
    } else {
        error!(%error, "sync pass failed; will retry");
    }
}
