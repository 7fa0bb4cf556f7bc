//! Platform sync entrypoint.
//!
//! Runs the blockchain reader against an in-memory chain that keeps mining
//! blocks (and optionally competing branches), logging every reader event.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use argh::from_env;
use platform_sync_common::logging::{self, LoggerConfig};
use platform_sync_config::{load_config, Config};
use platform_sync_primitives::StateTransition;
use platform_sync_reader::{
    stubs::{MemoryChainSource, MemoryStateSink},
    ChainBlockIterator, ReaderBuilder, ReaderEvent, ReaderHandle, StateSink,
};
use tokio::{
    runtime,
    sync::broadcast::{self, error::RecvError},
    time::sleep,
};
use tracing::*;

use crate::args::Args;

mod args;

const SERVICE_NAME: &str = "platform-sync";

fn main() -> Result<()> {
    let args: Args = from_env();

    let config = match &args.config {
        Some(path) => load_config(path)
            .map_err(|e| anyhow!("failed to load configuration: {e:#}"))?,
        None => Config::default(),
    };

    logging::init(LoggerConfig::from_logging_config(
        SERVICE_NAME,
        &config.logging,
    ))?;

    let rt = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("platform-sync-rt")
        .build()?;

    rt.block_on(run(args, config))
}

async fn run(args: Args, config: Config) -> Result<()> {
    let chain = Arc::new(MemoryChainSource::new(config.reader.initial_block_height));
    let sink = Arc::new(MemoryStateSink::new());

    let iterator = ChainBlockIterator::new(chain.clone(), config.reader.initial_block_height);
    let (handle, task) = ReaderBuilder::new(config.reader, iterator, sink.clone())
        .with_task_config(&config.sync)
        .build();
    let events = handle.subscribe_events();

    let task = tokio::spawn(task);
    let logger = tokio::spawn(log_events(events));

    mine_blocks(&args, &chain, &handle).await;

    // a pass started after the last block, so the sink ends at the tip
    handle.sync_and_wait().await?;
    let position = sink.sync_position().await?;
    info!(
        ?position,
        root = %hex::encode(sink.root_hash()),
        "simulation finished"
    );

    drop(handle);
    task.await?;
    logger.await?;
    Ok(())
}

async fn mine_blocks(args: &Args, chain: &MemoryChainSource, handle: &ReaderHandle) {
    let interval = Duration::from_millis(args.block_interval_ms);
    let genesis_height = chain.tip().map_or(0, |b| b.height());
    let mut branch: u8 = 0;

    for n in 1..=args.blocks {
        sleep(interval).await;

        let reorg_due = args.reorg_every.is_some_and(|every| every > 0 && n % every == 0);
        if reorg_due {
            if let Some(tip) = chain.tip() {
                // genesis stays
                let fork_height = (tip.height().saturating_sub(args.reorg_depth) + 1)
                    .max(genesis_height + 1);
                let dropped = chain.rewind(fork_height);
                branch = branch.wrapping_add(1);
                info!(%fork_height, dropped = dropped.len(), %branch, "mining competing branch");
                chain.mine_many(dropped.len(), branch);
            }
        }

        let block = chain.mine_with_salt(
            vec![StateTransition::new(format!("transfer-{n}").into_bytes())],
            branch,
        );
        debug!(height = block.height(), hash = %block.hash(), "mined block");

        if !handle.notify_new_block() {
            warn!("reader task is gone; stopping");
            return;
        }
    }
}

async fn log_events(mut rx: broadcast::Receiver<ReaderEvent>) {
    loop {
        match rx.recv().await {
            Ok(ReaderEvent::SyncFailed { error }) => error!(%error, "sync pass failed"),
            Ok(ReaderEvent::BlockSkipped { height, error }) => {
                warn!(%height, %error, "block skipped")
            }
            Ok(event) => info!(?event, "reader event"),
            Err(RecvError::Lagged(missed)) => warn!(%missed, "event log fell behind"),
            Err(RecvError::Closed) => return,
        }
    }
}
