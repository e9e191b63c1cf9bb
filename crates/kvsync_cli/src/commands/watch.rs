//! Watch command implementation.

use kvsync_engine::{observer_channel, BatchSync, EngineState, Slots, SyncConfig, TokioTimer};
use kvsync_storage::FileStore;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One line of watch output.
#[derive(Debug, Serialize)]
pub struct ChangeLine<'a> {
    /// Sequence number of the change, starting at 1.
    pub change: usize,
    /// Every tracked key with its value (`null` when absent).
    pub values: &'a Slots,
}

/// Runs the watch command.
///
/// Prints the seeded state, then one JSON line per detected change, until
/// Ctrl-C or until `count` changes were printed.
pub fn run(
    path: &Path,
    keys: Vec<String>,
    interval_ms: u64,
    count: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(path, keys, interval_ms, count))
}

async fn watch(
    path: &Path,
    keys: Vec<String>,
    interval_ms: u64,
    count: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(FileStore::open(path)?);
    let timer = TokioTimer::current()?;
    let config = SyncConfig::new().with_poll_interval(Duration::from_millis(interval_ms));
    let (observer, changes) = observer_channel::<Slots>();

    let sync = BatchSync::open(
        store,
        keys.into_iter().map(|key| (key, None::<String>)),
        &config,
        &timer,
        observer,
    )?;

    if sync.state() == EngineState::Inert {
        warn!("store at {:?} is unavailable, nothing to watch", path);
        return Ok(());
    }
    info!(keys = sync.keys().len(), interval_ms, "watching {:?}", path);

    // The seed read is printed as change 0, not replayed from the channel.
    while changes.try_recv().is_ok() {}
    print_line(0, &sync.values())?;

    let mut printed = 0;
    let mut drain = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            _ = drain.tick() => {
                while let Ok(values) = changes.try_recv() {
                    printed += 1;
                    print_line(printed, &values)?;
                    if count.is_some_and(|limit| printed >= limit) {
                        return Ok(());
                    }
                }
            }
        }
    }

    sync.dispose();
    Ok(())
}

fn print_line(change: usize, values: &Slots) -> Result<(), Box<dyn std::error::Error>> {
    let line = ChangeLine { change, values };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
