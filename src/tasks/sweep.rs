//! Fallback Sweep Task
//!
//! Background task that periodically removes expired entries from the local
//! fallback store. Lazy eviction on read handles hot keys; this sweep keeps
//! cold expired entries from accumulating.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::FallbackStore;

/// Spawns a background task that periodically sweeps the fallback store.
///
/// The task runs on a fixed interval for the lifetime of the cache manager.
/// The returned handle is owned by the manager and aborted by `close()`.
///
/// # Arguments
/// * `store` - Shared fallback store
/// * `sweep_interval_secs` - Interval in seconds between sweep runs
pub fn spawn_sweep_task(store: Arc<FallbackStore>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting fallback sweep task with interval of {} seconds",
            sweep_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.sweep().await;

            if removed > 0 {
                info!("Fallback sweep: removed {} expired entries", removed);
            } else {
                debug!("Fallback sweep: no expired entries found");
            }
        }
    })
}
