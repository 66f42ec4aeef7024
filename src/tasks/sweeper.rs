//! TTL Sweep Task
//!
//! Background tasks that periodically remove expired in-memory entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheTier, ResponseCache};

/// Spawns one sweep task per tier at the tier's check interval.
///
/// Redis expires keys itself, so nothing is spawned for that backend.
/// The returned handles are aborted on shutdown.
pub fn spawn_sweep_tasks(cache: &ResponseCache) -> Vec<JoinHandle<()>> {
    if cache.backend().as_memory().is_none() {
        debug!("Remote backend expires keys natively, no sweep tasks started");
        return Vec::new();
    }

    CacheTier::ALL
        .into_iter()
        .map(|tier| {
            let interval = Duration::from_secs(cache.tier_config(tier).check_interval);
            spawn_sweep_task(cache.clone(), tier, interval)
        })
        .collect()
}

/// Spawns a task that sweeps one tier every `interval`.
///
/// Removed entries are counted as `expired` in the cache statistics.
pub fn spawn_sweep_task(cache: ResponseCache, tier: CacheTier, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            tier = tier.name(),
            interval_secs = interval.as_secs(),
            "Starting TTL sweep task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(store) = cache.backend().as_memory() else {
                return;
            };

            let removed = store.sweep_expired(tier);
            if removed > 0 {
                info!(tier = tier.name(), removed, "TTL sweep: removed expired entries");
            } else {
                debug!(tier = tier.name(), "TTL sweep: no expired entries found");
            }
        }
    })
}
