//! Periodic removal of expired cache entries.
//!
//! Lookups already purge the stale entries they touch; the sweeper keeps
//! entries nobody asks for again from sitting in the store until the next
//! capacity eviction.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::pipeline::Pipeline;

pub struct CacheSweeper {
    pipeline: Pipeline,
    interval: Duration,
}

impl CacheSweeper {
    pub fn new(pipeline: Pipeline, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.interval.is_zero() {
            tracing::info!("Cache sweeper disabled");
            return;
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Cache sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.pipeline.purge_expired();
                    if removed > 0 {
                        tracing::debug!(removed, "Swept expired cache entries");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cache sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
