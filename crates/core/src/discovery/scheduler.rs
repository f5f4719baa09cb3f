//! Background loop running discovery cycles on wall-clock boundaries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::pipeline::DiscoveryPipeline;
use super::types::DiscoveryStatus;

/// Waits shorter than this roll over to the following boundary, so a
/// wake-up just before a boundary never fires twice.
const MIN_WAIT: Duration = Duration::from_secs(1);

/// Time from `now` until the next multiple of `interval` since the epoch.
pub fn until_next_tick(now: DateTime<Utc>, interval: Duration) -> Duration {
    let period_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX).max(1);
    let now_ms = now.timestamp_millis();
    let next_ms = (now_ms.div_euclid(period_ms) + 1) * period_ms;

    let wait = Duration::from_millis((next_ms - now_ms) as u64);
    if wait < MIN_WAIT {
        wait + interval
    } else {
        wait
    }
}

/// Runs [`DiscoveryPipeline::tick`] every interval until stopped.
pub struct DiscoveryScheduler {
    pipeline: Arc<DiscoveryPipeline>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl DiscoveryScheduler {
    pub fn new(pipeline: Arc<DiscoveryPipeline>, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            pipeline,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn pipeline(&self) -> &Arc<DiscoveryPipeline> {
        &self.pipeline
    }

    /// Start the background loop.
    ///
    /// The feed snapshot is cleared first, so the first cycle after a
    /// start establishes a fresh baseline.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Discovery scheduler already running");
            return;
        }

        info!(
            "Starting discovery scheduler (every {} min)",
            self.interval.as_secs() / 60
        );

        if let Err(e) = self.pipeline.reset_snapshot().await {
            warn!("Failed to clear feed snapshot: {}", e);
        }

        self.spawn_loop();
    }

    /// Stop the background loop. A cycle already running finishes on its own.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Discovery scheduler not running");
            return;
        }

        info!("Stopping discovery scheduler");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> DiscoveryStatus {
        DiscoveryStatus {
            scheduled: self.is_running(),
            cycle_in_progress: self.pipeline.is_running(),
            interval_minutes: self.interval.as_secs() / 60,
        }
    }

    fn spawn_loop(&self) {
        let running = Arc::clone(&self.running);
        let pipeline = Arc::clone(&self.pipeline);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Discovery loop started");
            loop {
                let wait = until_next_tick(Utc::now(), interval);
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Discovery loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        // Detached so an overrunning cycle meets the run guard
                        // on the next tick instead of delaying it.
                        let pipeline = Arc::clone(&pipeline);
                        tokio::spawn(async move {
                            pipeline.tick().await;
                        });
                    }
                }
            }
            info!("Discovery loop stopped");
        });
    }
}
