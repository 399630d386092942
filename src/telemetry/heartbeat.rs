use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::EventReporter;

/// Report a heartbeat every `interval` until the returned task is aborted
pub fn spawn_heartbeat(reporter: Arc<dyn EventReporter>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Heartbeat started ({:?} interval)", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = reporter.heartbeat().await {
                warn!("Failed to send heartbeat: {:#}", e);
            }
        }
    })
}
