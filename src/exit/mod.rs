//! Exit condition evaluation
//!
//! Each poll tick the evaluator checks, in priority order, whether the bot
//! should leave: it has been alone too long, it was kicked, the recording
//! hit its maximum length, or nobody has spoken for too long.

use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::session::AutomaticLeaveConfig;
use crate::surface::{AutomationSurface, MeetSelectors};

/// Timeout for each visibility probe in the kick checks
pub const KICK_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Which signal showed the bot is no longer in the meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KickSignal {
    ReturnedHome,
    LeaveButtonHidden,
    RemovedNotice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "reason", content = "signal")]
pub enum ExitReason {
    SoloTimeout,
    Kicked(KickSignal),
    MaxDuration,
    Inactivity,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::SoloTimeout => "solo-timeout",
            ExitReason::Kicked(_) => "kicked",
            ExitReason::MaxDuration => "max-duration",
            ExitReason::Inactivity => "inactivity",
        }
    }

    pub fn is_kick(&self) -> bool {
        matches!(self, ExitReason::Kicked(_))
    }
}

/// Session state read by one evaluation
#[derive(Debug, Clone, Copy)]
pub struct MonitorSnapshot {
    pub now: Instant,
    pub roster_size: usize,
    pub alone_since: Option<Instant>,
    pub capture_started_at: Option<Instant>,
    pub last_activity: Option<Instant>,
}

pub struct ExitEvaluator {
    config: AutomaticLeaveConfig,
    selectors: MeetSelectors,
}

impl ExitEvaluator {
    pub fn new(config: AutomaticLeaveConfig, selectors: MeetSelectors) -> Self {
        Self { config, selectors }
    }

    /// Run every check in priority order; the first hit wins
    pub async fn evaluate(
        &self,
        snapshot: &MonitorSnapshot,
        surface: &dyn AutomationSurface,
    ) -> Option<ExitReason> {
        if self.solo_timeout(snapshot) {
            info!("Only one participant remaining for more than allocated time");
            return Some(ExitReason::SoloTimeout);
        }

        if let Some(signal) = self.kick_signal(surface).await {
            info!("Kicked from the meeting ({:?})", signal);
            return Some(ExitReason::Kicked(signal));
        }

        if self.max_duration(snapshot) {
            info!("Maximum recording duration reached");
            return Some(ExitReason::MaxDuration);
        }

        if self.inactive(snapshot) {
            info!("No speaking activity within the inactivity timeout");
            return Some(ExitReason::Inactivity);
        }

        None
    }

    fn solo_timeout(&self, snapshot: &MonitorSnapshot) -> bool {
        if snapshot.roster_size != 1 {
            return false;
        }
        let Some(since) = snapshot.alone_since else {
            return false;
        };

        let alone_for = snapshot.now.saturating_duration_since(since);
        debug!(
            "Only me left in the meeting ({:.1} / {:.1}s)",
            alone_for.as_secs_f64(),
            self.config.everyone_left_timeout().as_secs_f64()
        );
        alone_for > self.config.everyone_left_timeout()
    }

    /// Each probe counts as a kick when it fails, so a broken surface ends
    /// the loop instead of hanging it
    async fn kick_signal(&self, surface: &dyn AutomationSurface) -> Option<KickSignal> {
        match surface.count(&self.selectors.kicked_detector).await {
            Ok(n) if n > 0 => return Some(KickSignal::ReturnedHome),
            Ok(_) => {}
            Err(e) => {
                warn!("Home screen probe failed, assuming kicked: {}", e);
                return Some(KickSignal::ReturnedHome);
            }
        }

        match surface
            .is_hidden(&self.selectors.leave_button, KICK_PROBE_TIMEOUT)
            .await
        {
            Ok(true) => return Some(KickSignal::LeaveButtonHidden),
            Ok(false) => {}
            Err(e) => {
                warn!("Leave button probe failed, assuming kicked: {}", e);
                return Some(KickSignal::LeaveButtonHidden);
            }
        }

        match surface
            .is_visible(&self.selectors.removed_notice, KICK_PROBE_TIMEOUT)
            .await
        {
            Ok(true) => Some(KickSignal::RemovedNotice),
            Ok(false) => None,
            Err(e) => {
                warn!("Removed notice probe failed, assuming kicked: {}", e);
                Some(KickSignal::RemovedNotice)
            }
        }
    }

    fn max_duration(&self, snapshot: &MonitorSnapshot) -> bool {
        snapshot.capture_started_at.is_some_and(|started| {
            snapshot.now.saturating_duration_since(started) > self.config.max_duration()
        })
    }

    fn inactive(&self, snapshot: &MonitorSnapshot) -> bool {
        snapshot.last_activity.is_some_and(|last| {
            snapshot.now.saturating_duration_since(last) > self.config.inactivity_timeout()
        })
    }
}
