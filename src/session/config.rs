use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SessionError;

/// Timeouts that make the bot leave on its own. Fixed for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomaticLeaveConfig {
    /// How long to wait in the waiting room before giving up
    #[serde(alias = "waitingRoomTimeout")]
    pub waiting_room_timeout_ms: u64,

    /// How long the bot may stay alone before leaving
    #[serde(alias = "everyoneLeftTimeout")]
    pub everyone_left_timeout_ms: u64,

    /// Hard cap on the recording length
    #[serde(alias = "maxDuration")]
    pub max_duration_ms: u64,

    /// How long without any speech before leaving
    #[serde(alias = "inactivityTimeout")]
    pub inactivity_timeout_ms: u64,
}

impl Default for AutomaticLeaveConfig {
    fn default() -> Self {
        Self {
            waiting_room_timeout_ms: 300_000,   // 5 minutes
            everyone_left_timeout_ms: 60_000,   // 1 minute
            max_duration_ms: 4 * 60 * 60 * 1000, // 4 hours
            inactivity_timeout_ms: 900_000,     // 15 minutes
        }
    }
}

impl AutomaticLeaveConfig {
    pub fn waiting_room_timeout(&self) -> Duration {
        Duration::from_millis(self.waiting_room_timeout_ms)
    }

    pub fn everyone_left_timeout(&self) -> Duration {
        Duration::from_millis(self.everyone_left_timeout_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }
}

/// Configuration for a bot session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "bot-3f2c...")
    pub session_id: String,

    /// Meeting URL to join
    pub meeting_url: String,

    /// Name shown to other participants
    pub display_name: String,

    pub automatic_leave: AutomaticLeaveConfig,

    /// Interval between exit condition checks
    /// Default: 5 seconds
    pub poll_interval: Duration,

    /// Capacity of the inbound observation channel
    pub observation_capacity: usize,

    /// Bound on the best-effort leave click
    pub leave_click_timeout: Duration,

    /// Where page snapshots are written for debugging, if anywhere
    pub debug_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("bot-{}", uuid::Uuid::new_v4()),
            meeting_url: String::new(),
            display_name: "MeetingBot".to_string(),
            automatic_leave: AutomaticLeaveConfig::default(),
            poll_interval: Duration::from_secs(5),
            observation_capacity: 256,
            leave_click_timeout: Duration::from_secs(1),
            debug_dir: None,
        }
    }
}

impl SessionConfig {
    /// Check the configuration once before the session starts
    pub fn validate(&self) -> Result<(), SessionError> {
        let invalid = |msg: String| -> Result<(), SessionError> {
            Err(SessionError::Fatal(format!("invalid session config: {}", msg)))
        };

        if self.session_id.trim().is_empty() {
            return invalid("session id is empty".to_string());
        }
        if !(self.meeting_url.starts_with("https://") || self.meeting_url.starts_with("http://")) {
            return invalid(format!("meeting url `{}` is not an http(s) url", self.meeting_url));
        }
        if self.display_name.trim().is_empty() {
            return invalid("display name is empty".to_string());
        }

        let leave = &self.automatic_leave;
        for (name, value) in [
            ("waiting_room_timeout_ms", leave.waiting_room_timeout_ms),
            ("everyone_left_timeout_ms", leave.everyone_left_timeout_ms),
            ("max_duration_ms", leave.max_duration_ms),
            ("inactivity_timeout_ms", leave.inactivity_timeout_ms),
        ] {
            if value == 0 {
                return invalid(format!("{} must be greater than zero", name));
            }
        }

        if self.poll_interval.is_zero() {
            return invalid("poll interval must be greater than zero".to_string());
        }
        if self.observation_capacity == 0 {
            return invalid("observation capacity must be greater than zero".to_string());
        }

        Ok(())
    }
}
