//! Automation surface
//!
//! The bot never touches the meeting page directly. Everything it needs
//! (querying elements, clicking, typing, running scripts, and receiving
//! events from observers installed on the page) goes through the
//! `AutomationSurface` trait.

mod nats;
mod observation;
mod selectors;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::SurfaceError;
use crate::presence::RosterFeed;

pub use self::nats::NatsSurface;
pub use observation::Observation;
pub use selectors::MeetSelectors;

/// Differences between page variants, expressed as flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceCapabilities {
    /// The participant list only exists after opening the people panel
    pub requires_people_panel: bool,
    /// Whether roster observations arrive as deltas or snapshots
    pub roster_feed: RosterFeed,
}

impl Default for SurfaceCapabilities {
    fn default() -> Self {
        Self {
            requires_people_panel: true,
            roster_feed: RosterFeed::Incremental,
        }
    }
}

/// Remote page automation
///
/// Implementations:
/// - `NatsSurface`: drives a browser sidecar over NATS request/reply
#[async_trait::async_trait]
pub trait AutomationSurface: Send + Sync {
    fn capabilities(&self) -> SurfaceCapabilities;

    /// Navigate to the meeting page
    async fn open(&self, url: &str) -> Result<(), SurfaceError>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &str) -> Result<usize, SurfaceError>;

    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool, SurfaceError>;

    async fn is_hidden(&self, selector: &str, timeout: Duration) -> Result<bool, SurfaceError>;

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), SurfaceError>;

    async fn fill(&self, selector: &str, text: &str) -> Result<(), SurfaceError>;

    /// Wait until the selector is visible; `SurfaceError::Timeout` otherwise
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), SurfaceError>;

    /// Evaluate a script in the page and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SurfaceError>;

    /// Install the participant and speech observers and return the channel
    /// their events are delivered on
    async fn observe(&self, capacity: usize) -> Result<mpsc::Receiver<Observation>, SurfaceError>;

    /// Tear down the automation context
    async fn close(&self) -> Result<(), SurfaceError>;
}
