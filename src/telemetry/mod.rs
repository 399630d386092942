//! Status telemetry
//!
//! Every state transition and roster change is reported through an
//! `EventReporter`. Reporting never decides session flow: failures are
//! logged by the caller and the session carries on.

mod events;
mod heartbeat;
mod nats;

use anyhow::Result;
use tracing::info;

pub use events::{BotEventMessage, EventCode, HeartbeatMessage};
pub use heartbeat::spawn_heartbeat;
pub use self::nats::NatsReporter;

#[async_trait::async_trait]
pub trait EventReporter: Send + Sync {
    /// Report an event with an optional JSON payload
    async fn report(&self, code: EventCode, payload: Option<serde_json::Value>) -> Result<()>;

    /// Signal that the bot process is still alive
    async fn heartbeat(&self) -> Result<()>;
}

/// Reporter that only logs, used when no NATS server is configured
#[derive(Debug, Clone)]
pub struct TracingReporter {
    bot_id: String,
}

impl TracingReporter {
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            bot_id: bot_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl EventReporter for TracingReporter {
    async fn report(&self, code: EventCode, payload: Option<serde_json::Value>) -> Result<()> {
        match payload {
            Some(payload) => info!("[{}] {} {}", self.bot_id, code.as_str(), payload),
            None => info!("[{}] {}", self.bot_id, code.as_str()),
        }
        Ok(())
    }

    async fn heartbeat(&self) -> Result<()> {
        tracing::debug!("[{}] heartbeat", self.bot_id);
        Ok(())
    }
}
