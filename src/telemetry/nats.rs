use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

use super::events::{BotEventMessage, EventCode, HeartbeatMessage};
use super::EventReporter;

pub struct NatsReporter {
    client: Client,
    bot_id: String,
    prefix: String,
}

impl NatsReporter {
    /// Connect to NATS server
    pub async fn connect(url: &str, prefix: &str, bot_id: String) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self::new(client, prefix, bot_id))
    }

    pub fn new(client: Client, prefix: &str, bot_id: String) -> Self {
        Self {
            client,
            bot_id,
            prefix: prefix.to_string(),
        }
    }

    /// Underlying connection, shared with the surface sidecar
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn events_subject(&self) -> String {
        format!("{}.events.{}", self.prefix, self.bot_id)
    }

    pub fn heartbeat_subject(&self) -> String {
        format!("{}.heartbeat.{}", self.prefix, self.bot_id)
    }

    async fn publish_json<T: serde::Serialize>(&self, subject: String, message: &T) -> Result<()> {
        let payload = serde_json::to_vec(message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to {}", subject))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl EventReporter for NatsReporter {
    async fn report(&self, code: EventCode, payload: Option<serde_json::Value>) -> Result<()> {
        let message = BotEventMessage {
            bot_id: self.bot_id.clone(),
            event_code: code,
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let subject = self.events_subject();
        self.publish_json(subject.clone(), &message).await?;

        info!("Reported {} to {}", code.as_str(), subject);
        Ok(())
    }

    async fn heartbeat(&self) -> Result<()> {
        let message = HeartbeatMessage {
            bot_id: self.bot_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        self.publish_json(self.heartbeat_subject(), &message).await?;

        debug!("Heartbeat sent for {}", self.bot_id);
        Ok(())
    }
}
