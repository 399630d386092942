// Automation surface backed by a browser sidecar reachable over NATS.
//
// Commands go out as JSON requests on `<prefix>.surface.<session>.command`
// and the sidecar answers each with a `SurfaceReply`. Observer events are
// published by the sidecar on `<prefix>.surface.<session>.observations`.

use async_nats::Client;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{AutomationSurface, Observation, SurfaceCapabilities};
use crate::error::SurfaceError;

/// Extra time granted to the transport on top of the operation's own timeout
const REQUEST_SLACK: Duration = Duration::from_secs(5);

/// Timeout for commands that carry no timeout of their own
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SurfaceCommand {
    Open { url: String },
    Count { selector: String },
    IsVisible { selector: String, timeout_ms: u64 },
    IsHidden { selector: String, timeout_ms: u64 },
    Click { selector: String, timeout_ms: u64 },
    Fill { selector: String, text: String },
    WaitFor { selector: String, timeout_ms: u64 },
    Evaluate { script: String },
    Observe,
    Close,
}

impl SurfaceCommand {
    fn target(&self) -> &str {
        match self {
            SurfaceCommand::Open { url } => url,
            SurfaceCommand::Count { selector }
            | SurfaceCommand::IsVisible { selector, .. }
            | SurfaceCommand::IsHidden { selector, .. }
            | SurfaceCommand::Click { selector, .. }
            | SurfaceCommand::Fill { selector, .. }
            | SurfaceCommand::WaitFor { selector, .. } => selector,
            SurfaceCommand::Evaluate { .. } => "<script>",
            SurfaceCommand::Observe => "<observe>",
            SurfaceCommand::Close => "<close>",
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SurfaceReply {
    pub ok: bool,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub timed_out: bool,
}

pub struct NatsSurface {
    client: Client,
    command_subject: String,
    observation_subject: String,
    capabilities: SurfaceCapabilities,
    forwarder: Forwarder,
}

impl NatsSurface {
    pub fn new(
        client: Client,
        prefix: &str,
        session_id: &str,
        capabilities: SurfaceCapabilities,
    ) -> Self {
        Self {
            client,
            command_subject: format!("{}.surface.{}.command", prefix, session_id),
            observation_subject: format!("{}.surface.{}.observations", prefix, session_id),
            capabilities,
            forwarder: Forwarder::default(),
        }
    }

    async fn request(
        &self,
        command: SurfaceCommand,
        timeout: Duration,
    ) -> Result<serde_json::Value, SurfaceError> {
        let payload =
            serde_json::to_vec(&command).map_err(|e| SurfaceError::Transport(e.to_string()))?;

        let request = async_nats::Request::new()
            .payload(payload.into())
            .timeout(Some(timeout + REQUEST_SLACK));

        let message = self
            .client
            .send_request(self.command_subject.clone(), request)
            .await
            .map_err(|e| SurfaceError::Transport(e.to_string()))?;

        let reply: SurfaceReply = serde_json::from_slice(&message.payload)
            .map_err(|e| SurfaceError::Transport(format!("malformed reply: {}", e)))?;

        if reply.timed_out {
            return Err(SurfaceError::Timeout {
                selector: command.target().to_string(),
                timeout,
            });
        }
        if !reply.ok {
            return Err(SurfaceError::Remote(
                reply
                    .error
                    .unwrap_or_else(|| format!("{} failed", command.target())),
            ));
        }

        Ok(reply.value)
    }

    async fn request_bool(
        &self,
        command: SurfaceCommand,
        timeout: Duration,
    ) -> Result<bool, SurfaceError> {
        let value = self.request(command, timeout).await?;
        value
            .as_bool()
            .ok_or_else(|| SurfaceError::Transport(format!("expected bool, got {}", value)))
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

#[async_trait::async_trait]
impl AutomationSurface for NatsSurface {
    fn capabilities(&self) -> SurfaceCapabilities {
        self.capabilities
    }

    async fn open(&self, url: &str) -> Result<(), SurfaceError> {
        self.request(
            SurfaceCommand::Open {
                url: url.to_string(),
            },
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn count(&self, selector: &str) -> Result<usize, SurfaceError> {
        let value = self
            .request(
                SurfaceCommand::Count {
                    selector: selector.to_string(),
                },
                DEFAULT_COMMAND_TIMEOUT,
            )
            .await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| SurfaceError::Transport(format!("expected count, got {}", value)))
    }

    async fn is_visible(&self, selector: &str, timeout: Duration) -> Result<bool, SurfaceError> {
        self.request_bool(
            SurfaceCommand::IsVisible {
                selector: selector.to_string(),
                timeout_ms: millis(timeout),
            },
            timeout,
        )
        .await
    }

    async fn is_hidden(&self, selector: &str, timeout: Duration) -> Result<bool, SurfaceError> {
        self.request_bool(
            SurfaceCommand::IsHidden {
                selector: selector.to_string(),
                timeout_ms: millis(timeout),
            },
            timeout,
        )
        .await
    }

    async fn click(&self, selector: &str, timeout: Duration) -> Result<(), SurfaceError> {
        self.request(
            SurfaceCommand::Click {
                selector: selector.to_string(),
                timeout_ms: millis(timeout),
            },
            timeout,
        )
        .await
        .map(|_| ())
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), SurfaceError> {
        self.request(
            SurfaceCommand::Fill {
                selector: selector.to_string(),
                text: text.to_string(),
            },
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), SurfaceError> {
        self.request(
            SurfaceCommand::WaitFor {
                selector: selector.to_string(),
                timeout_ms: millis(timeout),
            },
            timeout,
        )
        .await
        .map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, SurfaceError> {
        self.request(
            SurfaceCommand::Evaluate {
                script: script.to_string(),
            },
            DEFAULT_COMMAND_TIMEOUT,
        )
        .await
    }

    async fn observe(&self, capacity: usize) -> Result<mpsc::Receiver<Observation>, SurfaceError> {
        // Subscribe before installing the observers so early events are not lost
        let subscriber = self
            .client
            .subscribe(self.observation_subject.clone())
            .await
            .map_err(|e| SurfaceError::Transport(e.to_string()))?;

        info!("Subscribed to {}", self.observation_subject);

        self.request(SurfaceCommand::Observe, DEFAULT_COMMAND_TIMEOUT)
            .await?;

        let (tx, rx) = mpsc::channel(capacity);
        let handle = spawn_forwarder(subscriber.map(|msg| msg.payload), tx);
        self.forwarder.replace(handle).await;

        Ok(rx)
    }

    async fn close(&self) -> Result<(), SurfaceError> {
        self.forwarder.stop().await;

        if let Err(e) = self
            .request(SurfaceCommand::Close, DEFAULT_COMMAND_TIMEOUT)
            .await
        {
            error!("Failed to close automation surface: {}", e);
            return Err(e);
        }
        Ok(())
    }
}

/// The task forwarding observations of the current subscription
#[derive(Default)]
struct Forwarder {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Forwarder {
    async fn replace(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.handle.lock().await.replace(handle) {
            debug!("Replacing observation forwarding task");
            previous.abort();
        }
    }

    /// Abort the task; its subscription and sender are dropped with it
    async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
            debug!("Observation forwarding task stopped");
        }
    }
}

/// Parse raw observation payloads into the session channel. Deserializing
/// stamps each speech pulse with its receipt time.
fn spawn_forwarder<S, P>(mut payloads: S, tx: mpsc::Sender<Observation>) -> JoinHandle<()>
where
    S: Stream<Item = P> + Send + Unpin + 'static,
    P: AsRef<[u8]> + Send,
{
    tokio::spawn(async move {
        debug!("Observation forwarding task started");

        while let Some(payload) = payloads.next().await {
            match serde_json::from_slice::<Observation>(payload.as_ref()) {
                Ok(observation) => {
                    if tx.send(observation).await.is_err() {
                        debug!("Observation receiver dropped");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse observation: {}", e);
                }
            }
        }

        debug!("Observation stream ended");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_forwarder_stamps_pulses_on_receipt() {
        let (payload_tx, payload_rx) = futures::channel::mpsc::unbounded::<Vec<u8>>();
        let (tx, mut rx) = mpsc::channel(8);
        let _handle = spawn_forwarder(payload_rx, tx);

        let before = Instant::now();
        payload_tx.unbounded_send(b"not json".to_vec()).unwrap();
        payload_tx
            .unbounded_send(br#"{"type":"speechPulse","participantId":"p1"}"#.to_vec())
            .unwrap();

        match rx.recv().await {
            Some(Observation::SpeechPulse {
                participant_id,
                observed_at,
            }) => {
                assert_eq!(participant_id, "p1");
                assert!(observed_at >= before);
            }
            other => panic!("unexpected observation: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stopped_forwarder_closes_channel() {
        let (payload_tx, payload_rx) = futures::channel::mpsc::unbounded::<Vec<u8>>();
        let (tx, mut rx) = mpsc::channel(8);

        let forwarder = Forwarder::default();
        forwarder.replace(spawn_forwarder(payload_rx, tx)).await;
        forwarder.stop().await;

        // The payload source is still open, so only the abort can end it
        let closed = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(closed, Ok(None)));
        assert!(payload_tx.unbounded_send(b"{}".to_vec()).is_err());
        assert!(forwarder.handle.lock().await.is_none());
    }

    #[test]
    fn test_command_wire_format() {
        let cmd = SurfaceCommand::WaitFor {
            selector: "#leave".to_string(),
            timeout_ms: 500,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r##"{"op":"wait_for","selector":"#leave","timeout_ms":500}"##);

        let json = serde_json::to_string(&SurfaceCommand::Observe).unwrap();
        assert_eq!(json, r#"{"op":"observe"}"#);
    }

    #[test]
    fn test_reply_defaults() {
        let reply: SurfaceReply = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(reply.ok);
        assert!(reply.value.is_null());
        assert!(!reply.timed_out);

        let reply: SurfaceReply =
            serde_json::from_str(r#"{"ok":false,"timed_out":true}"#).unwrap();
        assert!(reply.timed_out);
    }
}
