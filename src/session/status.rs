use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::state::{SessionState, TerminationReason};
use crate::diarization::SpeakingTimeframe;
use crate::exit::ExitReason;
use crate::presence::Participant;

/// What the session hands over once it has terminated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionArtifact {
    pub session_id: String,
    pub recording_path: PathBuf,
    pub content_type: String,
    pub speaker_timeframes: Vec<SpeakingTimeframe>,
    pub termination: TerminationReason,
    pub exit_reason: Option<ExitReason>,
}

/// Live view of a session, readable by the status API
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub session_id: String,
    pub state: SessionState,
    pub participants: Vec<Participant>,
    pub capture_running: bool,
    pub speaker_timeframes: Vec<SpeakingTimeframe>,
    pub exit_reason: Option<ExitReason>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            session_id: String::new(),
            state: SessionState::Joining,
            participants: Vec::new(),
            capture_running: false,
            speaker_timeframes: Vec::new(),
            exit_reason: None,
            started_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Default)]
struct StatusInner {
    status: Option<SessionStatus>,
    artifact: Option<SessionArtifact>,
}

/// Thread-safe handle for sharing session status between the session and
/// API handlers
#[derive(Clone, Default)]
pub struct SessionStatusHandle {
    inner: Arc<RwLock<StatusInner>>,
}

impl SessionStatusHandle {
    /// `None` until a session has started
    pub async fn get(&self) -> Option<SessionStatus> {
        self.inner.read().await.status.clone()
    }

    pub async fn artifact(&self) -> Option<SessionArtifact> {
        self.inner.read().await.artifact.clone()
    }

    pub async fn begin(&self, session_id: &str) {
        let mut inner = self.inner.write().await;
        inner.status = Some(SessionStatus {
            session_id: session_id.to_string(),
            ..Default::default()
        });
        inner.artifact = None;
    }

    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionStatus),
    {
        let mut inner = self.inner.write().await;
        let status = inner.status.get_or_insert_with(SessionStatus::default);
        f(status);
        status.updated_at = Utc::now();
    }

    pub async fn finish(&self, artifact: SessionArtifact) {
        let mut inner = self.inner.write().await;
        inner.artifact = Some(artifact);
    }
}
