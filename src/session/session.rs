use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::{SessionState, TerminationReason};
use super::status::{SessionArtifact, SessionStatusHandle};
use crate::capture::CaptureSupervisor;
use crate::diarization::SpeakerAccumulator;
use crate::error::{Result, SessionError, SurfaceError};
use crate::exit::{ExitEvaluator, ExitReason, MonitorSnapshot};
use crate::presence::{Participant, PresenceChange, PresenceTracker};
use crate::surface::{AutomationSurface, MeetSelectors, Observation};
use crate::telemetry::{EventCode, EventReporter};

/// Timeout for ordinary pre-join page steps
const JOIN_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the "Ask to join" button to show up
const ASK_TO_JOIN_TIMEOUT: Duration = Duration::from_secs(60);

const PAGE_HTML_SCRIPT: &str = "document.documentElement.outerHTML";

/// Bound on fetching the page for a debug snapshot
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// A bot session: joins the meeting, records it while tracking participants
/// and speakers, and leaves once an exit condition fires.
pub struct MeetingSession {
    config: SessionConfig,
    selectors: MeetSelectors,
    surface: Arc<dyn AutomationSurface>,
    reporter: Arc<dyn EventReporter>,
    capture: CaptureSupervisor,
    presence: PresenceTracker,
    speakers: SpeakerAccumulator,
    evaluator: ExitEvaluator,
    state: SessionState,
    status: SessionStatusHandle,
}

impl MeetingSession {
    /// Create a new session. The configuration is validated here, once.
    pub fn new(
        config: SessionConfig,
        selectors: MeetSelectors,
        surface: Arc<dyn AutomationSurface>,
        reporter: Arc<dyn EventReporter>,
        capture: CaptureSupervisor,
    ) -> Result<Self> {
        config.validate()?;

        info!("Creating bot session: {}", config.session_id);

        let presence = PresenceTracker::new(surface.capabilities().roster_feed);
        let evaluator = ExitEvaluator::new(config.automatic_leave, selectors.clone());

        Ok(Self {
            config,
            selectors,
            surface,
            reporter,
            capture,
            presence,
            speakers: SpeakerAccumulator::new(),
            evaluator,
            state: SessionState::Joining,
            status: SessionStatusHandle::default(),
        })
    }

    /// Share status with an external reader (the status API)
    pub fn with_status(mut self, status: SessionStatusHandle) -> Self {
        self.status = status;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Run the session to completion.
    ///
    /// Errors are only returned for failures before admission; once the bot
    /// is in the call every failure ends in a controlled leave.
    pub async fn run(mut self) -> Result<SessionArtifact> {
        self.status.begin(&self.config.session_id).await;

        if let Err(e) = self.join().await {
            return Err(self.abort_join(e).await);
        }

        let observations = self.activate().await;
        let reason = self.monitor(observations).await;

        Ok(self.leave(reason).await)
    }

    async fn join(&mut self) -> Result<()> {
        self.transition(SessionState::Joining).await;
        self.report(EventCode::JoiningCall, None).await;

        info!("Joining call {}", self.config.meeting_url);
        self.surface.open(&self.config.meeting_url).await?;

        debug!("Waiting for the name field");
        self.surface
            .wait_for(&self.selectors.name_field, JOIN_STEP_TIMEOUT)
            .await?;
        self.surface
            .fill(&self.selectors.name_field, &self.config.display_name)
            .await?;

        debug!("Waiting for the \"Ask to join\" button");
        self.surface
            .wait_for(&self.selectors.ask_to_join, ASK_TO_JOIN_TIMEOUT)
            .await?;
        self.surface
            .click(&self.selectors.ask_to_join, JOIN_STEP_TIMEOUT)
            .await?;

        self.transition(SessionState::WaitingRoom).await;
        self.report(EventCode::InWaitingRoom, None).await;

        // The leave button only exists once we are in the call
        info!("Awaiting entry...");
        let deadline = self.config.automatic_leave.waiting_room_timeout();
        let admitted = tokio::time::timeout(
            deadline,
            self.surface.wait_for(&self.selectors.leave_button, deadline),
        )
        .await;

        match admitted {
            Ok(Ok(())) => {
                info!("Joined call");
                Ok(())
            }
            Ok(Err(e)) if e.is_timeout() => Err(SessionError::AdmissionTimeout(deadline)),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(SessionError::AdmissionTimeout(deadline)),
        }
    }

    /// Report a failed join and tear the surface down
    async fn abort_join(&mut self, err: SessionError) -> SessionError {
        self.debug_snapshot("join-failure").await;

        if err.is_not_admitted() {
            warn!("{}", err);
            self.transition(SessionState::Terminated(TerminationReason::NotAdmitted))
                .await;
            self.report(
                EventCode::NotAdmitted,
                Some(json!({ "description": err.to_string() })),
            )
            .await;
        } else {
            error!("Failed to join meeting: {}", err);
            self.transition(SessionState::Terminated(TerminationReason::Error))
                .await;
            self.report(
                EventCode::Fatal,
                Some(json!({ "description": err.to_string() })),
            )
            .await;
        }

        if let Err(e) = self.surface.close().await {
            warn!("Failed to close automation surface: {}", e);
        }

        err
    }

    /// Enter the call: start recording and install the observers
    async fn activate(&mut self) -> Option<mpsc::Receiver<Observation>> {
        self.transition(SessionState::Active).await;
        self.report(EventCode::InCall, None).await;

        if self.surface.capabilities().requires_people_panel {
            if let Err(e) = self.open_people_panel().await {
                warn!("Failed to open the people panel: {}", e);
            }
        }

        if let Err(e) = self.capture.start().await {
            warn!("Failed to start recording: {}", e);
        }

        match self.surface.observe(self.config.observation_capacity).await {
            Ok(rx) => Some(rx),
            Err(e) => {
                warn!("Failed to install participant observers: {}", e);
                None
            }
        }
    }

    async fn open_people_panel(&self) -> std::result::Result<(), SurfaceError> {
        debug!("Clicking people button");
        self.surface
            .wait_for(&self.selectors.people_button, JOIN_STEP_TIMEOUT)
            .await?;
        self.surface
            .click(&self.selectors.people_button, JOIN_STEP_TIMEOUT)
            .await?;
        self.surface
            .wait_for(&self.selectors.participants_panel, JOIN_STEP_TIMEOUT)
            .await
    }

    /// Poll exit conditions until one fires, applying observations as they
    /// arrive in between. Iterations never overlap.
    async fn monitor(&mut self, mut observations: Option<mpsc::Receiver<Observation>>) -> ExitReason {
        info!("Waiting until a leave condition is fulfilled...");

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut observing = observations.is_some();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.capture.check_health() {
                        warn!("{}", e);
                    }

                    let snapshot = self.snapshot();
                    debug!("Checking leave conditions ({} participants)", snapshot.roster_size);

                    if let Some(reason) = self.evaluator.evaluate(&snapshot, self.surface.as_ref()).await {
                        return reason;
                    }

                    self.publish_status().await;
                }
                observation = next_observation(&mut observations), if observing => {
                    match observation {
                        Some(observation) => self.apply(observation).await,
                        None => {
                            warn!("Observation channel closed; continuing without participant updates");
                            observing = false;
                        }
                    }
                }
            }
        }
    }

    fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            now: Instant::now(),
            roster_size: self.presence.len(),
            alone_since: self.presence.alone_since(),
            capture_started_at: self.capture.started_at(),
            last_activity: self.speakers.last_activity(),
        }
    }

    async fn apply(&mut self, observation: Observation) {
        let changes = match observation {
            Observation::ParticipantJoined { participant } => self
                .presence
                .observe_join(participant)
                .map(|c| c.into_iter().collect()),
            Observation::ParticipantLeft { participant_id } => self
                .presence
                .observe_leave(&participant_id)
                .map(|c| c.into_iter().collect()),
            Observation::RosterSnapshot { participants } => self.presence.reconcile(participants),
            Observation::SpeechPulse {
                participant_id,
                observed_at,
            } => {
                let speaker = self
                    .presence
                    .get(&participant_id)
                    .cloned()
                    .unwrap_or_else(|| Participant::new(participant_id.clone(), participant_id));
                let timestamp_ms = self.capture.offset_ms(observed_at);
                self.speakers
                    .record_pulse(&speaker, timestamp_ms, observed_at);
                return;
            }
        };

        let changes: Vec<PresenceChange> = match changes {
            Ok(changes) => changes,
            Err(e) => {
                warn!("Dropping roster update: {}", e);
                return;
            }
        };

        if changes.is_empty() {
            return;
        }

        info!("Updated participant count: {}", self.presence.len());
        for change in changes {
            let (code, participant) = match change {
                PresenceChange::Joined(p) => (EventCode::ParticipantJoin, p),
                PresenceChange::Left(p) => (EventCode::ParticipantLeave, p),
            };
            self.report(
                code,
                Some(json!({
                    "participantId": participant.id,
                    "displayName": participant.display_name,
                })),
            )
            .await;
        }
        self.publish_status().await;
    }

    /// Stop recording, leave the call, and hand over the artifact
    async fn leave(&mut self, reason: ExitReason) -> SessionArtifact {
        info!("Leaving meeting: {}", reason.as_str());
        self.transition(SessionState::Leaving).await;
        self.report(EventCode::CallEnded, Some(json!({ "reason": reason.as_str() })))
            .await;

        // Recording stops before any page access; a dead page can stall it
        if let Err(e) = self.capture.stop().await {
            warn!("Failed to stop recording cleanly: {}", e);
        }

        self.debug_snapshot("leave").await;

        // Kicked bots have no leave button to press
        if !reason.is_kick() {
            let timeout = self.config.leave_click_timeout;
            let clicked = tokio::time::timeout(
                timeout,
                self.surface.click(&self.selectors.leave_button, timeout),
            )
            .await;
            match clicked {
                Ok(Ok(())) => info!("Left call"),
                Ok(Err(e)) => info!("Attempted to leave call, couldn't (probably already left): {}", e),
                Err(_) => info!("Attempted to leave call, timed out (probably already left)"),
            }
        }

        if let Err(e) = self.surface.close().await {
            warn!("Failed to close automation surface: {}", e);
        }

        let termination = if reason.is_kick() {
            TerminationReason::Kicked
        } else {
            TerminationReason::Left
        };

        let artifact = SessionArtifact {
            session_id: self.config.session_id.clone(),
            recording_path: self.capture.output_path().to_path_buf(),
            content_type: self.capture.content_type().to_string(),
            speaker_timeframes: self.speakers.compute_timeframes(),
            termination,
            exit_reason: Some(reason),
        };

        self.status
            .update(|s| s.exit_reason = Some(reason))
            .await;
        self.transition(SessionState::Terminated(termination)).await;

        info!(
            "Session {} complete: {} speaking timeframes",
            self.config.session_id,
            artifact.speaker_timeframes.len()
        );

        self.report(
            EventCode::Done,
            Some(json!({
                "recording": artifact.recording_path,
                "contentType": artifact.content_type,
                "speakerTimeframes": artifact.speaker_timeframes,
                "reason": reason.as_str(),
            })),
        )
        .await;
        self.status.finish(artifact.clone()).await;

        artifact
    }

    async fn transition(&mut self, next: SessionState) {
        if self.state != next {
            info!(
                "Session {}: {} -> {}",
                self.config.session_id,
                self.state.as_str(),
                next.as_str()
            );
        }
        self.state = next;
        self.publish_status().await;
    }

    async fn publish_status(&self) {
        let state = self.state;
        let participants = self.presence.participants();
        let capture_running = self.capture.is_running();
        let timeframes = self.speakers.compute_timeframes();

        self.status
            .update(move |s| {
                s.state = state;
                s.participants = participants;
                s.capture_running = capture_running;
                s.speaker_timeframes = timeframes;
            })
            .await;
    }

    async fn report(&self, code: EventCode, payload: Option<serde_json::Value>) {
        if let Err(e) = self.reporter.report(code, payload).await {
            warn!("Failed to report {}: {:#}", code.as_str(), e);
        }
    }

    /// Save the page HTML when a debug directory is configured
    async fn debug_snapshot(&self, label: &str) {
        let Some(dir) = &self.config.debug_dir else {
            return;
        };

        let evaluated =
            tokio::time::timeout(SNAPSHOT_TIMEOUT, self.surface.evaluate(PAGE_HTML_SCRIPT)).await;
        let html = match evaluated {
            Ok(Ok(serde_json::Value::String(html))) => html,
            Ok(Ok(other)) => other.to_string(),
            Ok(Err(e)) => {
                warn!("Failed to capture page content: {}", e);
                return;
            }
            Err(_) => {
                warn!("Timed out capturing page content after {:?}", SNAPSHOT_TIMEOUT);
                return;
            }
        };

        let path = dir.join(format!(
            "{}-{}.html",
            label,
            chrono::Utc::now().timestamp_millis()
        ));

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("Failed to create debug directory {}: {}", dir.display(), e);
            return;
        }
        match tokio::fs::write(&path, html).await {
            Ok(()) => info!("Page snapshot saved: {}", path.display()),
            Err(e) => warn!("Failed to write page snapshot {}: {}", path.display(), e),
        }
    }
}

async fn next_observation(
    observations: &mut Option<mpsc::Receiver<Observation>>,
) -> Option<Observation> {
    match observations {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
