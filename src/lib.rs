pub mod capture;
pub mod config;
pub mod diarization;
pub mod error;
pub mod exit;
pub mod http;
pub mod presence;
pub mod session;
pub mod surface;
pub mod telemetry;

pub use capture::{CaptureChild, CaptureLauncher, CaptureSettings, CaptureSupervisor, ProcessLauncher};
pub use config::Config;
pub use diarization::{SpeakerAccumulator, SpeakingTimeframe};
pub use error::{CaptureError, PresenceError, SessionError, SurfaceError};
pub use exit::{ExitEvaluator, ExitReason, KickSignal, MonitorSnapshot};
pub use http::{create_router, AppState};
pub use presence::{Participant, PresenceChange, PresenceTracker, RosterFeed};
pub use session::{
    AutomaticLeaveConfig, MeetingSession, SessionArtifact, SessionConfig, SessionState,
    SessionStatus, SessionStatusHandle, TerminationReason,
};
pub use surface::{AutomationSurface, MeetSelectors, NatsSurface, Observation, SurfaceCapabilities};
pub use telemetry::{EventCode, EventReporter, NatsReporter, TracingReporter};
