//! Bot session management
//!
//! This module provides the `MeetingSession` state machine that drives:
//! - Joining the meeting and waiting for admission
//! - Starting and stopping the capture process
//! - Feeding participant and speech observations into the trackers
//! - Polling exit conditions and leaving the call
//! - Status reporting for the status API

mod config;
mod session;
mod state;
mod status;

pub use config::{AutomaticLeaveConfig, SessionConfig};
pub use session::MeetingSession;
pub use state::{SessionState, TerminationReason};
pub use status::{SessionArtifact, SessionStatus, SessionStatusHandle};
