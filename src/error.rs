//! Error types for the session controller
//!
//! Failures are classified by how the session reacts to them: an admission
//! timeout is a terminal but non-fatal outcome, surface errors are fatal only
//! before admission, capture errors are warnings, everything else is fatal.

use std::time::Duration;
use thiserror::Error;

/// Failure of an automation-surface operation
#[derive(Error, Debug)]
pub enum SurfaceError {
    /// A wait or probe ran past its deadline
    #[error("timed out after {timeout:?} waiting for {selector}")]
    Timeout { selector: String, timeout: Duration },

    /// The remote side reported a failure
    #[error("remote surface error: {0}")]
    Remote(String),

    /// The remote side could not be reached or replied with garbage
    #[error("surface transport error: {0}")]
    Transport(String),
}

impl SurfaceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SurfaceError::Timeout { .. })
    }
}

/// Failure of the external capture process
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The process could not be spawned
    #[error("failed to spawn capture process `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The graceful-stop signal could not be delivered
    #[error("failed to signal capture process: {0}")]
    Signal(#[source] std::io::Error),

    /// Waiting for the process to exit failed
    #[error("failed to wait for capture process: {0}")]
    Wait(#[source] std::io::Error),

    /// The process exited while the session still expected it to run
    #[error("capture process exited unexpectedly (code {0:?})")]
    UnexpectedExit(Option<i32>),
}

/// Roster operation rejected by the tracker
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PresenceError {
    /// The operation belongs to the other feed discipline than the one the
    /// tracker was created for
    #[error("roster is fed by {expected} updates, rejected a {attempted} update")]
    MixedDiscipline {
        expected: &'static str,
        attempted: &'static str,
    },
}

/// Terminal errors of a bot session
#[derive(Error, Debug)]
pub enum SessionError {
    /// The waiting room deadline passed without admission
    #[error("bot was not admitted into the meeting within {0:?}")]
    AdmissionTimeout(Duration),

    /// A surface operation failed before admission
    #[error("automation surface failed while joining: {0}")]
    Surface(#[from] SurfaceError),

    /// The capture process could not be managed
    #[error("capture process error: {0}")]
    Capture(#[from] CaptureError),

    /// Anything else
    #[error("fatal session error: {0}")]
    Fatal(String),
}

impl SessionError {
    /// Not-admitted is reported separately so callers do not retry it
    pub fn is_not_admitted(&self) -> bool {
        matches!(self, SessionError::AdmissionTimeout(_))
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        if self.is_not_admitted() {
            0
        } else {
            1
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
