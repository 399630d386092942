use serde::{Deserialize, Serialize};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Left,
    Kicked,
    NotAdmitted,
    Error,
}

/// Phase of a bot session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    Joining,
    WaitingRoom,
    Active,
    Leaving,
    Terminated(TerminationReason),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Joining => "joining",
            Self::WaitingRoom => "waiting_room",
            Self::Active => "active",
            Self::Leaving => "leaving",
            Self::Terminated(_) => "terminated",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}
