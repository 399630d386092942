use serde::{Deserialize, Serialize};

/// Status and event codes reported to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCode {
    ReadyToDeploy,
    JoiningCall,
    InWaitingRoom,
    InCall,
    CallEnded,
    NotAdmitted,
    Done,
    Fatal,
    ParticipantJoin,
    ParticipantLeave,
    Log,
}

impl EventCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadyToDeploy => "READY_TO_DEPLOY",
            Self::JoiningCall => "JOINING_CALL",
            Self::InWaitingRoom => "IN_WAITING_ROOM",
            Self::InCall => "IN_CALL",
            Self::CallEnded => "CALL_ENDED",
            Self::NotAdmitted => "NOT_ADMITTED",
            Self::Done => "DONE",
            Self::Fatal => "FATAL",
            Self::ParticipantJoin => "PARTICIPANT_JOIN",
            Self::ParticipantLeave => "PARTICIPANT_LEAVE",
            Self::Log => "LOG",
        }
    }
}

/// Event message published to NATS
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotEventMessage {
    pub bot_id: String,
    pub event_code: EventCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub timestamp: String, // RFC3339 timestamp
}

/// Liveness message published on every heartbeat tick
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatMessage {
    pub bot_id: String,
    pub timestamp: String,
}
