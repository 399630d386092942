use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::presence::Participant;

/// Events pushed by the observers installed on the remote page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Observation {
    /// A participant tile appeared
    ParticipantJoined { participant: Participant },

    /// A participant tile disappeared
    #[serde(rename_all = "camelCase")]
    ParticipantLeft { participant_id: String },

    /// The full participant list
    RosterSnapshot { participants: Vec<Participant> },

    /// The speaking indicator of a participant lit up
    #[serde(rename_all = "camelCase")]
    SpeechPulse {
        participant_id: String,
        /// Stamped when the pulse is received, not when it is applied
        #[serde(skip, default = "Instant::now")]
        observed_at: Instant,
    },
}

impl Observation {
    /// A speech pulse observed now
    pub fn speech_pulse(participant_id: impl Into<String>) -> Self {
        Observation::SpeechPulse {
            participant_id: participant_id.into(),
            observed_at: Instant::now(),
        }
    }
}
