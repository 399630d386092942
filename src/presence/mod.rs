//! Participant presence tracking
//!
//! The tracker owns the canonical roster. It is fed either by incremental
//! join/leave observations or by full roster snapshots, never both; the feed
//! is chosen when the tracker is created.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::error::PresenceError;

/// A meeting participant as seen on the remote surface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// How roster updates arrive from an observation source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RosterFeed {
    /// Individual join/leave deltas
    Incremental,
    /// Full roster state on every change
    Snapshot,
}

impl RosterFeed {
    fn as_str(&self) -> &'static str {
        match self {
            RosterFeed::Incremental => "incremental",
            RosterFeed::Snapshot => "snapshot",
        }
    }
}

/// A roster change that must be reported to telemetry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    Joined(Participant),
    Left(Participant),
}

pub struct PresenceTracker {
    feed: RosterFeed,
    roster: HashMap<String, Participant>,
    alone_since: Option<Instant>,
}

impl PresenceTracker {
    pub fn new(feed: RosterFeed) -> Self {
        Self {
            feed,
            roster: HashMap::new(),
            alone_since: None,
        }
    }

    pub fn feed(&self) -> RosterFeed {
        self.feed
    }

    /// Add a participant; re-observing a known id is a no-op
    pub fn observe_join(
        &mut self,
        participant: Participant,
    ) -> Result<Option<PresenceChange>, PresenceError> {
        self.require(RosterFeed::Incremental)?;

        if self.roster.contains_key(&participant.id) {
            debug!("Participant {} already on roster", participant.id);
            return Ok(None);
        }

        let previous = self.roster.len();
        self.roster
            .insert(participant.id.clone(), participant.clone());
        self.settle(previous);

        Ok(Some(PresenceChange::Joined(participant)))
    }

    /// Remove a participant; unknown ids are a no-op
    pub fn observe_leave(&mut self, id: &str) -> Result<Option<PresenceChange>, PresenceError> {
        self.require(RosterFeed::Incremental)?;

        let previous = self.roster.len();
        let removed = self.roster.remove(id);
        if removed.is_some() {
            self.settle(previous);
        } else {
            debug!("Ignoring leave for unknown participant {}", id);
        }

        Ok(removed.map(PresenceChange::Left))
    }

    /// Replace the roster with a full snapshot, returning joins for
    /// additions and leaves for removals
    pub fn reconcile(
        &mut self,
        snapshot: Vec<Participant>,
    ) -> Result<Vec<PresenceChange>, PresenceError> {
        self.require(RosterFeed::Snapshot)?;

        let mut next: HashMap<String, Participant> = HashMap::with_capacity(snapshot.len());
        for participant in snapshot {
            next.insert(participant.id.clone(), participant);
        }

        let mut changes = Vec::new();
        for (id, participant) in &self.roster {
            if !next.contains_key(id) {
                changes.push(PresenceChange::Left(participant.clone()));
            }
        }
        for (id, participant) in &next {
            if !self.roster.contains_key(id) {
                changes.push(PresenceChange::Joined(participant.clone()));
            }
        }

        let previous = self.roster.len();
        self.roster = next;
        self.settle(previous);

        Ok(changes)
    }

    pub fn len(&self) -> usize {
        self.roster.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.roster.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.roster.get(id)
    }

    /// Current roster sorted by id
    pub fn participants(&self) -> Vec<Participant> {
        let mut participants: Vec<Participant> = self.roster.values().cloned().collect();
        participants.sort_by(|a, b| a.id.cmp(&b.id));
        participants
    }

    /// When the roster last shrank or grew to exactly one member
    pub fn alone_since(&self) -> Option<Instant> {
        self.alone_since
    }

    fn require(&self, attempted: RosterFeed) -> Result<(), PresenceError> {
        if self.feed != attempted {
            return Err(PresenceError::MixedDiscipline {
                expected: self.feed.as_str(),
                attempted: attempted.as_str(),
            });
        }
        Ok(())
    }

    fn settle(&mut self, previous: usize) {
        let current = self.roster.len();
        if current == 1 {
            if previous != 1 {
                self.alone_since = Some(Instant::now());
                debug!("Bot is alone in the meeting");
            }
        } else {
            self.alone_since = None;
        }
    }
}
