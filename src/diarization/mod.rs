//! Speaker diarization
//!
//! Raw speech pulses are kept per participant and coalesced into speaking
//! timeframes only when asked. Pulses arrive in bursts driven by the
//! speaking indicator, so the history is recomputed on read rather than
//! maintained as a streaming window.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::Instant;

use crate::presence::Participant;

/// Pulses closer than this belong to the same timeframe
pub const GAP_MS: u64 = 3000;

/// Closed windows must be longer than this to be kept
pub const MIN_DURATION_MS: u64 = 500;

/// A coalesced interval of speaking activity, in ms since the capture epoch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingTimeframe {
    pub speaker_name: String,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone)]
struct SpeakerTrack {
    name: String,
    pulses: Vec<u64>,
}

#[derive(Debug, Default)]
pub struct SpeakerAccumulator {
    tracks: HashMap<String, SpeakerTrack>,
    last_activity: Option<Instant>,
}

impl SpeakerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pulse to the speaker's history and mark activity at
    /// `observed_at`
    pub fn record_pulse(
        &mut self,
        speaker: &Participant,
        timestamp_ms: u64,
        observed_at: Instant,
    ) {
        let track = self
            .tracks
            .entry(speaker.id.clone())
            .or_insert_with(|| SpeakerTrack {
                name: speaker.display_name.clone(),
                pulses: Vec::new(),
            });
        track.name.clone_from(&speaker.display_name);
        track.pulses.push(timestamp_ms);

        // Pulses can be applied out of order; activity never moves back
        self.last_activity = Some(
            self.last_activity.map_or(observed_at, |last| last.max(observed_at)),
        );
    }

    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    pub fn pulse_count(&self) -> usize {
        self.tracks.values().map(|t| t.pulses.len()).sum()
    }

    /// Coalesce the full pulse history into timeframes ordered by
    /// `(start, end)`
    pub fn compute_timeframes(&self) -> Vec<SpeakingTimeframe> {
        let mut timeframes = Vec::new();

        for track in self.tracks.values() {
            for (start, end) in coalesce(&track.pulses) {
                timeframes.push(SpeakingTimeframe {
                    speaker_name: track.name.clone(),
                    start,
                    end,
                });
            }
        }

        timeframes.sort_by(|a, b| {
            (a.start, a.end, &a.speaker_name).cmp(&(b.start, b.end, &b.speaker_name))
        });
        timeframes
    }
}

/// Coalesce one speaker's pulses into `(start, end)` windows.
///
/// A window closed by a gap is kept only if it lasted longer than
/// `MIN_DURATION_MS`; the last window is always kept.
pub fn coalesce(pulses: &[u64]) -> Vec<(u64, u64)> {
    let mut sorted = pulses.to_vec();
    sorted.sort_unstable();

    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut windows = Vec::new();
    let (mut start, mut end) = (first, first);

    for t in iter {
        if t - end < GAP_MS {
            end = t;
        } else {
            if end - start > MIN_DURATION_MS {
                windows.push((start, end));
            }
            start = t;
            end = t;
        }
    }

    windows.push((start, end));
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speaker(id: &str) -> Participant {
        Participant::new(id, id.to_uppercase())
    }

    #[test]
    fn test_gap_splits_windows() {
        assert_eq!(coalesce(&[0, 1000, 2000, 6000]), vec![(0, 2000), (6000, 6000)]);
    }

    // The last window escapes the minimum-duration rule. This asymmetry is
    // kept on purpose until a business rule says otherwise.
    #[test]
    fn test_short_final_window_is_kept() {
        assert_eq!(coalesce(&[0, 100]), vec![(0, 100)]);
    }

    #[test]
    fn test_short_closed_window_is_dropped() {
        assert_eq!(coalesce(&[0, 100, 5000]), vec![(5000, 5000)]);
    }

    #[test]
    fn test_exact_gap_closes_window() {
        assert_eq!(coalesce(&[0, 600, 3600]), vec![(0, 600), (3600, 3600)]);
        assert_eq!(coalesce(&[0, 600, 3599]), vec![(0, 3599)]);
    }

    #[test]
    fn test_exact_min_duration_is_dropped() {
        assert_eq!(coalesce(&[0, 500, 4000]), vec![(4000, 4000)]);
        assert_eq!(coalesce(&[0, 501, 4000]), vec![(0, 501), (4000, 4000)]);
    }

    #[test]
    fn test_out_of_order_pulses() {
        assert_eq!(coalesce(&[2000, 0, 6000, 1000]), vec![(0, 2000), (6000, 6000)]);
    }

    #[test]
    fn test_empty_history() {
        assert!(coalesce(&[]).is_empty());
        assert!(SpeakerAccumulator::new().compute_timeframes().is_empty());
    }

    #[tokio::test]
    async fn test_timeframes_merged_and_sorted() {
        let mut acc = SpeakerAccumulator::new();
        for t in [5000, 5500, 6000] {
            acc.record_pulse(&speaker("b"), t, Instant::now());
        }
        for t in [0, 1000, 9000] {
            acc.record_pulse(&speaker("a"), t, Instant::now());
        }

        let frames = acc.compute_timeframes();
        let summary: Vec<(&str, u64, u64)> = frames
            .iter()
            .map(|f| (f.speaker_name.as_str(), f.start, f.end))
            .collect();
        assert_eq!(
            summary,
            vec![("A", 0, 1000), ("B", 5000, 6000), ("A", 9000, 9000)]
        );
        assert_eq!(acc.pulse_count(), 6);
    }

    #[tokio::test]
    async fn test_compute_is_repeatable() {
        let mut acc = SpeakerAccumulator::new();
        acc.record_pulse(&speaker("a"), 0, Instant::now());
        acc.record_pulse(&speaker("a"), 800, Instant::now());
        assert_eq!(acc.compute_timeframes(), acc.compute_timeframes());

        acc.record_pulse(&speaker("a"), 1200, Instant::now());
        assert_eq!(acc.compute_timeframes()[0].end, 1200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_updates_last_activity() {
        let mut acc = SpeakerAccumulator::new();
        assert!(acc.last_activity().is_none());

        acc.record_pulse(&speaker("a"), 0, Instant::now());
        let first = acc.last_activity().unwrap();

        tokio::time::advance(std::time::Duration::from_secs(2)).await;
        acc.record_pulse(&speaker("b"), 2000, Instant::now());
        assert!(acc.last_activity().unwrap() > first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_pulse_keeps_latest_activity() {
        let mut acc = SpeakerAccumulator::new();
        let early = Instant::now();
        tokio::time::advance(std::time::Duration::from_secs(3)).await;
        let late = Instant::now();

        acc.record_pulse(&speaker("a"), 3000, late);
        acc.record_pulse(&speaker("b"), 0, early);

        assert_eq!(acc.last_activity(), Some(late));
        assert_eq!(acc.compute_timeframes().len(), 2);
    }
}
