//! Learn-mode batch report: assembled incrementally while `vision-engine`
//! drives a recorded stream end-to-end, then POSTed once at EOF.

use serde::{Deserialize, Serialize};
use vision_core::state::{AnomalyRecord, CalibrationResult, EventRecord};

/// Anomaly list is capped at this many entries; anything past the cap is
/// dropped rather than growing the report unboundedly on a noisy stream.
pub const MAX_ANOMALIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenTransition {
    pub frame: u64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub frame: u64,
    pub reason: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnReport {
    pub session_id: String,
    pub racer: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub calibration: Option<CalibrationResult>,
    pub frame_count: u64,
    pub screen_transitions: Vec<ScreenTransition>,
    pub anomalies: Vec<AnomalyRecord>,
    pub anomalies_dropped: u64,
    pub events: Vec<EventRecord>,
    pub snapshots: Vec<SnapshotEntry>,
}

/// Accumulates a [`LearnReport`] one frame at a time over the life of a
/// learn-mode session.
pub struct LearnReportBuilder {
    session_id: String,
    racer: String,
    calibration: Option<CalibrationResult>,
    frame_count: u64,
    screen_transitions: Vec<ScreenTransition>,
    last_screen_type: Option<String>,
    anomalies: Vec<AnomalyRecord>,
    anomalies_dropped: u64,
    events: Vec<EventRecord>,
    snapshots: Vec<SnapshotEntry>,
}

impl LearnReportBuilder {
    pub fn new(session_id: impl Into<String>, racer: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            racer: racer.into(),
            calibration: None,
            frame_count: 0,
            screen_transitions: Vec::new(),
            last_screen_type: None,
            anomalies: Vec::new(),
            anomalies_dropped: 0,
            events: Vec::new(),
            snapshots: Vec::new(),
        }
    }

    pub fn set_calibration(&mut self, calibration: CalibrationResult) {
        self.calibration = Some(calibration);
    }

    /// Record one processed frame: bumps the frame count, notes a
    /// screen-type transition if one occurred, and appends this frame's
    /// one-shot events.
    pub fn record_frame(&mut self, frame_number: u64, screen_type: &str, events: &[EventRecord]) {
        self.frame_count += 1;
        if self.last_screen_type.as_deref() != Some(screen_type) {
            if let Some(from) = self.last_screen_type.take() {
                self.screen_transitions.push(ScreenTransition {
                    frame: frame_number,
                    from,
                    to: screen_type.to_string(),
                });
            }
            self.last_screen_type = Some(screen_type.to_string());
        }
        self.events.extend_from_slice(events);
    }

    pub fn record_anomaly(&mut self, anomaly: AnomalyRecord) {
        if self.anomalies.len() < MAX_ANOMALIES {
            self.anomalies.push(anomaly);
        } else {
            self.anomalies_dropped += 1;
        }
    }

    pub fn record_snapshot(&mut self, frame: u64, reason: impl Into<String>, path: impl Into<String>) {
        self.snapshots.push(SnapshotEntry { frame, reason: reason.into(), path: path.into() });
    }

    pub fn finish(self) -> LearnReport {
        LearnReport {
            session_id: self.session_id,
            racer: self.racer,
            calibration: self.calibration,
            frame_count: self.frame_count,
            screen_transitions: self.screen_transitions,
            anomalies: self.anomalies,
            anomalies_dropped: self.anomalies_dropped,
            events: self.events,
            snapshots: self.snapshots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anomaly(frame: u64) -> AnomalyRecord {
        AnomalyRecord {
            frame,
            detector: "validator".to_string(),
            description: "test".to_string(),
            severity: vision_core::state::AnomalySeverity::Warning,
        }
    }

    #[test]
    fn screen_transitions_are_recorded_on_change_only() {
        let mut b = LearnReportBuilder::new("sess-1", "racer-1");
        b.record_frame(1, "overworld", &[]);
        b.record_frame(2, "overworld", &[]);
        b.record_frame(3, "dungeon", &[]);
        let report = b.finish();
        assert_eq!(report.frame_count, 3);
        assert_eq!(report.screen_transitions.len(), 1);
        assert_eq!(report.screen_transitions[0].from, "overworld");
        assert_eq!(report.screen_transitions[0].to, "dungeon");
    }

    #[test]
    fn anomalies_are_capped_and_excess_counted() {
        let mut b = LearnReportBuilder::new("sess-1", "racer-1");
        for i in 0..(MAX_ANOMALIES + 5) as u64 {
            b.record_anomaly(anomaly(i));
        }
        let report = b.finish();
        assert_eq!(report.anomalies.len(), MAX_ANOMALIES);
        assert_eq!(report.anomalies_dropped, 5);
    }

    #[test]
    fn first_frame_sets_baseline_without_a_transition() {
        let mut b = LearnReportBuilder::new("sess-1", "racer-1");
        b.record_frame(1, "title", &[]);
        let report = b.finish();
        assert!(report.screen_transitions.is_empty());
    }
}
