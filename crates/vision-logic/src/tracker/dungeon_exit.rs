//! Dungeon exit tracker: infers triforce collection and game completion.
//!
//! Monitors the sequence dungeon -> non-gameplay transition -> overworld.
//! If hearts increase and reach max during the transition, a triforce was
//! collected. If the D9 exit persists more than 30 frames, the game is
//! complete.

use vision_core::state::{AnomalyRecord, AnomalySeverity, EventRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitPhase {
    Idle,
    Exiting,
}

/// Tracks dungeon exits to infer triforce collection and game completion.
///
/// The coordinator ([`crate::validator::GameLogicValidator`]) owns the
/// canonical `triforce_inferred` array and passes it in by mutable
/// reference on every call so both this tracker and
/// [`crate::tracker::item_hold::ItemHoldTracker`] observe and set the same
/// eight flags.
pub struct DungeonExitTracker {
    pub game_completed: bool,

    phase: ExitPhase,
    exit_dungeon: u8,
    exit_start_frame: u64,
    exit_hearts_start: u8,
    exit_hearts_min: u8,
    exit_death_frames: u32,
    exit_saw_death_menu: bool,
}

impl Default for DungeonExitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DungeonExitTracker {
    pub fn new() -> Self {
        Self {
            game_completed: false,
            phase: ExitPhase::Idle,
            exit_dungeon: 0,
            exit_start_frame: 0,
            exit_hearts_start: 0,
            exit_hearts_min: 99,
            exit_death_frames: 0,
            exit_saw_death_menu: false,
        }
    }

    /// True while in the `Exiting` phase for dungeon 9 — used by
    /// `WarpDeathTracker` to suppress credits-related death events.
    pub fn is_exiting_d9(&self) -> bool {
        self.phase == ExitPhase::Exiting && self.exit_dungeon == 9
    }

    #[allow(clippy::too_many_arguments)]
    pub fn process_frame(
        &mut self,
        screen_type: &str,
        dungeon_level: u8,
        hearts_current: u8,
        hearts_max: u8,
        prev_screen_type: &str,
        prev_dungeon_level: u8,
        frame_number: u64,
        triforce_inferred: &mut [bool; 8],
    ) -> (Vec<EventRecord>, Vec<AnomalyRecord>) {
        let mut events = Vec::new();
        let mut anomalies = Vec::new();

        match self.phase {
            ExitPhase::Idle => {
                if prev_screen_type == "dungeon"
                    && prev_dungeon_level > 0
                    && !matches!(screen_type, "dungeon" | "cave" | "overworld" | "subscreen")
                {
                    self.phase = ExitPhase::Exiting;
                    self.exit_dungeon = prev_dungeon_level;
                    self.exit_start_frame = frame_number;
                    self.exit_hearts_start = hearts_current;
                    self.exit_hearts_min = hearts_current;
                    self.exit_death_frames = if screen_type == "death" { 1 } else { 0 };
                    self.exit_saw_death_menu = false;
                }
            }
            ExitPhase::Exiting => {
                self.exit_hearts_min = self.exit_hearts_min.min(hearts_current);

                if screen_type == "death" {
                    self.exit_death_frames += 1;
                    if self.exit_death_frames >= 3 {
                        self.exit_saw_death_menu = true;
                    }
                } else {
                    self.exit_death_frames = 0;
                }

                let exit_frames = frame_number.saturating_sub(self.exit_start_frame);
                let dungeon = self.exit_dungeon;

                if screen_type == "overworld" {
                    let hearts_increased = hearts_current > self.exit_hearts_start;
                    let hearts_at_max = hearts_current >= hearts_max;

                    if hearts_increased
                        && hearts_at_max
                        && self.exit_hearts_min > 0
                        && !self.exit_saw_death_menu
                        && (1..=8).contains(&dungeon)
                    {
                        let idx = (dungeon - 1) as usize;
                        if !triforce_inferred[idx] {
                            triforce_inferred[idx] = true;
                            let desc = format!(
                                "Triforce piece {dungeon} inferred (hearts {}->{hearts_current}, exit took {exit_frames} frames)",
                                self.exit_hearts_start
                            );
                            events.push(EventRecord {
                                frame: frame_number,
                                event: "triforce_inferred".to_string(),
                                description: desc.clone(),
                                dungeon_level: dungeon,
                                item: None,
                                x: None,
                                y: None,
                            });
                            anomalies.push(AnomalyRecord {
                                frame: frame_number,
                                detector: "triforce_inferred".to_string(),
                                description: desc,
                                severity: AnomalySeverity::Info,
                            });
                        }
                    }
                    self.reset_exit();
                } else if matches!(screen_type, "dungeon" | "cave") {
                    self.reset_exit();
                } else if dungeon == 9 && exit_frames > 30 && self.exit_hearts_min > 0 && !self.game_completed {
                    self.game_completed = true;
                    let desc = format!("Game completed! Exited D9 after {exit_frames} frames of credits");
                    events.push(EventRecord {
                        frame: self.exit_start_frame,
                        event: "game_complete".to_string(),
                        description: desc,
                        dungeon_level: 9,
                        item: None,
                        x: None,
                        y: None,
                    });
                    anomalies.push(AnomalyRecord {
                        frame: self.exit_start_frame,
                        detector: "game_complete".to_string(),
                        description: format!("Game completed (D9 exit, {exit_frames} frames of credits)"),
                        severity: AnomalySeverity::Info,
                    });
                    self.reset_exit();
                } else if exit_frames > 40 {
                    self.reset_exit();
                }
            }
        }

        (events, anomalies)
    }

    /// Clear all state, including `triforce_inferred` (reset in place).
    pub fn reset(&mut self, triforce_inferred: &mut [bool; 8]) {
        triforce_inferred.fill(false);
        self.game_completed = false;
        self.reset_exit();
    }

    fn reset_exit(&mut self) {
        self.phase = ExitPhase::Idle;
        self.exit_dungeon = 0;
        self.exit_start_frame = 0;
        self.exit_hearts_start = 0;
        self.exit_hearts_min = 99;
        self.exit_death_frames = 0;
        self.exit_saw_death_menu = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_until_dungeon_to_non_gameplay_transition() {
        let mut t = DungeonExitTracker::new();
        let mut triforce = [false; 8];
        let (events, _) = t.process_frame("overworld", 0, 3, 3, "overworld", 0, 10, &mut triforce);
        assert!(events.is_empty());
        assert!(!t.is_exiting_d9());
    }

    #[test]
    fn triforce_inferred_on_hearts_refill_exit_to_overworld() {
        let mut t = DungeonExitTracker::new();
        let mut triforce = [false; 8];

        // Dungeon 3 -> non-gameplay (e.g. "subscreen" doesn't count, use "unknown").
        let (events, _) = t.process_frame("unknown", 3, 2, 4, "dungeon", 3, 100, &mut triforce);
        assert!(events.is_empty());

        let (events, anomalies) = t.process_frame("overworld", 0, 4, 4, "unknown", 3, 105, &mut triforce);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "triforce_inferred");
        assert_eq!(events[0].dungeon_level, 3);
        assert!(triforce[2]);
        assert_eq!(anomalies.len(), 1);
    }

    #[test]
    fn no_triforce_event_when_hearts_do_not_reach_max() {
        let mut t = DungeonExitTracker::new();
        let mut triforce = [false; 8];
        t.process_frame("unknown", 2, 2, 4, "dungeon", 2, 100, &mut triforce);
        let (events, _) = t.process_frame("overworld", 0, 3, 4, "unknown", 2, 105, &mut triforce);
        assert!(events.is_empty());
        assert!(!triforce[1]);
    }

    #[test]
    fn returning_to_dungeon_resets_without_event() {
        let mut t = DungeonExitTracker::new();
        let mut triforce = [false; 8];
        t.process_frame("unknown", 1, 3, 3, "dungeon", 1, 50, &mut triforce);
        let (events, _) = t.process_frame("dungeon", 1, 3, 3, "unknown", 1, 51, &mut triforce);
        assert!(events.is_empty());
        assert!(!t.is_exiting_d9());
    }

    #[test]
    fn d9_exit_past_30_frames_completes_game() {
        let mut t = DungeonExitTracker::new();
        let mut triforce = [false; 8];
        t.process_frame("unknown", 9, 10, 16, "dungeon", 9, 0, &mut triforce);
        assert!(t.is_exiting_d9());
        let (events, _) = t.process_frame("unknown", 9, 10, 16, "unknown", 9, 35, &mut triforce);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, "game_complete");
        assert!(t.game_completed);
    }

    #[test]
    fn timeout_without_resolution_resets() {
        let mut t = DungeonExitTracker::new();
        let mut triforce = [false; 8];
        t.process_frame("unknown", 2, 3, 3, "dungeon", 2, 0, &mut triforce);
        let (events, _) = t.process_frame("unknown", 2, 3, 3, "unknown", 2, 45, &mut triforce);
        assert!(events.is_empty());
        assert!(!t.is_exiting_d9());
    }
}
