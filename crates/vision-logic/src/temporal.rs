//! Temporal smoothing buffer for NES game state detection.
//!
//! Requires a field's raw reading to persist unchanged across `buffer_size`
//! consecutive frames before that field is accepted into the stable state.
//! Prevents single-frame misdetection flicker (e.g. hearts briefly reading
//! wrong during a screen transition). Each field is buffered and accepted
//! independently, so a jittery field (e.g. `b_item`) doesn't hold back a
//! stable one (e.g. `hearts_current`).
//!
//! Ported field-by-field rather than via the original's dynamic
//! `setattr`/`getattr` loop over `dataclasses.asdict` — `GameState` here is
//! a concrete struct, not a dict, so each field gets its own buffer.

use std::collections::VecDeque;

use vision_core::state::GameState;

pub const DEFAULT_BUFFER_SIZE: usize = 3;

pub struct TemporalBuffer {
    buffer_size: usize,
    history: VecDeque<GameState>,
    stable: GameState,
    frame_count: u64,
}

impl TemporalBuffer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            history: VecDeque::new(),
            stable: GameState::default(),
            frame_count: 0,
        }
    }

    /// Feed one raw detection and return the current stable state.
    pub fn process(&mut self, raw: GameState) -> GameState {
        self.push(raw);
        self.stable.clone()
    }

    /// Feed one raw detection, returning both the raw input back and the
    /// resulting stable state — useful for learn mode's raw-vs-smoothed
    /// comparison.
    pub fn process_with_raw(&mut self, raw: GameState) -> (GameState, GameState) {
        let raw_out = raw.clone();
        self.push(raw);
        (raw_out, self.stable.clone())
    }

    fn push(&mut self, raw: GameState) {
        self.frame_count += 1;
        self.history.push_back(raw);
        if self.history.len() > self.buffer_size {
            self.history.pop_front();
        }
        if self.history.len() < self.buffer_size {
            return;
        }

        macro_rules! stabilize {
            ($field:ident) => {
                if self.history.iter().all(|s| s.$field == self.history[0].$field) {
                    self.stable.$field = self.history.back().expect("just pushed").$field.clone();
                }
            };
        }

        stabilize!(screen_type);
        stabilize!(dungeon_level);
        stabilize!(hearts_current);
        stabilize!(hearts_max);
        stabilize!(has_half_heart);
        stabilize!(rupees);
        stabilize!(keys);
        stabilize!(bombs);
        stabilize!(b_item);
        stabilize!(sword_level);
        stabilize!(has_master_key);
        stabilize!(gannon_nearby);
        stabilize!(bomb_max);
        stabilize!(items);
        stabilize!(triforce);
        stabilize!(map_position);
        stabilize!(detected_item);
        stabilize!(detected_item_y);
        stabilize!(floor_items);
        stabilize!(dungeon_map_rooms);
        stabilize!(triforce_room);
        stabilize!(zelda_room);
        stabilize!(tile_match_id);
        stabilize!(tile_match_score);

        // Events are one-shot per frame by definition (never carried
        // forward, §state.rs), so they pass straight through rather than
        // waiting on N-frame agreement.
        self.stable.events = self.history.back().expect("just pushed").events.clone();
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.stable = GameState::default();
        self.frame_count = 0;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_hearts(hearts: u8) -> GameState {
        GameState {
            hearts_current: hearts,
            ..GameState::default()
        }
    }

    #[test]
    fn stable_state_starts_as_default() {
        let mut buf = TemporalBuffer::new(3);
        let stable = buf.process(state_with_hearts(2));
        assert_eq!(stable.hearts_current, 0);
    }

    #[test]
    fn field_becomes_stable_after_buffer_size_matching_frames() {
        let mut buf = TemporalBuffer::new(3);
        buf.process(state_with_hearts(2));
        buf.process(state_with_hearts(2));
        let stable = buf.process(state_with_hearts(2));
        assert_eq!(stable.hearts_current, 2);
    }

    #[test]
    fn flickering_field_never_stabilizes() {
        let mut buf = TemporalBuffer::new(3);
        buf.process(state_with_hearts(2));
        buf.process(state_with_hearts(3));
        let stable = buf.process(state_with_hearts(2));
        assert_eq!(stable.hearts_current, 0);
    }

    #[test]
    fn reset_clears_history_and_stable_state() {
        let mut buf = TemporalBuffer::new(3);
        buf.process(state_with_hearts(2));
        buf.process(state_with_hearts(2));
        buf.process(state_with_hearts(2));
        buf.reset();
        assert_eq!(buf.frame_count(), 0);
        let stable = buf.process(state_with_hearts(2));
        assert_eq!(stable.hearts_current, 0);
    }
}
