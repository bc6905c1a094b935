//! Property-based tests for the validator's core monotonicity/boundedness
//! invariants, fuzzed with `proptest` across randomly generated frame
//! sequences the way `nesium-support`'s resampler equivalence suites fuzz
//! pixel buffers.

use proptest::prelude::*;
use std::collections::HashSet;
use vision_core::state::GameState;
use vision_logic::validator::GameLogicValidator;

fn raw_frame(screen_type: &str, hearts_max: u8, triforce: [bool; 8], sword_level: u8, bombs: u8, rupees: u16) -> GameState {
    GameState {
        screen_type: screen_type.to_string(),
        hearts_current: hearts_max,
        hearts_max,
        triforce,
        sword_level,
        bombs,
        rupees,
        ..GameState::default()
    }
}

proptest! {
    /// `hearts_max` never decreases across a validated sequence, and
    /// `hearts_current` never exceeds it.
    #[test]
    fn hearts_max_monotonic_and_hearts_bounded(readings in prop::collection::vec(0u8..20, 1..30)) {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut prev_max = 0u8;
        for (i, &hearts_max) in readings.iter().enumerate() {
            let out = v.validate(raw_frame("overworld", hearts_max, [false; 8], 0, 0, 0), i as u64);
            prop_assert!(out.hearts_max >= prev_max);
            prop_assert!(out.hearts_current <= out.hearts_max);
            prev_max = out.hearts_max;
        }
    }

    /// Once a triforce piece bit is observed set, it stays set for the
    /// remainder of the sequence even if later raw detections flip it back.
    #[test]
    fn triforce_bits_never_uncollected(flips in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut latched = false;
        for (i, &bit) in flips.iter().enumerate() {
            latched = latched || bit;
            let mut triforce = [false; 8];
            triforce[0] = bit;
            let out = v.validate(raw_frame("subscreen", 3, triforce, 0, 0, 0), i as u64);
            if latched {
                prop_assert!(out.triforce[0]);
            }
        }
    }

    /// Sword level never decreases across a validated sequence.
    #[test]
    fn sword_level_monotonic(readings in prop::collection::vec(0u8..4, 1..30)) {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut prev = 0u8;
        for (i, &sword_level) in readings.iter().enumerate() {
            let out = v.validate(raw_frame("overworld", 3, [false; 8], sword_level, 0, 0), i as u64);
            prop_assert!(out.sword_level >= prev);
            prev = out.sword_level;
        }
    }

    /// `bomb_max` only ever takes one of the three known capacity tiers and
    /// never decreases, regardless of how `bombs` jitters frame to frame.
    #[test]
    fn bomb_max_ratchets_through_known_tiers(bomb_readings in prop::collection::vec(0u8..20, 1..30)) {
        let mut v = GameLogicValidator::new(HashSet::new());
        let mut prev = 0u8;
        for (i, &bombs) in bomb_readings.iter().enumerate() {
            let out = v.validate(raw_frame("overworld", 3, [false; 8], 0, bombs, 0), i as u64);
            prop_assert!([8, 12, 16].contains(&out.bomb_max));
            prop_assert!(out.bomb_max >= prev);
            prev = out.bomb_max;
        }
    }

    /// Rupees are always clamped into the 8-bit display range.
    #[test]
    fn rupees_always_bounded(readings in prop::collection::vec(0u16..5000, 1..30)) {
        let mut v = GameLogicValidator::new(HashSet::new());
        for (i, &rupees) in readings.iter().enumerate() {
            let out = v.validate(raw_frame("overworld", 3, [false; 8], 0, 0, rupees), i as u64);
            prop_assert!(out.rupees <= 255);
        }
    }
}
