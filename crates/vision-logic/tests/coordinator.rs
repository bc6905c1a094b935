//! End-to-end validator scenarios: sequences of raw detected frames fed
//! through [`GameLogicValidator::validate`] one at a time, asserting on the
//! events/flags that come out the other side. Each test mirrors a single
//! real-world gameplay pattern rather than probing one rule in isolation.

use std::collections::HashSet;

use vision_core::state::GameState;
use vision_logic::validator::GameLogicValidator;

fn overworld(hearts: u8, hearts_max: u8, map_position: u16) -> GameState {
    GameState {
        screen_type: "overworld".to_string(),
        hearts_current: hearts,
        hearts_max,
        map_position,
        ..GameState::default()
    }
}

fn dungeon(level: u8, hearts: u8, hearts_max: u8) -> GameState {
    GameState { screen_type: "dungeon".to_string(), dungeon_level: level, hearts_current: hearts, hearts_max, ..GameState::default() }
}

/// Drives `frame_number` consecutive overworld frames (fixed hearts/position)
/// through the validator so its 120-frame `gameplay_started` streak latches.
/// Returns the next unused frame number.
fn warm_up_gameplay(v: &mut GameLogicValidator, start_frame: u64, hearts: u8, hearts_max: u8, position: u16) -> u64 {
    let mut frame = start_frame;
    for _ in 0..120 {
        v.validate(overworld(hearts, hearts_max, position), frame);
        frame += 1;
    }
    frame
}

#[test]
fn triforce_inference_via_dungeon_exit() {
    let mut v = GameLogicValidator::new(HashSet::new());
    let mut frame = 0u64;

    // Establish dungeon context before the exit sequence begins.
    v.validate(dungeon(3, 3, 5), frame);
    frame += 1;

    let mut death = dungeon(3, 3, 5);
    death.screen_type = "death".to_string();
    let out = v.validate(death, frame);
    assert!(out.events.is_empty());
    frame += 1;

    for _ in 0..2 {
        let mut transition = dungeon(3, 3, 5);
        transition.screen_type = "transition".to_string();
        let out = v.validate(transition, frame);
        assert!(out.events.is_empty());
        frame += 1;
    }

    let out = v.validate(overworld(5, 5, 1), frame);
    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].event, "triforce_inferred");
    assert_eq!(out.events[0].dungeon_level, 3);
    assert!(v.get_triforce_inferred()[2]);
}

#[test]
fn up_a_warp_via_position_reset() {
    let mut v = GameLogicValidator::new(HashSet::new());
    // First call just establishes `overworld_start`; it never reaches the
    // tracker (the validator's very first frame is a bare passthrough).
    v.validate(overworld(3, 3, 42), 0);
    let mut frame = warm_up_gameplay(&mut v, 1, 3, 3, 42);

    for _ in 0..4 {
        let mut transition = overworld(3, 3, 42);
        transition.screen_type = "transition".to_string();
        let out = v.validate(transition, frame);
        assert!(out.events.is_empty());
        frame += 1;
    }

    let out = v.validate(overworld(3, 3, 42), frame);
    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].event, "up_a_warp");
}

#[test]
fn death_via_csr_then_silence_on_next_death_frame() {
    let mut v = GameLogicValidator::new(HashSet::new());
    v.validate(overworld(3, 3, 10), 0);
    let mut frame = warm_up_gameplay(&mut v, 1, 3, 3, 10);

    // Drive hearts to zero for the 4-frame streak the tracker requires
    // before it trusts a zero reading over a misdetection.
    for _ in 0..4 {
        v.validate(overworld(0, 3, 10), frame);
        frame += 1;
    }

    let mut death = overworld(0, 3, 10);
    death.screen_type = "death".to_string();
    let out = v.validate(death, frame);
    assert_eq!(out.events.len(), 1);
    assert_eq!(out.events[0].event, "death");
    frame += 1;

    let mut death_again = death.clone();
    death_again.hearts_current = 0;
    let out = v.validate(death_again, frame);
    assert!(out.events.is_empty());
}

#[test]
fn bomb_max_ratchets_through_capacity_tiers() {
    let mut v = GameLogicValidator::new(HashSet::new());
    let readings: [(u8, u8); 6] = [(4, 8), (8, 8), (9, 8), (12, 12), (13, 12), (3, 8)];
    let expected = [8, 8, 12, 12, 16, 16];

    for (frame, ((bombs, bomb_max), want)) in readings.into_iter().zip(expected).enumerate() {
        let mut state = overworld(3, 3, 0);
        state.bombs = bombs;
        state.bomb_max = bomb_max;
        let out = v.validate(state, frame as u64);
        assert_eq!(out.bomb_max, want, "frame {frame}");
    }
}
