use chess::Square;
use std::sync::Arc;
use std::time::Duration;

use realtime_chess::clock::ManualClock;
use realtime_chess::error::{MoveRejection, RegistryError};
use realtime_chess::models::{EndReason, MatchStatus, PlayerInfo, Settings};
use realtime_chess::state::JoinOptions;
use realtime_chess::{AppState, Config};

fn setup() -> (Arc<ManualClock>, AppState) {
    let clock = Arc::new(ManualClock::new());
    let state = AppState::with_clock(&Config::default(), clock.clone());
    (clock, state)
}

fn start_game(state: &AppState, id: &str) {
    for (player, name) in [("p1", "Player One"), ("p2", "Player Two")] {
        state
            .registry
            .join_match(id, PlayerInfo::new(player, name), JoinOptions::default())
            .unwrap();
    }
    state.registry.set_ready("p1").unwrap();
    let (started, snapshot) = state.registry.set_ready("p2").unwrap();
    assert!(started);
    assert_eq!(snapshot.status, MatchStatus::Playing);
}

#[test]
fn moved_piece_cools_down_on_its_destination() {
    let (clock, state) = setup();
    start_game(&state, "g1");

    let result = state
        .registry
        .make_move("p1", Square::E2, Square::E4, None)
        .unwrap();
    assert_eq!(result.snapshot.move_count, 1);
    assert_eq!(result.snapshot.cooldowns.len(), 1);
    assert_eq!(result.snapshot.cooldowns[0].square, "e4");
    assert_eq!(result.snapshot.cooldowns[0].owner, "p1");
    assert_eq!(result.snapshot.cooldowns[0].remaining_ms, 3000);

    let err = state
        .registry
        .make_move("p1", Square::E4, Square::E5, None)
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::Move(MoveRejection::Cooldown {
            square: "e4".to_string(),
            remaining_secs: 3,
        })
    );

    let moves = state.registry.possible_moves("p1").unwrap();
    assert!(!moves.contains_key(&Square::E4));

    clock.advance(Duration::from_secs(3));
    state
        .registry
        .make_move("p1", Square::E4, Square::E5, None)
        .unwrap();
}

#[test]
fn capturing_the_king_ends_the_game() {
    let (clock, state) = setup();
    start_game(&state, "g1");

    state.registry.make_move("p1", Square::E2, Square::E4, None).unwrap();
    state.registry.make_move("p1", Square::D1, Square::H5, None).unwrap();
    state.registry.make_move("p2", Square::F7, Square::F5, None).unwrap();
    clock.advance(Duration::from_secs(3));

    let result = state
        .registry
        .make_move("p1", Square::H5, Square::E8, None)
        .unwrap();
    let snapshot = result.snapshot;
    assert_eq!(snapshot.status, MatchStatus::Finished);
    assert_eq!(snapshot.winner.as_deref(), Some("p1"));
    assert_eq!(snapshot.end_reason, Some(EndReason::KingCaptured));
    assert_eq!(
        snapshot.last_move.and_then(|m| m.captured).as_deref(),
        Some("king")
    );

    let err = state
        .registry
        .make_move("p2", Square::D7, Square::D5, None)
        .unwrap_err();
    assert_eq!(err, RegistryError::Move(MoveRejection::NotPlaying));
}

#[test]
fn leaving_mid_game_forfeits() {
    let (_, state) = setup();
    start_game(&state, "g1");

    let left = state.registry.leave_match("p2");
    assert!(!left.deleted);
    let snapshot = left.snapshot.unwrap();
    assert_eq!(snapshot.status, MatchStatus::Finished);
    assert_eq!(snapshot.winner.as_deref(), Some("p1"));
    assert_eq!(snapshot.end_reason, Some(EndReason::Disconnection));
    assert!(state.registry.match_id_of("p2").is_none());

    let last = state.registry.leave_match("p1");
    assert!(last.deleted);
    assert!(state.registry.get_match("g1").is_none());
}

#[test]
fn third_joiner_watches_and_sides_can_switch() {
    let (_, state) = setup();
    for id in ["p1", "p2"] {
        state
            .registry
            .join_match("g1", PlayerInfo::new(id, id), JoinOptions::default())
            .unwrap();
    }
    let watcher = state
        .registry
        .join_match("g1", PlayerInfo::new("p3", "Watcher"), JoinOptions::default())
        .unwrap();
    assert!(watcher.outcome.as_spectator);
    assert_eq!(watcher.snapshot.players.len(), 2);
    assert_eq!(watcher.snapshot.spectators.len(), 1);

    let again = state
        .registry
        .join_match("g1", PlayerInfo::new("p3", "Watcher"), JoinOptions::default());
    assert_eq!(again.unwrap_err(), RegistryError::AlreadyInGame);

    let (switched, snapshot) = state.registry.switch_sides("p1").unwrap();
    assert!(switched);
    let p1 = snapshot.players.iter().find(|p| p.id == "p1").unwrap();
    assert_eq!(p1.color, "black");
}

#[test]
fn move_rate_is_limited_per_player() {
    let (clock, state) = setup();
    for id in ["p1", "p2"] {
        state
            .registry
            .join_match("g1", PlayerInfo::new(id, id), JoinOptions::default())
            .unwrap();
    }
    state
        .registry
        .set_settings(
            "p1",
            Settings {
                max_moves_per_period: 2,
                piece_cooldown_seconds: 1,
            },
        )
        .unwrap();
    state.registry.set_ready("p1").unwrap();
    state.registry.set_ready("p2").unwrap();

    state.registry.make_move("p1", Square::A2, Square::A3, None).unwrap();
    state.registry.make_move("p1", Square::B2, Square::B3, None).unwrap();
    let err = state
        .registry
        .make_move("p1", Square::C2, Square::C3, None)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Move(MoveRejection::RateLimited { max_moves: 2, .. })
    ));

    // the opponent has a ledger of their own
    state.registry.make_move("p2", Square::A7, Square::A6, None).unwrap();

    clock.advance(Duration::from_secs(10));
    state.registry.make_move("p1", Square::C2, Square::C3, None).unwrap();
}

#[test]
fn settings_lock_once_play_starts() {
    let (_, state) = setup();
    start_game(&state, "g1");
    let err = state
        .registry
        .set_settings("p1", Settings::default())
        .unwrap_err();
    assert!(matches!(err, RegistryError::Match(_)));
}
