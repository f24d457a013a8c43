use super::*;
use crate::collision::GRID_UNIT;

fn playing_room() -> Room {
    let mut room = Room::new(1);
    room.join("a".to_string()).unwrap();
    room.join("b".to_string()).unwrap();
    assert!(room.start());
    room
}

/// Teleport a player, resetting its trail to the new point.
fn place(room: &mut Room, index: usize, x: f32, y: f32, direction: Direction) {
    let player = &mut room.players[index];
    player.position = Position::new(x, y);
    player.direction = direction;
    player.trail = vec![player.position];
}

#[test]
fn test_join_fills_room() {
    let mut room = Room::new(7);
    assert_eq!(room.join("a".to_string()), Ok(JoinOutcome::Waiting));
    assert_eq!(room.join("a".to_string()), Err(RoomError::AlreadyJoined));
    assert_eq!(room.join("b".to_string()), Ok(JoinOutcome::Ready));
    assert_eq!(room.phase(), RoomPhase::Countdown);
    assert_eq!(room.join("c".to_string()), Err(RoomError::RoomFull));

    let players = room.players();
    assert_eq!(players[0].position, Position::new(200.0, 384.0));
    assert_eq!(players[0].direction, Direction::Right);
    assert_eq!(players[1].position, Position::new(824.0, 384.0));
    assert_eq!(players[1].direction, Direction::Left);
    assert!(!room.game_started());
}

#[test]
fn test_no_ticks_before_start() {
    let mut room = Room::new(1);
    room.join("a".to_string()).unwrap();
    room.join("b".to_string()).unwrap();

    assert_eq!(room.tick(), None);
    assert!(!room.handle_keypress("a", "ArrowUp"));
    assert_eq!(room.players()[0].trail.len(), 1);
    assert_eq!(room.players()[0].direction, Direction::Right);
}

#[test]
fn test_start_only_once() {
    let mut room = playing_room();
    assert!(room.game_started());
    assert!(!room.start());
}

#[test]
fn test_tick_advances_one_unit() {
    let mut room = playing_room();
    assert_eq!(room.tick(), None);

    let a = room.player("a").unwrap();
    let b = room.player("b").unwrap();
    assert_eq!(a.position, Position::new(200.0 + GRID_UNIT, 384.0));
    assert_eq!(b.position, Position::new(824.0 - GRID_UNIT, 384.0));
    assert_eq!(a.trail, vec![Position::new(200.0, 384.0), Position::new(207.0, 384.0)]);
}

#[test]
fn test_trail_grows_once_per_tick() {
    let mut room = playing_room();
    for n in 1..=20 {
        assert_eq!(room.tick(), None);
        for player in room.players() {
            assert_eq!(player.trail.len(), n + 1);
            assert_eq!(player.trail.last(), Some(&player.position));
        }
    }
    assert_eq!(room.players()[0].position, Position::new(200.0 + 20.0 * GRID_UNIT, 384.0));
}

#[test]
fn test_keypress_turns_and_rejects_reversal() {
    let mut room = playing_room();
    assert!(!room.handle_keypress("a", "ArrowLeft"));
    assert!(!room.handle_keypress("a", "sideways"));
    assert!(!room.handle_keypress("nobody", "ArrowUp"));
    assert!(room.handle_keypress("a", "ArrowUp"));

    room.tick();
    assert_eq!(room.player("a").unwrap().position, Position::new(200.0, 377.0));
    assert!(!room.handle_keypress("a", "ArrowDown"));
}

#[test]
fn test_dead_sender_is_ignored() {
    let mut room = playing_room();
    room.players[0].eliminate();
    assert!(!room.handle_keypress("a", "ArrowUp"));
    assert_eq!(room.players()[0].direction, Direction::Right);
}

#[test]
fn test_wall_hit_gives_opponent_the_win() {
    let mut room = playing_room();
    place(&mut room, 0, 1000.0, 384.0, Direction::Right);

    assert_eq!(room.tick(), Some(MatchOutcome::Winner("b".to_string())));
    let a = room.player("a").unwrap();
    assert!(!a.alive);
    assert_eq!(a.position, Position::new(1000.0, 384.0));
    assert_eq!(a.trail.len(), 1);

    let b = room.player("b").unwrap();
    assert!(b.alive);
    assert_eq!(b.position, Position::new(817.0, 384.0));

    assert_eq!(room.winner(), Some("b"));
    assert!(!room.is_draw());
    assert_eq!(room.phase(), RoomPhase::Ended);
}

#[test]
fn test_no_mutation_after_outcome() {
    let mut room = playing_room();
    place(&mut room, 0, 1000.0, 384.0, Direction::Right);
    room.tick();

    let before = room.snapshot();
    assert_eq!(room.tick(), None);
    assert!(!room.handle_keypress("b", "ArrowUp"));
    assert_eq!(room.snapshot(), before);
}

#[test]
fn test_head_on_is_a_draw() {
    let mut room = playing_room();
    place(&mut room, 0, 500.0, 384.0, Direction::Right);
    place(&mut room, 1, 514.0, 384.0, Direction::Left);

    assert_eq!(room.tick(), Some(MatchOutcome::Draw));
    assert!(room.players().iter().all(|p| !p.alive));
    assert!(room.is_draw());
    assert_eq!(room.winner(), None);
    assert_eq!(room.snapshot().winner, "");
}

#[test]
fn test_adjacent_lanes_are_not_head_on() {
    let mut room = playing_room();
    place(&mut room, 0, 500.0, 384.0, Direction::Right);
    place(&mut room, 1, 600.0, 391.0, Direction::Left);

    assert_eq!(room.tick(), None);
    assert!(room.players().iter().all(|p| p.alive));
}

#[test]
fn test_simultaneous_wall_hits_draw() {
    let mut room = playing_room();
    place(&mut room, 0, 1000.0, 100.0, Direction::Right);
    place(&mut room, 1, 24.0, 600.0, Direction::Left);

    assert_eq!(room.tick(), Some(MatchOutcome::Draw));
}

#[test]
fn test_collisions_use_pre_tick_state() {
    let mut room = playing_room();
    // b's current cell is (500, 384); it moves away this tick.
    place(&mut room, 1, 500.0, 384.0, Direction::Up);
    room.players[1].trail = vec![Position::new(500.0, 391.0), Position::new(500.0, 384.0)];
    place(&mut room, 0, 493.0, 384.0, Direction::Right);

    assert_eq!(room.tick(), Some(MatchOutcome::Winner("b".to_string())));
    assert_eq!(room.player("a").unwrap().position, Position::new(493.0, 384.0));
    assert_eq!(room.player("b").unwrap().position, Position::new(500.0, 377.0));
}

#[test]
fn test_running_into_own_old_trail() {
    let mut room = playing_room();
    place(&mut room, 1, 824.0, 600.0, Direction::Left);
    // Eleven cells back on a's own line, then a sits one cell below it heading up.
    let trail: Vec<Position> = (0..11)
        .map(|i| Position::new(300.0 + i as f32 * GRID_UNIT, 384.0))
        .collect();
    room.players[0].trail = trail;
    room.players[0].position = Position::new(300.0, 391.0);
    let position = room.players[0].position;
    room.players[0].trail.push(position);
    room.players[0].direction = Direction::Up;

    assert_eq!(room.tick(), Some(MatchOutcome::Winner("b".to_string())));
}

#[test]
fn test_recent_own_trail_is_safe() {
    let mut room = playing_room();
    place(&mut room, 1, 824.0, 600.0, Direction::Left);
    // The point a is heading into is only a few cells old.
    room.players[0].trail = vec![
        Position::new(300.0, 384.0),
        Position::new(307.0, 384.0),
        Position::new(307.0, 391.0),
        Position::new(300.0, 391.0),
    ];
    room.players[0].position = Position::new(300.0, 391.0);
    room.players[0].direction = Direction::Up;

    assert_eq!(room.tick(), None);
    assert!(room.player("a").unwrap().alive);
}

#[test]
fn test_leave_during_play_forfeits() {
    let mut room = playing_room();
    assert!(room.leave("a"));
    assert!(!room.leave("nobody"));

    let a = room.player("a").unwrap();
    assert!(!a.alive);
    assert!(!a.connected);
    assert_eq!(room.connected_count(), 1);

    assert_eq!(room.tick(), Some(MatchOutcome::Winner("b".to_string())));
}

#[test]
fn test_leave_during_countdown_eliminated_at_start() {
    let mut room = Room::new(1);
    room.join("a".to_string()).unwrap();
    room.join("b".to_string()).unwrap();

    room.leave("b");
    assert!(room.player("b").unwrap().alive);

    room.start();
    assert!(!room.player("b").unwrap().alive);
    assert_eq!(room.tick(), Some(MatchOutcome::Winner("a".to_string())));
}

#[test]
fn test_dispose_is_idempotent() {
    let mut room = playing_room();
    assert!(room.dispose());
    assert!(!room.dispose());
    assert_eq!(room.tick(), None);
    assert_eq!(room.join("c".to_string()), Err(RoomError::Disposed));
}

#[test]
fn test_snapshot_reflects_room() {
    let mut room = playing_room();
    room.tick();
    let snapshot = room.snapshot();
    assert!(snapshot.game_started);
    assert!(!snapshot.is_draw);
    assert_eq!(snapshot.winner, "");
    assert_eq!(snapshot.players.len(), 2);
    assert_eq!(snapshot.players[0].session_id, "a");
    assert_eq!(snapshot.players[0].trail, vec![200.0, 384.0, 207.0, 384.0]);
}
