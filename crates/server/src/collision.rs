//! Collision detection.
//!
//! Pure geometry used by the room tick:
//! - Advancing a token by one grid unit
//! - Wall containment
//! - Trail proximity (with the self-trail grace window)
//! - Head-on detection between two candidates

use protocol::{Direction, Position};

// Board geometry shared with the renderer.
pub const ARENA_WIDTH: f32 = 1024.0;
pub const ARENA_HEIGHT: f32 = 768.0;
pub const BORDER: f32 = 10.0;

/// Playable interior, inclusive on both ends.
pub const WALL_MIN: f32 = 2.0 * BORDER;
pub const WALL_MAX_X: f32 = ARENA_WIDTH - 2.0 * BORDER;
pub const WALL_MAX_Y: f32 = ARENA_HEIGHT - 2.0 * BORDER;

/// Distance a token travels per tick.
pub const GRID_UNIT: f32 = 7.0;
/// A candidate closer than this to any trail point collides with it.
pub const TRAIL_COLLISION_RADIUS: f32 = 3.0;
/// Most recent own trail points ignored when checking a token against its own trail.
pub const SELF_TRAIL_SKIP: usize = 10;
/// Two candidates closer than this collide head-on.
pub const HEAD_ON_RADIUS: f32 = GRID_UNIT;

/// Position one grid unit ahead of `position` in `direction`.
#[inline]
pub fn next_position(position: Position, direction: Direction) -> Position {
    position + direction.unit() * GRID_UNIT
}

/// True when `position` lies outside the playable interior.
#[inline]
pub fn hits_wall(position: Position) -> bool {
    position.x < WALL_MIN || position.x > WALL_MAX_X || position.y < WALL_MIN || position.y > WALL_MAX_Y
}

/// First trail point (oldest first) within collision range of `candidate`.
///
/// The newest `skip_recent` points are excluded from the scan. Every
/// remaining point is considered until the first hit.
pub fn trail_hit(candidate: Position, trail: &[Position], skip_recent: usize) -> Option<Position> {
    let end = trail.len().saturating_sub(skip_recent);
    trail[..end]
        .iter()
        .copied()
        .find(|point| candidate.distance(*point) < TRAIL_COLLISION_RADIUS)
}

/// True when two candidate positions are close enough to collide head-on.
#[inline]
pub fn head_on(a: Position, b: Position) -> bool {
    a.distance(b) < HEAD_ON_RADIUS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_trail(len: usize) -> Vec<Position> {
        (0..len)
            .map(|i| Position::new(100.0 + i as f32 * GRID_UNIT, 384.0))
            .collect()
    }

    #[test]
    fn test_next_position() {
        let p = Position::new(200.0, 384.0);
        assert_eq!(next_position(p, Direction::Up), Position::new(200.0, 377.0));
        assert_eq!(next_position(p, Direction::Right), Position::new(207.0, 384.0));
        assert_eq!(next_position(p, Direction::Down), Position::new(200.0, 391.0));
        assert_eq!(next_position(p, Direction::Left), Position::new(193.0, 384.0));
    }

    #[test]
    fn test_wall_bounds() {
        assert_eq!((WALL_MIN, WALL_MAX_X, WALL_MAX_Y), (20.0, 1004.0, 748.0));
        assert!(!hits_wall(Position::new(20.0, 20.0)));
        assert!(!hits_wall(Position::new(1004.0, 748.0)));
        assert!(hits_wall(Position::new(19.0, 384.0)));
        assert!(hits_wall(Position::new(1007.0, 384.0)));
        assert!(hits_wall(Position::new(500.0, 13.0)));
        assert!(hits_wall(Position::new(500.0, 749.0)));
    }

    #[test]
    fn test_trail_radius_is_strict() {
        let trail = vec![Position::new(100.0, 100.0)];
        assert!(trail_hit(Position::new(102.9, 100.0), &trail, 0).is_some());
        assert!(trail_hit(Position::new(103.0, 100.0), &trail, 0).is_none());
    }

    #[test]
    fn test_self_trail_grace_window() {
        let trail = straight_trail(25);
        let len = trail.len();

        // 11th point from the end is outside the grace window.
        let eleventh = trail[len - 11];
        assert_eq!(trail_hit(eleventh, &trail, SELF_TRAIL_SKIP), Some(eleventh));

        // 9th and 10th points from the end are inside it.
        assert!(trail_hit(trail[len - 9], &trail, SELF_TRAIL_SKIP).is_none());
        assert!(trail_hit(trail[len - 10], &trail, SELF_TRAIL_SKIP).is_none());

        // Without the window the same point collides.
        assert!(trail_hit(trail[len - 9], &trail, 0).is_some());
    }

    #[test]
    fn test_short_trail_is_fully_skipped() {
        let trail = straight_trail(4);
        assert!(trail_hit(trail[0], &trail, SELF_TRAIL_SKIP).is_none());
    }

    #[test]
    fn test_first_hit_is_oldest() {
        let trail = vec![
            Position::new(50.0, 50.0),
            Position::new(101.0, 100.0),
            Position::new(100.0, 100.0),
        ];
        assert_eq!(
            trail_hit(Position::new(100.0, 100.0), &trail, 0),
            Some(Position::new(101.0, 100.0))
        );
    }

    #[test]
    fn test_head_on() {
        assert!(head_on(Position::new(500.0, 384.0), Position::new(506.0, 384.0)));
        assert!(head_on(Position::new(500.0, 384.0), Position::new(500.0, 384.0)));
        assert!(!head_on(Position::new(500.0, 384.0), Position::new(507.0, 384.0)));
    }
}
