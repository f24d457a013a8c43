//! Player session state.

use protocol::state::PlayerSnapshot;
use protocol::{Color, Direction, Position, SessionId};

/// Spawn point, travel direction and color for each join slot.
pub const SPAWN_SLOTS: [(Position, Direction, Color); 2] = [
    (Position::new(200.0, 384.0), Direction::Right, Color::new(0xFF, 0x00, 0x00)),
    (Position::new(824.0, 384.0), Direction::Left, Color::new(0x00, 0x00, 0xFF)),
];

/// One connected participant and its token.
#[derive(Debug, Clone)]
pub struct Player {
    pub session_id: SessionId,
    pub position: Position,
    pub direction: Direction,
    pub alive: bool,
    /// Cleared when the session's connection goes away.
    pub connected: bool,
    pub color: Color,
    /// Every cell the token has occupied, oldest first. Starts at the spawn point.
    pub trail: Vec<Position>,
}

impl Player {
    /// Create the player for join slot `slot` (0 or 1).
    pub fn spawn(session_id: SessionId, slot: usize) -> Self {
        let (position, direction, color) = SPAWN_SLOTS[slot];
        Self {
            session_id,
            position,
            direction,
            alive: true,
            connected: true,
            color,
            trail: vec![position],
        }
    }

    /// Change direction. A reversal, or steering a dead token, is refused.
    pub fn steer(&mut self, direction: Direction) -> bool {
        if !self.alive || direction.is_reverse_of(self.direction) {
            return false;
        }
        self.direction = direction;
        true
    }

    /// Move to `to` and record it in the trail.
    pub fn advance(&mut self, to: Position) {
        if !self.alive {
            return;
        }
        self.position = to;
        self.trail.push(to);
    }

    pub fn eliminate(&mut self) {
        self.alive = false;
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            session_id: self.session_id.clone(),
            x: self.position.x,
            y: self.position.y,
            direction: self.direction,
            alive: self.alive,
            color: self.color,
            trail: self.trail.iter().flat_map(|p| [p.x, p.y]).collect(),
        }
    }
}
