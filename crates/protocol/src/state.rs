//! Replicated room state.
//!
//! The server owns plain state and, once per publish, produces a
//! [`RoomSnapshot`]. Consecutive snapshots are reduced to a [`StateDelta`]
//! which is what goes over the wire; renderers fold deltas back into their
//! read-only copy with [`RoomSnapshot::apply`].

use crate::{Color, Direction, SessionId};

/// Read-only view of one player session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub session_id: SessionId,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub alive: bool,
    pub color: Color,
    /// Flat `x, y` pairs, oldest first.
    pub trail: Vec<f32>,
}

/// Read-only view of a whole room. Players are in join order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoomSnapshot {
    pub players: Vec<PlayerSnapshot>,
    /// Winning session id, empty while unresolved or on a draw.
    pub winner: String,
    pub game_started: bool,
    pub is_draw: bool,
}

/// Changed fields of a player that already existed in the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerDelta {
    pub session_id: SessionId,
    pub position: Option<(f32, f32)>,
    pub direction: Option<Direction>,
    pub alive: Option<bool>,
    /// Trail numbers appended since the previous snapshot.
    pub trail_appended: Vec<f32>,
}

impl PlayerDelta {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            position: None,
            direction: None,
            alive: None,
            trail_appended: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.direction.is_none()
            && self.alive.is_none()
            && self.trail_appended.is_empty()
    }
}

/// Difference between two room snapshots.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateDelta {
    /// Players sent in full (new joins, or a trail that stopped being a prefix).
    pub added: Vec<PlayerSnapshot>,
    pub changed: Vec<PlayerDelta>,
    pub winner: Option<String>,
    pub game_started: Option<bool>,
    pub is_draw: Option<bool>,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.winner.is_none()
            && self.game_started.is_none()
            && self.is_draw.is_none()
    }
}

impl RoomSnapshot {
    pub fn player(&self, session_id: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.session_id == session_id)
    }

    /// Compute what changed between `previous` and `self`.
    pub fn diff(&self, previous: &RoomSnapshot) -> StateDelta {
        let mut delta = StateDelta::default();

        for player in &self.players {
            let Some(before) = previous.player(&player.session_id) else {
                delta.added.push(player.clone());
                continue;
            };

            // Trails only grow; anything else is resent in full.
            if !player.trail.starts_with(&before.trail) {
                delta.added.push(player.clone());
                continue;
            }

            let mut changed = PlayerDelta::new(player.session_id.clone());
            if (player.x, player.y) != (before.x, before.y) {
                changed.position = Some((player.x, player.y));
            }
            if player.direction != before.direction {
                changed.direction = Some(player.direction);
            }
            if player.alive != before.alive {
                changed.alive = Some(player.alive);
            }
            changed
                .trail_appended
                .extend_from_slice(&player.trail[before.trail.len()..]);

            if !changed.is_empty() {
                delta.changed.push(changed);
            }
        }

        if self.winner != previous.winner {
            delta.winner = Some(self.winner.clone());
        }
        if self.game_started != previous.game_started {
            delta.game_started = Some(self.game_started);
        }
        if self.is_draw != previous.is_draw {
            delta.is_draw = Some(self.is_draw);
        }

        delta
    }

    /// Fold a delta into this snapshot.
    pub fn apply(&mut self, delta: &StateDelta) {
        for added in &delta.added {
            match self
                .players
                .iter_mut()
                .find(|p| p.session_id == added.session_id)
            {
                Some(existing) => *existing = added.clone(),
                None => self.players.push(added.clone()),
            }
        }

        for changed in &delta.changed {
            let Some(player) = self
                .players
                .iter_mut()
                .find(|p| p.session_id == changed.session_id)
            else {
                continue;
            };
            if let Some((x, y)) = changed.position {
                player.x = x;
                player.y = y;
            }
            if let Some(direction) = changed.direction {
                player.direction = direction;
            }
            if let Some(alive) = changed.alive {
                player.alive = alive;
            }
            player.trail.extend_from_slice(&changed.trail_appended);
        }

        if let Some(winner) = &delta.winner {
            self.winner = winner.clone();
        }
        if let Some(game_started) = delta.game_started {
            self.game_started = game_started;
        }
        if let Some(is_draw) = delta.is_draw {
            self.is_draw = is_draw;
        }
    }
}
