//! Room simulation.
//!
//! A [`Room`] is one isolated duel. It owns every player session and the
//! room-level outcome fields, and it is the only thing that mutates them.
//! It has no clock of its own: [`runtime`] drives `start`, `tick` and
//! `dispose` from tokio timers.

use crate::collision::{hits_wall, head_on, next_position, trail_hit, SELF_TRAIL_SKIP};
use protocol::state::RoomSnapshot;
use protocol::{Direction, Position, SessionId};
use tracing::{debug, info};

pub mod player;
pub mod runtime;

#[cfg(test)]
mod tests;

pub use player::Player;
pub use runtime::{spawn_room, JoinAccepted, RoomHandle, RoomUpdate};

pub type RoomId = u32;

/// Hard cap on sessions per room.
pub const MAX_PLAYERS: usize = 2;

/// Lifecycle of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Waiting for the second player.
    Waiting,
    /// Both players joined; the start delay is running.
    Countdown,
    /// Ticking.
    Playing,
    /// Outcome decided; waiting to be disposed.
    Ended,
    Disposed,
}

/// Result of a finished match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Winner(SessionId),
    Draw,
}

/// What a successful join means for the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Still waiting for an opponent.
    Waiting,
    /// Room is now full; the start sequence should begin.
    Ready,
}

/// Room errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Game already in progress")]
    GameInProgress,
    #[error("Session already joined")]
    AlreadyJoined,
    #[error("Room has been disposed")]
    Disposed,
}

/// One two-player match.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    phase: RoomPhase,
    /// Join order.
    players: Vec<Player>,
    winner: Option<SessionId>,
    game_started: bool,
    is_draw: bool,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            phase: RoomPhase::Waiting,
            players: Vec::with_capacity(MAX_PLAYERS),
            winner: None,
            game_started: false,
            is_draw: false,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, session_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.session_id == session_id)
    }

    fn player_mut(&mut self, session_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.session_id == session_id)
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn is_draw(&self) -> bool {
        self.is_draw
    }

    /// Sessions whose connection is still open.
    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    /// Admit a session. Spawn data is assigned by join order.
    pub fn join(&mut self, session_id: SessionId) -> Result<JoinOutcome, RoomError> {
        if self.phase == RoomPhase::Disposed {
            return Err(RoomError::Disposed);
        }
        if self.player(&session_id).is_some() {
            return Err(RoomError::AlreadyJoined);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::GameInProgress);
        }

        let player = Player::spawn(session_id, self.players.len());
        info!(
            "Room {}: player {} joined at ({}, {})",
            self.id, player.session_id, player.position.x, player.position.y
        );
        self.players.push(player);

        if self.players.len() == MAX_PLAYERS {
            info!("Room {}: 2 players connected, starting countdown", self.id);
            self.phase = RoomPhase::Countdown;
            Ok(JoinOutcome::Ready)
        } else {
            Ok(JoinOutcome::Waiting)
        }
    }

    /// Flip `game_started`. Only the first call after the countdown has an effect.
    ///
    /// A session that disconnected during the countdown is eliminated here,
    /// the same way a disconnect during play is.
    pub fn start(&mut self) -> bool {
        if self.phase != RoomPhase::Countdown {
            return false;
        }
        self.phase = RoomPhase::Playing;
        self.game_started = true;
        info!("Room {}: game started", self.id);

        for player in self.players.iter_mut().filter(|p| !p.connected) {
            player.eliminate();
            info!("Room {}: player {} left before start", self.id, player.session_id);
        }
        true
    }

    /// A session's connection went away. The record is kept so the other
    /// player's view and the end check keep working.
    pub fn leave(&mut self, session_id: &str) -> bool {
        let room_id = self.id;
        let in_play = self.phase == RoomPhase::Playing;
        let Some(player) = self.player_mut(session_id) else {
            return false;
        };

        player.connected = false;
        info!("Room {}: player {} left", room_id, session_id);
        if in_play && player.alive {
            player.eliminate();
            info!("Room {}: player {} eliminated by disconnect", room_id, session_id);
        }
        true
    }

    /// Apply a `keypress`. Returns whether the direction changed.
    ///
    /// Anything not applicable (unknown key, unknown or dead sender, match not
    /// running, reversal) is dropped without error.
    pub fn handle_keypress(&mut self, session_id: &str, key: &str) -> bool {
        if self.phase != RoomPhase::Playing {
            return false;
        }
        let Some(direction) = Direction::from_key(key) else {
            debug!("Room {}: ignoring unknown key {:?}", self.id, key);
            return false;
        };
        self.player_mut(session_id)
            .is_some_and(|player| player.steer(direction))
    }

    /// Run one simulation step.
    ///
    /// Every collision is evaluated against the same pre-tick state, so two
    /// players may be eliminated on the same tick. Eliminations are committed
    /// before any movement.
    pub fn tick(&mut self) -> Option<MatchOutcome> {
        if self.phase != RoomPhase::Playing {
            return None;
        }
        let candidates: Vec<(usize, Position)> = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(i, p)| (i, next_position(p.position, p.direction)))
            .collect();

        let mut crashed = vec![false; self.players.len()];

        for &(index, candidate) in &candidates {
            let session_id = &self.players[index].session_id;

            if hits_wall(candidate) {
                debug!(
                    "Room {}: {} will hit wall at ({}, {})",
                    self.id, session_id, candidate.x, candidate.y
                );
                crashed[index] = true;
                continue;
            }

            for (other_index, other) in self.players.iter().enumerate() {
                let skip = if other_index == index { SELF_TRAIL_SKIP } else { 0 };
                if let Some(point) = trail_hit(candidate, &other.trail, skip) {
                    debug!(
                        "Room {}: {} will hit trail at ({}, {}), trail point ({}, {})",
                        self.id, session_id, candidate.x, candidate.y, point.x, point.y
                    );
                    crashed[index] = true;
                    break;
                }
            }
        }

        if let &[(a, pos_a), (b, pos_b)] = candidates.as_slice() {
            if head_on(pos_a, pos_b) {
                debug!("Room {}: head-on collision", self.id);
                crashed[a] = true;
                crashed[b] = true;
            }
        }

        for (player, _) in self.players.iter_mut().zip(&crashed).filter(|(_, c)| **c) {
            player.eliminate();
            info!("Room {}: player {} crashed", self.id, player.session_id);
        }

        for &(index, candidate) in &candidates {
            self.players[index].advance(candidate);
        }

        let survivors: Vec<&SessionId> = self
            .players
            .iter()
            .filter(|p| p.alive)
            .map(|p| &p.session_id)
            .collect();
        let outcome = match survivors.as_slice() {
            [] => MatchOutcome::Draw,
            [winner] => MatchOutcome::Winner((*winner).clone()),
            _ => return None,
        };
        self.resolve(outcome.clone());
        Some(outcome)
    }

    fn resolve(&mut self, outcome: MatchOutcome) {
        match &outcome {
            MatchOutcome::Draw => {
                self.is_draw = true;
                self.winner = None;
                info!("Room {}: game over, draw", self.id);
            }
            MatchOutcome::Winner(session_id) => {
                self.winner = Some(session_id.clone());
                info!("Room {}: game over, winner {}", self.id, session_id);
            }
        }
        self.phase = RoomPhase::Ended;
    }

    /// Mark the room disposed. Returns false if it already was.
    pub fn dispose(&mut self) -> bool {
        if self.phase == RoomPhase::Disposed {
            return false;
        }
        self.phase = RoomPhase::Disposed;
        info!("Room {} disposed", self.id);
        true
    }

    /// Read-only replicated view.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            players: self.players.iter().map(Player::snapshot).collect(),
            winner: self.winner.clone().unwrap_or_default(),
            game_started: self.game_started,
            is_draw: self.is_draw,
        }
    }
}
