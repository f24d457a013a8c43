//! Matchmaking.
//!
//! Sessions asking for the same mode tag are paired into the same room
//! until it is full. Seats are reserved under the lobby lock so two
//! concurrent joins never pick the same last seat.

use crate::config::TimingConfig;
use crate::room::{spawn_room, JoinAccepted, RoomError, RoomHandle, RoomId, MAX_PLAYERS};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Attempts to find a live room before giving up on a join.
const JOIN_ATTEMPTS: usize = 3;

/// Lobby errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LobbyError {
    #[error("Too many rooms")]
    TooManyRooms,
    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Summary of an open room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub mode: String,
    /// Seats handed out so far.
    pub reserved: usize,
}

struct RoomSlot {
    handle: RoomHandle,
    reserved: usize,
}

struct LobbyState {
    next_id: RoomId,
    rooms: Vec<RoomSlot>,
}

/// Room registry shared by every connection.
pub struct Lobby {
    state: Mutex<LobbyState>,
    max_rooms: usize,
    timing: TimingConfig,
}

impl Lobby {
    pub fn new(max_rooms: usize, timing: TimingConfig) -> Self {
        Self {
            state: Mutex::new(LobbyState {
                next_id: 1,
                rooms: Vec::new(),
            }),
            max_rooms,
            timing,
        }
    }

    /// Reserve a seat in a room of `mode`, creating a room when none has one free.
    pub async fn reserve(&self, mode: &str) -> Result<RoomHandle, LobbyError> {
        let mut state = self.state.lock().await;
        state.rooms.retain(|slot| !slot.handle.is_closed());

        if let Some(slot) = state
            .rooms
            .iter_mut()
            .find(|slot| slot.handle.mode() == mode && slot.reserved < MAX_PLAYERS)
        {
            slot.reserved += 1;
            return Ok(slot.handle.clone());
        }

        if state.rooms.len() >= self.max_rooms {
            warn!("Room limit reached ({}), rejecting {:?}", self.max_rooms, mode);
            return Err(LobbyError::TooManyRooms);
        }

        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        let handle = spawn_room(id, mode, self.timing);
        state.rooms.push(RoomSlot {
            handle: handle.clone(),
            reserved: 1,
        });
        Ok(handle)
    }

    /// Reserve a seat and join it.
    ///
    /// A room can dispose between reservation and join; another one is
    /// tried in that case.
    pub async fn join(
        &self,
        mode: &str,
        session_id: &str,
    ) -> Result<(RoomHandle, JoinAccepted), LobbyError> {
        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.reserve(mode).await?;
            match handle.join(session_id.to_string()).await {
                Ok(accepted) => {
                    info!("Session {} placed in room {}", session_id, handle.id());
                    return Ok((handle, accepted));
                }
                Err(RoomError::Disposed) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(RoomError::Disposed.into())
    }

    /// Number of rooms whose task is still running.
    pub async fn room_count(&self) -> usize {
        let state = self.state.lock().await;
        state.rooms.iter().filter(|slot| !slot.handle.is_closed()).count()
    }

    pub async fn rooms(&self) -> Vec<RoomSummary> {
        let state = self.state.lock().await;
        state
            .rooms
            .iter()
            .filter(|slot| !slot.handle.is_closed())
            .map(|slot| RoomSummary {
                id: slot.handle.id(),
                mode: slot.handle.mode().to_string(),
                reserved: slot.reserved,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn lobby(max_rooms: usize) -> Lobby {
        Lobby::new(max_rooms, TimingConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pairs_by_mode() {
        let lobby = lobby(10);
        let a = lobby.reserve("duel").await.unwrap();
        let b = lobby.reserve("ranked").await.unwrap();
        let c = lobby.reserve("duel").await.unwrap();
        let d = lobby.reserve("duel").await.unwrap();

        assert_eq!(a.id(), c.id());
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), d.id());
        assert_eq!(lobby.room_count().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_limit() {
        let lobby = lobby(1);
        lobby.reserve("").await.unwrap();
        lobby.reserve("").await.unwrap();
        assert_eq!(lobby.reserve("").await.unwrap_err(), LobbyError::TooManyRooms);
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_places_two_sessions_together() {
        let lobby = lobby(10);
        let (first, _) = lobby.join("duel", "a").await.unwrap();
        let (second, accepted) = lobby.join("duel", "b").await.unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(accepted.state.snapshot.players.len(), 2);

        let rooms = lobby.rooms().await;
        assert_eq!(
            rooms,
            vec![RoomSummary {
                id: first.id(),
                mode: "duel".to_string(),
                reserved: 2,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_rooms_are_purged() {
        let lobby = lobby(1);
        let (handle, _) = lobby.join("duel", "a").await.unwrap();
        handle.leave("a".to_string()).await;

        // Let the room task exit.
        while !handle.is_closed() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(lobby.room_count().await, 0);

        let (replacement, _) = lobby.join("duel", "b").await.unwrap();
        assert_ne!(replacement.id(), handle.id());
    }
}
