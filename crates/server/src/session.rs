//! Per-connection session driver.
//!
//! Transport agnostic: both the plain tungstenite listener and the axum
//! `/game` endpoint adapt their socket into a stream of [`Frame`]s and a
//! sink of encoded packets and hand them to [`drive_session`].

use crate::lobby::Lobby;
use crate::room::{RoomHandle, RoomUpdate};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use protocol::packets::{self, ClientPacket};
use protocol::state::RoomSnapshot;
use protocol::SessionId;
use rand::distr::Alphanumeric;
use rand::Rng;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Length of generated session ids.
pub const SESSION_ID_LEN: usize = 9;

/// One inbound message, reduced to what the session cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Packet(Bytes),
    Close,
    /// Text, ping and pong frames.
    Ignored,
}

/// Generate a random session id.
pub fn generate_session_id() -> SessionId {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

/// Run one connection from its first frame until it closes.
///
/// The session must send `Join` within `join_timeout`. Once placed in a
/// room it receives `Joined` and a full snapshot, then every published
/// update. Disconnecting leaves the room; the room closing ends the session.
pub async fn drive_session<S, K>(
    mut frames: S,
    mut sink: K,
    lobby: &Lobby,
    join_timeout: Duration,
) -> anyhow::Result<()>
where
    S: Stream<Item = anyhow::Result<Frame>> + Unpin,
    K: Sink<Bytes, Error = anyhow::Error> + Unpin,
{
    let mode = match tokio::time::timeout(join_timeout, wait_for_join(&mut frames)).await {
        Ok(Ok(Some(mode))) => mode,
        Ok(Ok(None)) => return Ok(()),
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            info!("Connection did not join within {:?}", join_timeout);
            let _ = sink.close().await;
            return Ok(());
        }
    };

    let session_id = generate_session_id();
    let (room, accepted) = match lobby.join(&mode, &session_id).await {
        Ok(joined) => joined,
        Err(e) => {
            warn!("Session {} could not join {:?}: {}", session_id, mode, e);
            let _ = sink.close().await;
            return Ok(());
        }
    };

    let mut session = Session {
        id: session_id,
        room,
        seq: accepted.state.seq,
        room_closed: false,
    };
    // Any failure from here on still has to reach `leave`.
    let result = match session.greet(&mut sink, &accepted.state.snapshot).await {
        Ok(()) => session.run(&mut frames, &mut sink, accepted.updates).await,
        Err(e) => Err(e),
    };

    if !session.room_closed {
        session.room.leave(session.id.clone()).await;
    }
    info!("Session {} ended", session.id);
    let _ = sink.close().await;
    result
}

/// Read frames until a `Join` arrives. `None` if the connection closed first.
async fn wait_for_join<S>(frames: &mut S) -> anyhow::Result<Option<String>>
where
    S: Stream<Item = anyhow::Result<Frame>> + Unpin,
{
    while let Some(frame) = frames.next().await {
        match frame? {
            Frame::Packet(data) => match ClientPacket::parse(&data) {
                Ok(ClientPacket::Join { mode }) => return Ok(Some(mode)),
                Ok(packet) => debug!("Ignoring {:?} before join", packet),
                Err(e) => warn!("Packet error before join: {}", e),
            },
            Frame::Close => return Ok(None),
            Frame::Ignored => {}
        }
    }
    Ok(None)
}

struct Session {
    id: SessionId,
    room: RoomHandle,
    /// Sequence number of the last delta this session has seen.
    seq: u64,
    room_closed: bool,
}

impl Session {
    /// Send the assigned id and the state at join time.
    async fn greet<K>(&self, sink: &mut K, snapshot: &RoomSnapshot) -> anyhow::Result<()>
    where
        K: Sink<Bytes, Error = anyhow::Error> + Unpin,
    {
        sink.send(packets::build_joined(&self.id).finish()).await?;
        sink.send(packets::build_full_state(snapshot).finish()).await?;
        Ok(())
    }

    async fn run<S, K>(
        &mut self,
        frames: &mut S,
        sink: &mut K,
        mut updates: tokio::sync::broadcast::Receiver<RoomUpdate>,
    ) -> anyhow::Result<()>
    where
        S: Stream<Item = anyhow::Result<Frame>> + Unpin,
        K: Sink<Bytes, Error = anyhow::Error> + Unpin,
    {
        loop {
            tokio::select! {
                frame = frames.next() => match frame {
                    Some(Ok(Frame::Packet(data))) => self.handle_packet(&data).await,
                    Some(Ok(Frame::Ignored)) => {}
                    Some(Ok(Frame::Close)) | None => {
                        info!("Session {} disconnected", self.id);
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e),
                },
                update = updates.recv() => match update {
                    Ok(RoomUpdate::Delta { seq, delta }) => {
                        if seq > self.seq {
                            self.seq = seq;
                            sink.send(packets::build_state_delta(&delta).finish()).await?;
                        }
                    }
                    Ok(RoomUpdate::GameReady) => {
                        sink.send(packets::build_game_ready().finish()).await?;
                    }
                    Ok(RoomUpdate::Closed) | Err(RecvError::Closed) => {
                        self.room_closed = true;
                        sink.send(packets::build_room_closed().finish()).await?;
                        return Ok(());
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Session {} lagged by {} updates, resending state", self.id, skipped);
                        if let Some(state) = self.room.snapshot().await {
                            self.seq = state.seq;
                            sink.send(packets::build_full_state(&state.snapshot).finish()).await?;
                        }
                    }
                },
            }
        }
    }

    async fn handle_packet(&self, data: &[u8]) {
        match ClientPacket::parse(data) {
            Ok(ClientPacket::Keypress { key }) => {
                self.room.keypress(self.id.clone(), key).await;
            }
            Ok(ClientPacket::Join { .. }) => debug!("Session {} already joined", self.id),
            Err(e) => warn!("Packet error from {}: {}", self.id, e),
        }
    }
}
