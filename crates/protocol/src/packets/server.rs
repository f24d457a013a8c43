//! Server -> Client packets.

use super::ServerOpcode;
use crate::state::{PlayerDelta, PlayerSnapshot, RoomSnapshot, StateDelta};
use crate::{BinaryReader, BinaryWriter, Color, Direction, ProtocolError, SessionId};

const PLAYER_POSITION: u8 = 0x01;
const PLAYER_DIRECTION: u8 = 0x02;
const PLAYER_ALIVE: u8 = 0x04;
const PLAYER_TRAIL: u8 = 0x08;

const ROOM_WINNER: u8 = 0x01;
const ROOM_STARTED: u8 = 0x02;
const ROOM_DRAW: u8 = 0x04;

/// Parsed server packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    Joined { session_id: SessionId },
    FullState(RoomSnapshot),
    StateDelta(StateDelta),
    GameReady,
    RoomClosed,
}

impl ServerPacket {
    /// Encode this packet for sending.
    pub fn encode(&self) -> BinaryWriter {
        match self {
            ServerPacket::Joined { session_id } => build_joined(session_id),
            ServerPacket::FullState(snapshot) => build_full_state(snapshot),
            ServerPacket::StateDelta(delta) => build_state_delta(delta),
            ServerPacket::GameReady => build_game_ready(),
            ServerPacket::RoomClosed => build_room_closed(),
        }
    }

    /// Parse a server packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::EmptyPacket);
        }

        let mut r = BinaryReader::new(data.to_vec());
        let opcode = r.get_u8()?;
        match opcode {
            0x01 => Ok(ServerPacket::Joined {
                session_id: r.get_string()?,
            }),
            0x10 => Ok(ServerPacket::FullState(read_room(&mut r)?)),
            0x11 => Ok(ServerPacket::StateDelta(read_delta(&mut r)?)),
            0x20 => Ok(ServerPacket::GameReady),
            0x30 => Ok(ServerPacket::RoomClosed),
            _ => Err(ProtocolError::InvalidOpcode(opcode)),
        }
    }
}

/// Build a Joined packet (0x01).
pub fn build_joined(session_id: &str) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(2 + session_id.len());
    w.put_u8(ServerOpcode::Joined as u8);
    w.put_string(session_id);
    w
}

/// Build a FullState packet (0x10).
pub fn build_full_state(snapshot: &RoomSnapshot) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(256);
    w.put_u8(ServerOpcode::FullState as u8);
    write_room(&mut w, snapshot);
    w
}

/// Build a StateDelta packet (0x11).
pub fn build_state_delta(delta: &StateDelta) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::StateDelta as u8);

    w.put_u8(delta.added.len() as u8);
    for player in &delta.added {
        write_player(&mut w, player);
    }

    w.put_u8(delta.changed.len() as u8);
    for changed in &delta.changed {
        let mut mask = 0u8;
        if changed.position.is_some() {
            mask |= PLAYER_POSITION;
        }
        if changed.direction.is_some() {
            mask |= PLAYER_DIRECTION;
        }
        if changed.alive.is_some() {
            mask |= PLAYER_ALIVE;
        }
        if !changed.trail_appended.is_empty() {
            mask |= PLAYER_TRAIL;
        }

        w.put_string(&changed.session_id);
        w.put_u8(mask);
        if let Some((x, y)) = changed.position {
            w.put_f32(x);
            w.put_f32(y);
        }
        if let Some(direction) = changed.direction {
            w.put_u8(direction.ordinal());
        }
        if let Some(alive) = changed.alive {
            w.put_bool(alive);
        }
        if mask & PLAYER_TRAIL != 0 {
            write_numbers(&mut w, &changed.trail_appended);
        }
    }

    let mut room_mask = 0u8;
    if delta.winner.is_some() {
        room_mask |= ROOM_WINNER;
    }
    if delta.game_started.is_some() {
        room_mask |= ROOM_STARTED;
    }
    if delta.is_draw.is_some() {
        room_mask |= ROOM_DRAW;
    }
    w.put_u8(room_mask);
    if let Some(winner) = &delta.winner {
        w.put_string(winner);
    }
    if let Some(started) = delta.game_started {
        w.put_bool(started);
    }
    if let Some(draw) = delta.is_draw {
        w.put_bool(draw);
    }
    w
}

/// Build a GameReady packet (0x20).
pub fn build_game_ready() -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(1);
    w.put_u8(ServerOpcode::GameReady as u8);
    w
}

/// Build a RoomClosed packet (0x30).
pub fn build_room_closed() -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(1);
    w.put_u8(ServerOpcode::RoomClosed as u8);
    w
}

fn write_numbers(w: &mut BinaryWriter, numbers: &[f32]) {
    w.put_u32(numbers.len() as u32);
    for &n in numbers {
        w.put_f32(n);
    }
}

fn read_numbers(r: &mut BinaryReader) -> Result<Vec<f32>, ProtocolError> {
    let len = r.get_u32()? as usize;
    // Each number is four bytes; reject lengths the buffer cannot hold.
    if len.saturating_mul(4) > r.remaining() {
        return Err(ProtocolError::UnexpectedEof);
    }
    (0..len).map(|_| r.get_f32()).collect()
}

fn write_player(w: &mut BinaryWriter, p: &PlayerSnapshot) {
    w.put_string(&p.session_id);
    w.put_f32(p.x);
    w.put_f32(p.y);
    w.put_u8(p.direction.ordinal());
    w.put_bool(p.alive);
    w.put_u8(p.color.r);
    w.put_u8(p.color.g);
    w.put_u8(p.color.b);
    write_numbers(w, &p.trail);
}

fn read_player(r: &mut BinaryReader) -> Result<PlayerSnapshot, ProtocolError> {
    Ok(PlayerSnapshot {
        session_id: r.get_string()?,
        x: r.get_f32()?,
        y: r.get_f32()?,
        direction: Direction::from_ordinal(r.get_u8()?)?,
        alive: r.get_bool()?,
        color: Color::new(r.get_u8()?, r.get_u8()?, r.get_u8()?),
        trail: read_numbers(r)?,
    })
}

fn write_room(w: &mut BinaryWriter, snapshot: &RoomSnapshot) {
    w.put_u8(snapshot.players.len() as u8);
    for player in &snapshot.players {
        write_player(w, player);
    }
    w.put_string(&snapshot.winner);
    w.put_bool(snapshot.game_started);
    w.put_bool(snapshot.is_draw);
}

fn read_room(r: &mut BinaryReader) -> Result<RoomSnapshot, ProtocolError> {
    let count = r.get_u8()?;
    let players = (0..count)
        .map(|_| read_player(r))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RoomSnapshot {
        players,
        winner: r.get_string()?,
        game_started: r.get_bool()?,
        is_draw: r.get_bool()?,
    })
}

fn read_delta(r: &mut BinaryReader) -> Result<StateDelta, ProtocolError> {
    let mut delta = StateDelta::default();

    let added = r.get_u8()?;
    for _ in 0..added {
        delta.added.push(read_player(r)?);
    }

    let changed = r.get_u8()?;
    for _ in 0..changed {
        let session_id = r.get_string()?;
        let mask = r.get_u8()?;
        let position = if mask & PLAYER_POSITION != 0 {
            Some((r.get_f32()?, r.get_f32()?))
        } else {
            None
        };
        let direction = if mask & PLAYER_DIRECTION != 0 {
            Some(Direction::from_ordinal(r.get_u8()?)?)
        } else {
            None
        };
        let alive = if mask & PLAYER_ALIVE != 0 {
            Some(r.get_bool()?)
        } else {
            None
        };
        let trail_appended = if mask & PLAYER_TRAIL != 0 {
            read_numbers(r)?
        } else {
            Vec::new()
        };
        delta.changed.push(PlayerDelta {
            session_id,
            position,
            direction,
            alive,
            trail_appended,
        });
    }

    let room_mask = r.get_u8()?;
    if room_mask & ROOM_WINNER != 0 {
        delta.winner = Some(r.get_string()?);
    }
    if room_mask & ROOM_STARTED != 0 {
        delta.game_started = Some(r.get_bool()?);
    }
    if room_mask & ROOM_DRAW != 0 {
        delta.is_draw = Some(r.get_bool()?);
    }
    Ok(delta)
}
