//! Packet definitions for the light-duel protocol.
//!
//! This module contains both client->server and server->client packet types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Opcodes for client -> server packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    /// Join a room for the given matchmaking mode.
    Join = 0x00,
    /// Directional intent (`keypress` with a key name).
    Keypress = 0x10,
}

/// Opcodes for server -> client packets.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerOpcode {
    /// Session id assigned to this connection.
    Joined = 0x01,
    /// Complete room state.
    FullState = 0x10,
    /// Changes since the previous publish.
    StateDelta = 0x11,
    /// Second player joined; the countdown is running.
    GameReady = 0x20,
    /// Room disposed; the connection will be closed.
    RoomClosed = 0x30,
}
