//! Shared protocol crate for light-duel.
//!
//! This crate contains:
//! - Binary reading/writing utilities
//! - Packet definitions for both directions
//! - The replicated room state and its diff
//! - Shared types (Color, Direction, Position)

mod binary;
mod direction;
mod error;
pub mod packets;
pub mod state;

pub use binary::{BinaryReader, BinaryWriter};
pub use direction::Direction;
pub use error::ProtocolError;

/// Opaque per-connection session identifier.
pub type SessionId = String;

/// RGB color assigned to a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS hex notation, e.g. `#FF0000`.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Represents a 2D position using glam's Vec2.
pub type Position = glam::Vec2;
