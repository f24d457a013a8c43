//! Travel direction and its key mapping.

use crate::ProtocolError;
use glam::Vec2;

/// Direction of travel. The discriminant is the ordinal replicated to clients.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// Map a client key name (`ArrowUp`, ...) to a direction.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(Direction::Up),
            "ArrowRight" => Some(Direction::Right),
            "ArrowDown" => Some(Direction::Down),
            "ArrowLeft" => Some(Direction::Left),
            _ => None,
        }
    }

    #[inline]
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Result<Self, ProtocolError> {
        match ordinal {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            other => Err(ProtocolError::InvalidDirection(other)),
        }
    }

    /// True when `other` points the exact opposite way (ordinal difference of 2).
    #[inline]
    pub fn is_reverse_of(self, other: Direction) -> bool {
        self.ordinal().abs_diff(other.ordinal()) == 2
    }

    /// Unit step in screen coordinates (y grows downwards).
    pub fn unit(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
        }
    }
}
