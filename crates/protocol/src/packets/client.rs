//! Client -> Server packets.

use super::ClientOpcode;
use crate::{BinaryReader, BinaryWriter, ProtocolError};

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    /// Join (0x00) with the matchmaking tag. An empty mode is a valid tag.
    Join { mode: String },
    /// Keypress (0x10). The key is kept raw; unknown keys are dropped by the room.
    Keypress { key: String },
}

impl ClientPacket {
    /// Parse a client packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Err(ProtocolError::EmptyPacket);
        }

        let mut reader = BinaryReader::new(data.to_vec());
        let opcode = reader.get_u8()?;

        match opcode {
            0x00 => Ok(ClientPacket::Join {
                mode: reader.get_string()?,
            }),
            0x10 => Ok(ClientPacket::Keypress {
                key: reader.get_string()?,
            }),
            _ => Err(ProtocolError::InvalidOpcode(opcode)),
        }
    }

    /// Encode this packet for sending.
    pub fn encode(&self) -> BinaryWriter {
        let mut w = BinaryWriter::new();
        match self {
            ClientPacket::Join { mode } => {
                w.put_u8(ClientOpcode::Join as u8);
                w.put_string(mode);
            }
            ClientPacket::Keypress { key } => {
                w.put_u8(ClientOpcode::Keypress as u8);
                w.put_string(key);
            }
        }
        w
    }
}
