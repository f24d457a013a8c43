//! Light Duel game server library.

pub mod collision;
pub mod config;
pub mod lobby;
pub mod room;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use lobby::{Lobby, LobbyError, RoomSummary};
pub use room::{MatchOutcome, Room, RoomError, RoomHandle, RoomPhase, RoomUpdate};
pub use server::run;
pub use session::{drive_session, Frame};
