//! Realtime transcription session: connection management (C4) and event
//! routing (C5).

pub mod connection;
pub mod events;
pub mod messages;

pub use connection::{CloseReason, ConnectionManager, RealtimeError};
pub use events::RealtimeEvent;
pub use messages::TranscriptionModel;
