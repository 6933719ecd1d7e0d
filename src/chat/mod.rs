//! Chat relay glue: message shapes, backend ports, rooms, and the router that
//! turns a partner's text into sign playback.

pub mod lobby;
pub mod memory;
pub mod ports;
pub mod router;
pub mod types;

pub use lobby::Lobby;
pub use memory::InMemoryRelay;
pub use ports::{ChangeFeed, MessageRepository, SessionRepository};
pub use router::{ChatRelay, IncomingMessageRouter, RouteOutcome};
pub use types::{ChatMessage, ChatSession, MessageKind, NewMessage};
