//! Backend ports for the relay.
//!
//! The hosted backend (row storage plus realtime change notifications) is
//! consumed only through these traits.

use crate::chat::types::{ChatMessage, ChatSession, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Two-seat rooms addressed by a short numeric code.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Open a room with `owner_id` in seat one and a fresh, unused room code.
    async fn create_session(&self, owner_id: &str) -> Result<ChatSession>;

    /// Join the room with `room_code`.
    ///
    /// Members rejoin their own room. Anyone else takes seat two if it is
    /// free, or gets [`RoomFull`](crate::error::RelayError::RoomFull).
    async fn join_session(&self, room_code: &str, user_id: &str) -> Result<ChatSession>;

    /// Every room `user_id` holds a seat in, newest first.
    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<ChatSession>>;

    /// Hide a room from `user_id`'s history. The other member keeps it.
    async fn delete_session_for_user(&self, session_id: &str, user_id: &str) -> Result<()>;
}

/// Persistence of chat messages.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Insert a message and return the stored row.
    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage>;

    /// All messages of a session, oldest first.
    async fn messages_for_session(&self, session_id: &str) -> Result<Vec<ChatMessage>>;
}

/// Realtime notification of inserted messages.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Subscribe to inserts for one session.
    ///
    /// The receiver closes when the feed shuts down.
    async fn subscribe(&self, session_id: &str) -> Result<mpsc::Receiver<ChatMessage>>;
}
