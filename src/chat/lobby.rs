//! Room lifecycle for one user: create, join by code, history, hide.

use crate::chat::ports::SessionRepository;
use crate::chat::types::ChatSession;
use crate::error::{RelayError, Result};
use std::sync::Arc;
use tracing::info;

/// A user's view of the rooms they sit in.
pub struct Lobby {
    sessions: Arc<dyn SessionRepository>,
    user_id: String,
}

impl Lobby {
    pub fn new(sessions: Arc<dyn SessionRepository>, user_id: impl Into<String>) -> Self {
        Self {
            sessions,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Open a new room and take seat one.
    pub async fn create_room(&self) -> Result<ChatSession> {
        let session = self.sessions.create_session(&self.user_id).await?;
        info!(session = %session.id, room = %session.room_code, "room opened");
        Ok(session)
    }

    /// Join by code; surrounding whitespace is ignored.
    pub async fn join_room(&self, room_code: &str) -> Result<ChatSession> {
        let room_code = room_code.trim();
        if room_code.is_empty() {
            return Err(RelayError::InvalidRoomCode {
                room_code: room_code.to_string(),
            });
        }
        let session = self.sessions.join_session(room_code, &self.user_id).await?;
        info!(session = %session.id, room = %session.room_code, "room joined");
        Ok(session)
    }

    /// Past conversations, newest first.
    ///
    /// Rooms nobody joined and rooms this user hid are left out.
    pub async fn history(&self) -> Result<Vec<ChatSession>> {
        let sessions = self.sessions.sessions_for_user(&self.user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.partner_of(&self.user_id).is_some())
            .filter(|s| !s.is_deleted_for(&self.user_id))
            .collect())
    }

    /// Hide a room from this user's history.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions
            .delete_session_for_user(session_id, &self.user_id)
            .await
    }
}
