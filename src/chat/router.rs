//! Routes realtime chat inserts into sentence playback.

use crate::chat::ports::{ChangeFeed, MessageRepository};
use crate::chat::types::{ChatMessage, MessageKind, NewMessage};
use crate::error::Result;
use crate::playback::PlaybackEngine;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// What the router did with one incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Handed to the playback engine.
    Played,
    /// Belongs to a different session.
    OtherSession,
    /// Echo of a message this side sent.
    OwnMessage,
    /// Valid message whose kind does not trigger playback.
    Ignored(MessageKind),
}

/// Feeds partner `TEXT_TO_SIGN` messages of the current session to the
/// playback engine.
pub struct IncomingMessageRouter {
    engine: PlaybackEngine,
    session_id: String,
    user_id: String,
}

impl IncomingMessageRouter {
    pub fn new(
        engine: PlaybackEngine,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            session_id: session_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn route(&self, message: &ChatMessage) -> RouteOutcome {
        if message.session_id != self.session_id {
            return RouteOutcome::OtherSession;
        }
        if message.sender_id == self.user_id {
            return RouteOutcome::OwnMessage;
        }

        match message.kind {
            MessageKind::TextToSign => {
                info!(id = %message.id, "partner text received for signing");
                self.engine.play_sentence(&message.content);
                RouteOutcome::Played
            }
            other => {
                debug!(id = %message.id, kind = ?other, "message kind does not trigger playback");
                RouteOutcome::Ignored(other)
            }
        }
    }

    /// Routes messages until the feed closes or `token` is cancelled.
    pub async fn run(self, mut feed: mpsc::Receiver<ChatMessage>, token: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = feed.recv() => match next {
                    Some(message) => {
                        let outcome = self.route(&message);
                        debug!(id = %message.id, ?outcome, "routed message");
                    }
                    None => {
                        debug!(session = %self.session_id, "change feed closed");
                        break;
                    }
                },
            }
        }
    }

    /// Subscribes to `feed` for this router's session and runs until done.
    pub async fn subscribe_and_run(
        self,
        feed: &dyn ChangeFeed,
        token: CancellationToken,
    ) -> Result<()> {
        let receiver = feed.subscribe(&self.session_id).await?;
        self.run(receiver, token).await;
        Ok(())
    }
}

/// Outgoing side: posts local input into the current session.
pub struct ChatRelay {
    repository: Arc<dyn MessageRepository>,
    session_id: String,
    user_id: String,
}

impl ChatRelay {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            session_id: session_id.into(),
            user_id: user_id.into(),
        }
    }

    /// Sends trimmed `content`. Blank input is dropped and yields `None`.
    pub async fn send(&self, kind: MessageKind, content: &str) -> Result<Option<ChatMessage>> {
        let content = content.trim();
        if content.is_empty() {
            debug!("not sending blank message");
            return Ok(None);
        }

        let stored = self
            .repository
            .insert_message(NewMessage {
                session_id: self.session_id.clone(),
                sender_id: self.user_id.clone(),
                content: content.to_string(),
                kind,
            })
            .await?;
        info!(id = %stored.id, kind = ?kind, "message sent");
        Ok(Some(stored))
    }

    /// Session history, oldest first.
    pub async fn history(&self) -> Result<Vec<ChatMessage>> {
        self.repository.messages_for_session(&self.session_id).await
    }
}
