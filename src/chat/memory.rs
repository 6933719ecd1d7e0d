//! In-process relay backend for the demo host and tests.

use crate::chat::ports::{ChangeFeed, MessageRepository, SessionRepository};
use crate::chat::types::{ChatMessage, ChatSession, NewMessage};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Buffered inserts per subscriber; a full subscriber misses later inserts.
const SUBSCRIBER_BUFFER: usize = 64;

/// Six-digit room codes.
const ROOM_CODES: std::ops::Range<u32> = 100_000..1_000_000;

#[derive(Default)]
struct State {
    messages: Vec<ChatMessage>,
    sessions: Vec<ChatSession>,
    subscribers: Vec<(String, mpsc::Sender<ChatMessage>)>,
    next_id: u64,
    next_session_id: u64,
    closed: bool,
}

impl State {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(RelayError::Repository {
                message: "relay is closed".to_string(),
            });
        }
        Ok(())
    }

    fn unused_room_code(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let code = rng.random_range(ROOM_CODES).to_string();
            if !self.sessions.iter().any(|s| s.room_code == code) {
                return code;
            }
        }
    }

    fn session_for_member(&mut self, session_id: &str, user_id: &str) -> Result<&mut ChatSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id && s.is_member(user_id))
            .ok_or_else(|| RelayError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }
}

/// Message store and change feed backed by memory.
#[derive(Clone, Default)]
pub struct InMemoryRelay {
    state: Arc<Mutex<State>>,
}

impl InMemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops all subscribers, closing their receivers. Later inserts fail.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.subscribers.clear();
    }
}

#[async_trait]
impl MessageRepository for InMemoryRelay {
    async fn insert_message(&self, message: NewMessage) -> Result<ChatMessage> {
        let (stored, listeners) = {
            let mut state = self.lock();
            state.ensure_open()?;
            state.next_id += 1;
            let stored = ChatMessage {
                id: format!("msg-{}", state.next_id),
                session_id: message.session_id,
                sender_id: message.sender_id,
                content: message.content,
                kind: message.kind,
                created_at: Utc::now(),
            };
            state.messages.push(stored.clone());
            state.subscribers.retain(|(_, tx)| !tx.is_closed());
            let listeners: Vec<_> = state
                .subscribers
                .iter()
                .filter(|(session, _)| *session == stored.session_id)
                .map(|(_, tx)| tx.clone())
                .collect();
            (stored, listeners)
        };

        for tx in listeners {
            match tx.try_send(stored.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session = %stored.session_id,
                        id = %stored.id,
                        "feed subscriber is full, dropping insert"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(session = %stored.session_id, "feed subscriber went away");
                }
            }
        }

        Ok(stored)
    }

    async fn messages_for_session(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let mut messages: Vec<ChatMessage> = self
            .lock()
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRelay {
    async fn create_session(&self, owner_id: &str) -> Result<ChatSession> {
        let mut state = self.lock();
        state.ensure_open()?;
        state.next_session_id += 1;
        let session = ChatSession {
            id: format!("session-{}", state.next_session_id),
            owner_id: owner_id.to_string(),
            guest_id: None,
            owner_deleted: false,
            guest_deleted: false,
            room_code: state.unused_room_code(),
            created_at: Utc::now(),
        };
        state.sessions.push(session.clone());
        debug!(session = %session.id, room = %session.room_code, "room created");
        Ok(session)
    }

    async fn join_session(&self, room_code: &str, user_id: &str) -> Result<ChatSession> {
        if room_code.trim().is_empty() {
            return Err(RelayError::InvalidRoomCode {
                room_code: room_code.to_string(),
            });
        }

        let mut state = self.lock();
        state.ensure_open()?;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.room_code == room_code)
            .ok_or_else(|| RelayError::RoomNotFound {
                room_code: room_code.to_string(),
            })?;

        if session.is_member(user_id) {
            debug!(session = %session.id, user = user_id, "rejoined room");
            return Ok(session.clone());
        }
        if session.guest_id.is_some() {
            return Err(RelayError::RoomFull {
                room_code: room_code.to_string(),
            });
        }
        session.guest_id = Some(user_id.to_string());
        debug!(session = %session.id, user = user_id, "joined room");
        Ok(session.clone())
    }

    async fn sessions_for_user(&self, user_id: &str) -> Result<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> = self
            .lock()
            .sessions
            .iter()
            .filter(|s| s.is_member(user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete_session_for_user(&self, session_id: &str, user_id: &str) -> Result<()> {
        let mut state = self.lock();
        let session = state.session_for_member(session_id, user_id)?;
        if session.owner_id == user_id {
            session.owner_deleted = true;
        } else {
            session.guest_deleted = true;
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for InMemoryRelay {
    async fn subscribe(&self, session_id: &str) -> Result<mpsc::Receiver<ChatMessage>> {
        let mut state = self.lock();
        if state.closed {
            return Err(RelayError::Feed {
                message: "relay is closed".to_string(),
            });
        }
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        state.subscribers.push((session_id.to_string(), tx));
        debug!(session = session_id, "feed subscriber added");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::types::MessageKind;

    fn new_message(session: &str, sender: &str, content: &str) -> NewMessage {
        NewMessage {
            session_id: session.to_string(),
            sender_id: sender.to_string(),
            content: content.to_string(),
            kind: MessageKind::TextToSign,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_lists_by_session() {
        let relay = InMemoryRelay::new();
        let first = relay
            .insert_message(new_message("room-1", "alice", "hi"))
            .await
            .unwrap();
        relay
            .insert_message(new_message("room-2", "bob", "elsewhere"))
            .await
            .unwrap();
        let third = relay
            .insert_message(new_message("room-1", "bob", "hello"))
            .await
            .unwrap();

        assert_ne!(first.id, third.id);

        let history = relay.messages_for_session("room-1").await.unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "hello"]);
    }

    #[tokio::test]
    async fn subscribers_only_see_their_session() {
        let relay = InMemoryRelay::new();
        let mut room_one = relay.subscribe("room-1").await.unwrap();

        relay
            .insert_message(new_message("room-2", "bob", "not for you"))
            .await
            .unwrap();
        relay
            .insert_message(new_message("room-1", "bob", "for you"))
            .await
            .unwrap();

        let received = room_one.recv().await.unwrap();
        assert_eq!(received.content, "for you");
        assert!(room_one.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_block_inserts() {
        let relay = InMemoryRelay::new();
        let rx = relay.subscribe("room-1").await.unwrap();
        drop(rx);

        let stored = relay
            .insert_message(new_message("room-1", "bob", "still stored"))
            .await;
        assert!(stored.is_ok());
    }

    #[tokio::test]
    async fn stalled_subscriber_does_not_block_inserts() {
        let relay = InMemoryRelay::new();
        let mut stalled = relay.subscribe("room-1").await.unwrap();

        let inserts = async {
            for n in 0..SUBSCRIBER_BUFFER + 10 {
                relay
                    .insert_message(new_message("room-1", "bob", &format!("m{n}")))
                    .await
                    .unwrap();
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), inserts)
            .await
            .expect("inserts must not wait on a full subscriber");

        let history = relay.messages_for_session("room-1").await.unwrap();
        assert_eq!(history.len(), SUBSCRIBER_BUFFER + 10);

        // The buffer holds the oldest inserts; the overflow is dropped
        let first = stalled.recv().await.unwrap();
        assert_eq!(first.content, "m0");
        let mut delivered = 1;
        while stalled.try_recv().is_ok() {
            delivered += 1;
        }
        assert_eq!(delivered, SUBSCRIBER_BUFFER);
    }

    #[tokio::test]
    async fn created_rooms_get_distinct_six_digit_codes() {
        let relay = InMemoryRelay::new();
        let mut codes = Vec::new();
        for _ in 0..50 {
            let session = relay.create_session("alice").await.unwrap();
            assert_eq!(session.owner_id, "alice");
            assert_eq!(session.guest_id, None);
            assert_eq!(session.room_code.len(), 6);
            assert!(session.room_code.chars().all(|c| c.is_ascii_digit()));
            codes.push(session.room_code);
        }
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), 50);
    }

    #[tokio::test]
    async fn join_takes_the_free_seat_then_fills() {
        let relay = InMemoryRelay::new();
        let room = relay.create_session("alice").await.unwrap();

        let joined = relay.join_session(&room.room_code, "bob").await.unwrap();
        assert_eq!(joined.id, room.id);
        assert_eq!(joined.guest_id.as_deref(), Some("bob"));

        let full = relay.join_session(&room.room_code, "carol").await;
        assert!(matches!(full, Err(RelayError::RoomFull { .. })));

        // Members rejoin without changing seats
        let again = relay.join_session(&room.room_code, "alice").await.unwrap();
        assert_eq!(again, joined);
        let again = relay.join_session(&room.room_code, "bob").await.unwrap();
        assert_eq!(again, joined);
    }

    #[tokio::test]
    async fn join_rejects_blank_and_unknown_codes() {
        let relay = InMemoryRelay::new();
        relay.create_session("alice").await.unwrap();

        assert!(matches!(
            relay.join_session("  ", "bob").await,
            Err(RelayError::InvalidRoomCode { .. })
        ));
        assert!(matches!(
            relay.join_session("000000", "bob").await,
            Err(RelayError::RoomNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn sessions_for_user_lists_both_seats() {
        let relay = InMemoryRelay::new();
        let own = relay.create_session("alice").await.unwrap();
        let theirs = relay.create_session("bob").await.unwrap();
        relay.join_session(&theirs.room_code, "alice").await.unwrap();
        relay.create_session("carol").await.unwrap();

        let listed = relay.sessions_for_user("alice").await.unwrap();
        let mut ids: Vec<_> = listed.iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        let mut expected = vec![own.id.as_str(), theirs.id.as_str()];
        expected.sort();
        assert_eq!(ids, expected);
        assert!(
            listed
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at)
        );
    }

    #[tokio::test]
    async fn delete_hides_room_for_one_member_only() {
        let relay = InMemoryRelay::new();
        let room = relay.create_session("alice").await.unwrap();
        relay.join_session(&room.room_code, "bob").await.unwrap();

        relay.delete_session_for_user(&room.id, "bob").await.unwrap();

        let bobs = relay.sessions_for_user("bob").await.unwrap();
        assert!(bobs[0].is_deleted_for("bob"));
        let alices = relay.sessions_for_user("alice").await.unwrap();
        assert!(!alices[0].is_deleted_for("alice"));

        let outsider = relay.delete_session_for_user(&room.id, "carol").await;
        assert!(matches!(outsider, Err(RelayError::SessionNotFound { .. })));
    }

    #[tokio::test]
    async fn close_ends_feeds_and_rejects_inserts() {
        let relay = InMemoryRelay::new();
        let mut rx = relay.subscribe("room-1").await.unwrap();
        relay.close();

        assert!(rx.recv().await.is_none());
        assert!(relay.subscribe("room-1").await.is_err());
        assert!(
            relay
                .insert_message(new_message("room-1", "bob", "late"))
                .await
                .is_err()
        );
    }
}
