//! Wire shapes of relay messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a message asks the receiving side to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Speech-side text to be fingerspelled for the signing partner.
    TextToSign,
    /// Sign-side text to be spoken for the hearing partner.
    TextToSpeech,
    /// Recorded signing (reserved).
    SignVideo,
    /// Recorded speech (reserved).
    SpeechAudio,
}

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub sender_id: String,
    #[serde(rename = "message_content")]
    pub content: String,
    #[serde(rename = "message_type")]
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

/// A message about to be inserted; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub session_id: String,
    pub sender_id: String,
    #[serde(rename = "message_content")]
    pub content: String,
    #[serde(rename = "message_type")]
    pub kind: MessageKind,
}

/// A two-seat chat room. The creator holds seat one; the first other user
/// to join by room code takes seat two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    #[serde(rename = "user_1_id")]
    pub owner_id: String,
    #[serde(rename = "user_2_id")]
    pub guest_id: Option<String>,
    #[serde(rename = "user_1_deleted", default)]
    pub owner_deleted: bool,
    #[serde(rename = "user_2_deleted", default)]
    pub guest_deleted: bool,
    pub room_code: String,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.owner_id == user_id || self.guest_id.as_deref() == Some(user_id)
    }

    /// The other seat, if `user_id` holds one and the other is taken.
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if self.owner_id == user_id {
            self.guest_id.as_deref()
        } else if self.guest_id.as_deref() == Some(user_id) {
            Some(&self.owner_id)
        } else {
            None
        }
    }

    /// Whether `user_id` removed this room from their own history.
    pub fn is_deleted_for(&self, user_id: &str) -> bool {
        if self.owner_id == user_id {
            self.owner_deleted
        } else if self.guest_id.as_deref() == Some(user_id) {
            self.guest_deleted
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(guest: Option<&str>) -> ChatSession {
        ChatSession {
            id: "s-1".to_string(),
            owner_id: "alice".to_string(),
            guest_id: guest.map(str::to_string),
            owner_deleted: false,
            guest_deleted: true,
            room_code: "123456".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn kind_uses_screaming_snake_case() {
        let json = serde_json::to_string(&MessageKind::TextToSign).unwrap();
        assert_eq!(json, "\"TEXT_TO_SIGN\"");

        let kind: MessageKind = serde_json::from_str("\"SPEECH_AUDIO\"").unwrap();
        assert_eq!(kind, MessageKind::SpeechAudio);
    }

    #[test]
    fn message_parses_backend_row() {
        let row = r#"{
            "id": "m-1",
            "session_id": "room-9",
            "sender_id": "u-2",
            "message_content": "hello there",
            "message_type": "TEXT_TO_SIGN",
            "created_at": "2025-03-01T12:00:00Z"
        }"#;

        let message: ChatMessage = serde_json::from_str(row).unwrap();
        assert_eq!(message.session_id, "room-9");
        assert_eq!(message.content, "hello there");
        assert_eq!(message.kind, MessageKind::TextToSign);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let result = serde_json::from_str::<MessageKind>("\"SMOKE_SIGNAL\"");
        assert!(result.is_err());
    }

    #[test]
    fn session_seats() {
        let open = room(None);
        assert!(open.is_member("alice"));
        assert!(!open.is_member("bob"));
        assert_eq!(open.partner_of("alice"), None);

        let full = room(Some("bob"));
        assert_eq!(full.partner_of("alice"), Some("bob"));
        assert_eq!(full.partner_of("bob"), Some("alice"));
        assert_eq!(full.partner_of("carol"), None);
        assert!(!full.is_deleted_for("alice"));
        assert!(full.is_deleted_for("bob"));
        assert!(!full.is_deleted_for("carol"));
    }

    #[test]
    fn session_parses_backend_row() {
        let row = r#"{
            "id": "s-9",
            "user_1_id": "u-1",
            "user_2_id": null,
            "room_code": "482913",
            "created_at": "2025-03-01T12:00:00Z"
        }"#;

        let session: ChatSession = serde_json::from_str(row).unwrap();
        assert_eq!(session.owner_id, "u-1");
        assert_eq!(session.guest_id, None);
        assert!(!session.owner_deleted);
        assert_eq!(session.room_code, "482913");
    }
}
