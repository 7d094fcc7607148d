use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MESSAGE_ID_PREFIX: &str = "MSG-";

/// A persisted chat message.
///
/// Immutable once stored except for `read`, which flips when the receiver
/// acknowledges the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub receiver_id: String,
    pub receiver_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Format a sequence number as a message identifier (`MSG-000042`).
    pub fn format_id(sequence: u64) -> String {
        format!("{MESSAGE_ID_PREFIX}{sequence:06}")
    }

    /// Sequence number encoded in `message_id`, if it has the standard shape.
    pub fn sequence(&self) -> Option<u64> {
        self.message_id
            .strip_prefix(MESSAGE_ID_PREFIX)
            .and_then(|n| n.parse().ok())
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.sender_id == user_id || self.receiver_id == user_id
    }

    /// Case-insensitive match over body, sender name and receiver name.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.body.to_lowercase().contains(needle)
            || self.sender_name.to_lowercase().contains(needle)
            || self.receiver_name.to_lowercase().contains(needle)
    }
}

/// Body of `POST /chat/send`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub receiver_name: String,
    pub body: String,
}
