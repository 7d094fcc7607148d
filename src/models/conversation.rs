use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const CONVERSATION_ID_SEPARATOR: &str = "___";

/// Conversation index document, keyed by conversation id.
pub type ConversationIndex = BTreeMap<String, Conversation>;

/// Order-independent identifier for the conversation between two users.
pub fn conversation_id(a: &str, b: &str) -> String {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    format!("{first}{CONVERSATION_ID_SEPARATOR}{second}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Denormalized per-pair state kept alongside the message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub participants: Vec<Participant>,
    /// Preview of the most recent message, truncated to 50 characters
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    /// participant id -> messages addressed to them and not yet read
    #[serde(default)]
    pub unread_count: HashMap<String, u64>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    /// The participant that is not `user_id`. A self-conversation returns the
    /// user themselves.
    pub fn other_participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.id != user_id)
            .or_else(|| self.participants.iter().find(|p| p.id == user_id))
    }

    pub fn unread_for(&self, user_id: &str) -> u64 {
        self.unread_count.get(user_id).copied().unwrap_or(0)
    }
}

/// A conversation as seen by one of its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub other_user: Participant,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: u64,
}
