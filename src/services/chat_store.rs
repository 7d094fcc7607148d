//! Durable conversation store.
//!
//! Two whole-document JSON files back the store: the flat message log
//! (`chat_messages.json`) and the conversation index (`conversations.json`).
//! Every operation runs under one async mutex so each read-modify-write cycle
//! sees and leaves both documents mutually consistent.
//!
//! Query operations never fail: an unreadable document is logged and treated
//! as empty. Mutations refuse to overwrite a document they could not read, so
//! corrupt state is never clobbered. [`ChatStore::verify`] exposes the
//! underlying [`StoreError`] for callers that need to tell "empty" from
//! "unreadable".

use crate::models::{
    conversation_id, Conversation, ConversationIndex, ConversationSummary, Message, Participant,
};
use crate::storage::{JsonDocument, StoreError};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const MESSAGES_FILE: &str = "chat_messages.json";
pub const CONVERSATIONS_FILE: &str = "conversations.json";

const PREVIEW_CHARS: usize = 50;

/// Document sizes reported by [`ChatStore::verify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub messages: usize,
    pub conversations: usize,
}

/// Outcome of [`ChatStore::append_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedMessage {
    pub message: Message,
    /// Whether both documents were written
    pub persisted: bool,
}

#[derive(Debug, Default)]
struct WriterState {
    /// Highest message sequence handed out by this process
    last_sequence: u64,
}

pub struct ChatStore {
    messages: JsonDocument<Vec<Message>>,
    conversations: JsonDocument<ConversationIndex>,
    writer: Mutex<WriterState>,
}

impl ChatStore {
    /// Open the store rooted at `data_dir`, creating empty documents if they
    /// do not exist yet.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        let store = Self {
            messages: JsonDocument::new(data_dir.join(MESSAGES_FILE)),
            conversations: JsonDocument::new(data_dir.join(CONVERSATIONS_FILE)),
            writer: Mutex::new(WriterState::default()),
        };

        store.messages.ensure_exists().await?;
        store.conversations.ensure_exists().await?;

        info!(
            messages = %store.messages.path().display(),
            conversations = %store.conversations.path().display(),
            "chat store opened"
        );
        Ok(store)
    }

    /// Persist a new message from `sender` to `receiver` and update the
    /// owning conversation's preview and unread counter.
    ///
    /// Sending into a conversation acknowledges it for the sender: messages
    /// addressed to them are flagged read and their counter drops to zero.
    ///
    /// The message is returned even when persistence failed, flagged as not
    /// persisted; the failure is logged and neither document is left
    /// half-updated.
    pub async fn append_message(
        &self,
        sender: &Participant,
        receiver: &Participant,
        body: &str,
    ) -> AppendedMessage {
        let mut writer = self.writer.lock().await;

        let messages = self.load_for_write(&self.messages).await;
        let index = self.load_for_write(&self.conversations).await;

        let on_disk = messages
            .as_ref()
            .and_then(|m| m.iter().filter_map(Message::sequence).max())
            .unwrap_or(0);
        let sequence = writer.last_sequence.max(on_disk) + 1;
        writer.last_sequence = sequence;

        let message = Message {
            message_id: Message::format_id(sequence),
            conversation_id: conversation_id(&sender.id, &receiver.id),
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            receiver_id: receiver.id.clone(),
            receiver_name: receiver.name.clone(),
            body: body.to_string(),
            created_at: Utc::now(),
            read: false,
        };

        let (Some(mut messages), Some(mut index)) = (messages, index) else {
            error!(
                message_id = %message.message_id,
                "chat documents unreadable; message was not persisted"
            );
            return AppendedMessage {
                message,
                persisted: false,
            };
        };

        let previous = messages.clone();
        let acknowledged = mark_read_in(&mut messages, &message.conversation_id, &sender.id);
        messages.push(message.clone());
        apply_to_index(&mut index, &message, sender, receiver);

        let persisted = self.save_both(&messages, &index, &previous).await;
        if persisted {
            info!(
                message_id = %message.message_id,
                sender = %sender.id,
                receiver = %receiver.id,
                acknowledged,
                "message stored"
            );
        } else {
            error!(message_id = %message.message_id, "message was not persisted");
        }

        AppendedMessage { message, persisted }
    }

    /// The `limit` most recent messages between two users, oldest first.
    pub async fn history(&self, user_a: &str, user_b: &str, limit: usize) -> Vec<Message> {
        let _guard = self.writer.lock().await;
        let conv_id = conversation_id(user_a, user_b);

        let mut thread: Vec<Message> = self
            .load_or_empty(&self.messages)
            .await
            .into_iter()
            .filter(|m| m.conversation_id == conv_id)
            .collect();

        thread.sort_by_key(|m| m.created_at);
        let skip = thread.len().saturating_sub(limit);
        thread.split_off(skip)
    }

    /// Every conversation `user_id` takes part in, newest activity first.
    pub async fn conversations_for(&self, user_id: &str) -> Vec<ConversationSummary> {
        let _guard = self.writer.lock().await;

        let mut summaries: Vec<ConversationSummary> = self
            .load_or_empty(&self.conversations)
            .await
            .into_iter()
            .filter(|(_, conv)| conv.has_participant(user_id))
            .filter_map(|(id, conv)| {
                let other = conv.other_participant(user_id)?.clone();
                Some(ConversationSummary {
                    conversation_id: id,
                    other_user: other,
                    unread_count: conv.unread_for(user_id),
                    last_message: conv.last_message,
                    last_message_time: conv.last_message_time,
                })
            })
            .collect();

        summaries.sort_by(|a, b| b.last_message_time.cmp(&a.last_message_time));
        summaries
    }

    /// Mark every unread message addressed to `user_id` in the conversation
    /// as read and zero their counter. Returns how many messages flipped, or
    /// 0 when the change could not be persisted.
    pub async fn mark_read(&self, user_id: &str, conversation_id: &str) -> usize {
        let _guard = self.writer.lock().await;

        let (Some(mut messages), Some(mut index)) = (
            self.load_for_write(&self.messages).await,
            self.load_for_write(&self.conversations).await,
        ) else {
            error!(conversation_id, "chat documents unreadable; conversation not marked read");
            return 0;
        };

        let previous = messages.clone();
        let flipped = mark_read_in(&mut messages, conversation_id, user_id);
        let reset = match index.get_mut(conversation_id) {
            Some(conv) if conv.unread_for(user_id) != 0 => {
                conv.unread_count.insert(user_id.to_string(), 0);
                true
            }
            _ => false,
        };

        if flipped == 0 && !reset {
            return 0;
        }
        if !self.save_both(&messages, &index, &previous).await {
            error!(conversation_id, "read acknowledgment was not persisted");
            return 0;
        }

        debug!(user_id, conversation_id, flipped, "conversation marked read");
        flipped
    }

    /// Total unread messages addressed to `user_id` across all conversations.
    pub async fn unread_total(&self, user_id: &str) -> u64 {
        let _guard = self.writer.lock().await;
        self.load_or_empty(&self.conversations)
            .await
            .values()
            .map(|conv| conv.unread_for(user_id))
            .sum()
    }

    /// Case-insensitive search over body and participant names, restricted to
    /// messages `user_id` sent or received, newest first.
    pub async fn search(&self, user_id: &str, query: &str) -> Vec<Message> {
        let _guard = self.writer.lock().await;
        let needle = query.to_lowercase();

        let mut hits: Vec<Message> = self
            .load_or_empty(&self.messages)
            .await
            .into_iter()
            .filter(|m| m.involves(user_id) && m.matches(&needle))
            .collect();

        hits.sort_by_key(|m| m.created_at);
        hits.reverse();
        hits
    }

    /// Remove every message and the index entry for the pair. Returns whether
    /// anything existed and was deleted; a failed save leaves both documents
    /// as they were and returns `false`.
    pub async fn delete_conversation(&self, user_a: &str, user_b: &str) -> bool {
        let _guard = self.writer.lock().await;
        let conv_id = conversation_id(user_a, user_b);

        let (Some(mut messages), Some(mut index)) = (
            self.load_for_write(&self.messages).await,
            self.load_for_write(&self.conversations).await,
        ) else {
            error!(conversation_id = %conv_id, "chat documents unreadable; conversation not deleted");
            return false;
        };

        let previous = messages.clone();
        messages.retain(|m| m.conversation_id != conv_id);
        let removed_messages = previous.len() - messages.len();
        let removed_entry = index.remove(&conv_id).is_some();

        if removed_messages == 0 && !removed_entry {
            return false;
        }
        if !self.save_both(&messages, &index, &previous).await {
            error!(conversation_id = %conv_id, "conversation delete was not persisted");
            return false;
        }

        info!(conversation_id = %conv_id, removed_messages, "conversation deleted");
        true
    }

    /// Read both documents, surfacing corruption instead of masking it.
    pub async fn verify(&self) -> Result<StoreStats, StoreError> {
        let _guard = self.writer.lock().await;
        let messages = self.messages.load().await?;
        let conversations = self.conversations.load().await?;
        Ok(StoreStats {
            messages: messages.len(),
            conversations: conversations.len(),
        })
    }

    /// Save the message log, then the index. If the index cannot be saved
    /// the log is restored to `previous` so the two documents stay in step.
    async fn save_both(
        &self,
        messages: &Vec<Message>,
        index: &ConversationIndex,
        previous: &Vec<Message>,
    ) -> bool {
        if let Err(e) = self.messages.save(messages).await {
            error!(error = %e, "failed to save messages");
            return false;
        }

        if let Err(e) = self.conversations.save(index).await {
            error!(error = %e, "failed to save conversations; rolling back message log");
            if let Err(e) = self.messages.save(previous).await {
                error!(error = %e, "rollback of message log failed");
            }
            return false;
        }

        true
    }

    async fn load_or_empty<T>(&self, doc: &JsonDocument<T>) -> T
    where
        T: Serialize + serde::de::DeserializeOwned + Default,
    {
        match doc.load().await {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "failed to load chat document; treating as empty");
                T::default()
            }
        }
    }

    async fn load_for_write<T>(&self, doc: &JsonDocument<T>) -> Option<T>
    where
        T: Serialize + serde::de::DeserializeOwned + Default,
    {
        match doc.load().await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "refusing to rewrite unreadable chat document");
                None
            }
        }
    }
}

fn mark_read_in(messages: &mut [Message], conversation_id: &str, user_id: &str) -> usize {
    let mut flipped = 0;
    for msg in messages
        .iter_mut()
        .filter(|m| m.conversation_id == conversation_id && m.receiver_id == user_id && !m.read)
    {
        msg.read = true;
        flipped += 1;
    }
    flipped
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}

fn apply_to_index(
    index: &mut ConversationIndex,
    message: &Message,
    sender: &Participant,
    receiver: &Participant,
) {
    let conv = index
        .entry(message.conversation_id.clone())
        .or_insert_with(|| Conversation {
            participants: vec![sender.clone(), receiver.clone()],
            last_message: String::new(),
            last_message_time: message.created_at,
            unread_count: HashMap::from([(sender.id.clone(), 0)]),
        });

    conv.last_message = preview(&message.body);
    conv.last_message_time = message.created_at;
    conv.unread_count.insert(sender.id.clone(), 0);
    *conv.unread_count.entry(receiver.id.clone()).or_insert(0) += 1;
}
