//! Store-and-forward chat relay.
//!
//! Every send is persisted first and then pushed to the receiver if they are
//! online. The push is best effort and never retried: an offline receiver
//! finds the message through history or the conversation list.

use crate::error::{AppError, AppResult};
use crate::models::{Message, Participant, SendMessageRequest};
use crate::services::auth::{AuthUser, TokenResolver};
use crate::services::chat_store::ChatStore;
use crate::websocket::message_types::WsOutboundEvent;
use crate::websocket::PresenceRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Result of a send: the stored message and whether it reached the
/// receiver in real time.
#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub message: Message,
    pub delivered_realtime: bool,
}

#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<ChatStore>,
    registry: PresenceRegistry,
    resolver: Arc<dyn TokenResolver>,
}

impl ChatRelay {
    pub fn new(
        store: Arc<ChatStore>,
        registry: PresenceRegistry,
        resolver: Arc<dyn TokenResolver>,
    ) -> Self {
        Self {
            store,
            registry,
            resolver,
        }
    }

    /// Resolve a bearer token to the calling user.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        self.resolver
            .resolve(token)
            .await
            .ok_or(AppError::Unauthorized)
    }

    /// Authenticate the caller, then deliver their message.
    pub async fn send(&self, token: &str, request: SendMessageRequest) -> AppResult<Delivery> {
        let sender = self.authenticate(token).await?;
        self.send_as(&sender, request).await
    }

    /// Persist a message from an already authenticated sender and try to
    /// push it to the receiver. A message that could not be stored is not
    /// pushed and the send fails with [`AppError::Storage`].
    pub async fn send_as(&self, sender: &AuthUser, request: SendMessageRequest) -> AppResult<Delivery> {
        let receiver_id = request.receiver_id.trim();
        if receiver_id.is_empty() {
            return Err(AppError::BadRequest("receiver_id is required".into()));
        }
        if receiver_id == sender.identity {
            return Err(AppError::BadRequest("cannot send a message to yourself".into()));
        }
        if request.body.trim().is_empty() {
            return Err(AppError::BadRequest("message body is empty".into()));
        }

        let from = Participant::new(&sender.identity, &sender.display_name);
        let to = Participant::new(receiver_id, request.receiver_name.trim());

        let appended = self.store.append_message(&from, &to, &request.body).await;
        if !appended.persisted {
            // nothing to push that history could later return
            return Err(AppError::Storage(format!(
                "message {} could not be stored",
                appended.message.message_id
            )));
        }
        let message = appended.message;

        let event = WsOutboundEvent::NewMessage {
            message: message.clone(),
        };
        let delivered_realtime = self.registry.push(&to.id, &event).await;

        tracing::info!(
            message_id = %message.message_id,
            sender = %from.id,
            receiver = %to.id,
            delivered_realtime,
            "chat message relayed"
        );

        Ok(Delivery {
            message,
            delivered_realtime,
        })
    }

    /// Forward a typing notice to `receiver_id` if they are online.
    /// Dropped silently otherwise.
    pub async fn notify_typing(&self, sender_id: &str, receiver_id: &str) -> bool {
        let event = WsOutboundEvent::Typing {
            sender_id: sender_id.to_string(),
        };
        self.registry.push(receiver_id, &event).await
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }
}
