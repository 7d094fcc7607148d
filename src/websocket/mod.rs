use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod message_types;

use message_types::WsOutboundEvent;

/// Unique identifier for one WebSocket connection
///
/// Deregistration is keyed by this ID so that a stale connection closing
/// late can never remove the entry of the connection that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Live connection entry: ID plus the outbound frame channel
struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// Presence registry: which users currently have a reachable connection.
///
/// At most one connection per user. Process-local and never persisted, so it
/// starts empty on every boot and "online" is only ever as good as uptime.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    // user_id -> active connection
    inner: Arc<RwLock<HashMap<String, Connection>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`.
    ///
    /// Returns the connection ID and the receiver of frames pushed to this
    /// user. A previous connection for the same user is evicted: it gets a
    /// `superseded` frame and its channel is closed.
    pub async fn register(&self, user_id: &str) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        let previous = guard.insert(user_id.to_string(), Connection { id, sender: tx });
        let online = guard.len();
        drop(guard);

        if let Some(previous) = previous {
            if let Ok(frame) = WsOutboundEvent::Superseded.to_frame() {
                let _ = previous.sender.send(frame);
            }
            tracing::info!(
                user_id,
                evicted = ?previous.id,
                "connection superseded by newer login"
            );
        }

        tracing::info!(user_id, connection = ?id, online, "user connected");
        (id, rx)
    }

    /// Remove `user_id`'s entry if it still belongs to `connection`.
    /// Returns whether an entry was removed.
    pub async fn deregister(&self, user_id: &str, connection: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        let owned = guard.get(user_id).is_some_and(|c| c.id == connection);
        if owned {
            guard.remove(user_id);
            tracing::info!(user_id, connection = ?connection, online = guard.len(), "user disconnected");
        }
        owned
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.inner.read().await.contains_key(user_id)
    }

    /// Online user IDs, sorted.
    pub async fn list_online(&self) -> Vec<String> {
        let mut users: Vec<String> = self.inner.read().await.keys().cloned().collect();
        users.sort();
        users
    }

    /// Try to deliver `event` to `user_id` without blocking.
    ///
    /// Returns `false` when the user is offline or the send fails; a failed
    /// send also removes the dead entry. Never retries.
    pub async fn push(&self, user_id: &str, event: &WsOutboundEvent) -> bool {
        let frame = match event.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, user_id, "failed to encode outbound frame");
                return false;
            }
        };

        let failed = {
            let guard = self.inner.read().await;
            match guard.get(user_id) {
                None => {
                    tracing::debug!(user_id, "user offline; push skipped");
                    return false;
                }
                Some(conn) => match conn.sender.send(frame) {
                    Ok(()) => return true,
                    Err(_) => conn.id,
                },
            }
        };

        tracing::warn!(user_id, "push failed; dropping dead connection");
        self.deregister(user_id, failed).await;
        false
    }

    /// Number of online users (for logging/health)
    pub async fn online_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
