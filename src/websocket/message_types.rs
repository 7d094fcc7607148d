use crate::models::Message;
use serde::{Deserialize, Serialize};

/// Inbound WebSocket frames from client to server
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsInboundEvent {
    /// Liveness probe, answered with [`WsOutboundEvent::Pong`]
    Ping,
    /// "I am typing" notice for `receiver_id`; relayed, never persisted
    Typing { receiver_id: String },
    #[serde(other)]
    Unknown,
}

/// Outbound WebSocket frames from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutboundEvent {
    Pong,
    Typing { sender_id: String },
    NewMessage { message: Message },
    /// A newer connection for the same user took over; this one is closing
    Superseded,
}

impl WsOutboundEvent {
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
