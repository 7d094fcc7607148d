pub mod conversation;
pub mod message;

pub use conversation::{conversation_id, Conversation, ConversationIndex, ConversationSummary, Participant};
pub use message::{Message, SendMessageRequest};
