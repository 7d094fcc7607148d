pub mod auth;
pub mod chat_store;
pub mod relay;

pub use auth::{AuthUser, JwtUserDirectory, TokenResolver};
pub use chat_store::{AppendedMessage, ChatStore, StoreStats};
pub use relay::{ChatRelay, Delivery};
