use crate::{
    config::Config,
    services::{ChatRelay, ChatStore, TokenResolver},
    websocket::PresenceRegistry,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ChatStore>,
    pub registry: PresenceRegistry,
    pub relay: ChatRelay,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: ChatStore, resolver: Arc<dyn TokenResolver>, config: Config) -> Self {
        let store = Arc::new(store);
        let registry = PresenceRegistry::new();
        let relay = ChatRelay::new(store.clone(), registry.clone(), resolver);

        Self {
            store,
            registry,
            relay,
            config: Arc::new(config),
        }
    }
}
