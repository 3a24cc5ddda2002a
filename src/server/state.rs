//! Shared application state

use std::sync::Arc;

use crate::chat::ChatService;

/// State handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
}

impl AppState {
    pub fn new(service: ChatService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
