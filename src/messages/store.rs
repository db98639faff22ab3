use super::types::Message;
use std::sync::Arc;
use tokio::sync::watch;

/// Single-slot broadcast of the most recent message.
///
/// Each publish replaces the slot; subscribers see only "latest" and the
/// surrounding collaborator is responsible for appending to its own rendered
/// history. No backpressure: with nobody subscribed a publish is simply
/// dropped.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    tx: Arc<watch::Sender<Option<Message>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the latest message
    pub fn publish(&self, message: Message) {
        self.tx.send_replace(Some(message));
    }

    /// Subscribe to latest-message updates
    pub fn subscribe(&self) -> watch::Receiver<Option<Message>> {
        self.tx.subscribe()
    }

    /// Peek at the latest message without subscribing
    pub fn latest(&self) -> Option<Message> {
        self.tx.borrow().clone()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
