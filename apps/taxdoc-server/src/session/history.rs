//! Conversation histories
//!
//! One rolling history per conversation key. Each history sits behind its
//! own async mutex so that a chat can hold it across the model call; the
//! outer map lock is only taken for lookups and never across an await.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

/// Key of the conversation that is not tied to any documents
pub const GENERAL_CHAT_KEY: &str = "general-tax-chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One remembered message
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Ordered turns of one conversation
#[derive(Debug, Default)]
pub struct History {
    turns: Vec<Turn>,
}

impl History {
    /// Record a user message together with its reply
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        let at = Utc::now();
        self.turns.push(Turn {
            role: TurnRole::User,
            content: user.into(),
            at,
        });
        self.turns.push(Turn {
            role: TurnRole::Assistant,
            content: assistant.into(),
            at: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `max` turns
    pub fn window(&self, max: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(max);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Shared handle to one conversation
pub type HistoryHandle = Arc<AsyncMutex<History>>;

/// All conversation histories of the process
#[derive(Clone, Default)]
pub struct ConversationStore {
    histories: Arc<Mutex<HashMap<String, HistoryHandle>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a key, creating an empty history on first use
    pub fn handle(&self, key: &str) -> HistoryHandle {
        let mut histories = self.histories.lock();
        Arc::clone(histories.entry(key.to_string()).or_default())
    }

    fn existing(&self, key: &str) -> Option<HistoryHandle> {
        self.histories.lock().get(key).cloned()
    }

    /// Copy of a conversation's turns (empty for unknown keys)
    pub async fn snapshot(&self, key: &str) -> Vec<Turn> {
        match self.existing(key) {
            Some(handle) => handle.lock().await.turns().to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of turns without creating the history
    pub async fn turn_count(&self, key: &str) -> usize {
        match self.existing(key) {
            Some(handle) => handle.lock().await.len(),
            None => 0,
        }
    }

    /// Return one conversation to the empty state.
    ///
    /// The entry is dropped rather than cleared in place, so a chat still
    /// holding the old handle cannot leak turns into the next conversation.
    pub fn clear(&self, key: &str) {
        self.histories.lock().remove(key);
    }

    /// Drop every conversation
    pub fn clear_all(&self) {
        self.histories.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_created_lazily() {
        let store = ConversationStore::new();
        assert_eq!(store.turn_count("Jane Doe").await, 0);
        assert!(store.histories.lock().is_empty());

        store.handle("Jane Doe").lock().await.push_exchange("hi", "hello");
        assert_eq!(store.turn_count("Jane Doe").await, 2);
        assert!(store.histories.lock().contains_key("Jane Doe"));
    }

    #[tokio::test]
    async fn test_turn_order() {
        let store = ConversationStore::new();
        let handle = store.handle("k");
        {
            let mut history = handle.lock().await;
            history.push_exchange("q1", "a1");
            history.push_exchange("q2", "a2");
        }

        let turns = store.snapshot("k").await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
        assert_eq!(turns[0].role, TurnRole::User);
        assert_eq!(turns[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn test_window_keeps_latest() {
        let mut history = History::default();
        history.push_exchange("q1", "a1");
        history.push_exchange("q2", "a2");

        let window = history.window(3);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].content, "a1");
        assert_eq!(history.window(10).len(), 4);
        assert!(history.window(0).is_empty());
    }

    #[tokio::test]
    async fn test_clear_detaches_old_handle() {
        let store = ConversationStore::new();
        let old = store.handle("Jane Doe");
        store.clear_all();

        old.lock().await.push_exchange("late", "reply");
        assert_eq!(store.turn_count("Jane Doe").await, 0);

        store.handle("John Roe").lock().await.push_exchange("q", "a");
        store.handle(GENERAL_CHAT_KEY).lock().await.push_exchange("q", "a");
        store.clear("John Roe");
        assert_eq!(store.turn_count("John Roe").await, 0);
        assert_eq!(store.turn_count(GENERAL_CHAT_KEY).await, 2);
    }
}
