//! Session Module
//!
//! Process-wide state of the service: the recipient cache, the documents
//! of the last committed upload batch and every conversation history.
//!
//! ## Consistency
//!
//! A batch is committed in one critical section under the write lock, so
//! readers observe either the previous session or the new one, never a
//! half-populated cache. Committing a batch also drops every conversation
//! history.
//!
//! Every commit bumps a generation number. A batch that fails clears the
//! session only when no other batch committed after it started.

mod cache;
mod history;

pub use cache::RecipientCache;
pub use history::{ConversationStore, History, HistoryHandle, Turn, TurnRole, GENERAL_CHAT_KEY};

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::document::TaxDocument;

#[derive(Debug, Default)]
struct SessionState {
    cache: RecipientCache,
    /// Every record of the last batch in upload order, including records
    /// without a recipient name
    uploaded: Vec<TaxDocument>,
    generation: u64,
}

/// Shared session store
#[derive(Clone, Default)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    conversations: ConversationStore,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole session with a new batch of records.
    ///
    /// Returns the number of records that could be cached by recipient.
    pub async fn commit_batch(&self, records: Vec<TaxDocument>) -> usize {
        let mut state = self.state.write().await;
        Self::replace(&mut state, &self.conversations, records)
    }

    fn replace(
        state: &mut SessionState,
        conversations: &ConversationStore,
        records: Vec<TaxDocument>,
    ) -> usize {
        conversations.clear_all();
        state.cache.reset();
        state.generation += 1;

        let mut cached = 0;
        for record in &records {
            if state.cache.put(record.clone()) {
                cached += 1;
            } else {
                tracing::warn!(
                    document_type = %record.type_label(),
                    "Extracted document has no recipient name, not cached"
                );
            }
        }
        state.uploaded = records;

        tracing::debug!(
            generation = state.generation,
            records = state.uploaded.len(),
            cached,
            recipients = ?state.cache.recipients(),
            "Committed upload batch"
        );

        cached
    }

    /// Generation of the last commit
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Discard every record and conversation unless a commit happened
    /// after `generation`.
    ///
    /// Returns false when a newer batch is in place and was kept.
    pub async fn clear_if_unchanged(&self, generation: u64) -> bool {
        let mut state = self.state.write().await;
        if state.generation != generation {
            return false;
        }
        Self::replace(&mut state, &self.conversations, Vec::new());
        true
    }

    /// Copy of one recipient's records (empty for unknown names)
    pub async fn documents_for(&self, recipient: &str) -> Vec<TaxDocument> {
        self.state.read().await.cache.get(recipient).to_vec()
    }

    pub async fn most_recent_key(&self) -> Option<String> {
        self.state
            .read()
            .await
            .cache
            .most_recent_key()
            .map(str::to_string)
    }

    pub async fn recipients(&self) -> Vec<String> {
        self.state.read().await.cache.recipients()
    }

    /// Records of the last batch, in upload order
    pub async fn uploaded(&self) -> Vec<TaxDocument> {
        self.state.read().await.uploaded.clone()
    }

    /// Conversation histories
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{nec, w2};

    #[tokio::test]
    async fn test_commit_replaces_previous_session() {
        let store = SessionStore::new();
        store.commit_batch(vec![w2("Old Person", 1.0, 0.0)]).await;
        store
            .conversations()
            .handle("Old Person")
            .lock()
            .await
            .push_exchange("q", "a");
        store
            .conversations()
            .handle(GENERAL_CHAT_KEY)
            .lock()
            .await
            .push_exchange("q", "a");

        let cached = store
            .commit_batch(vec![w2("Jane Doe", 10.0, 1.0), nec("Jane Doe", 5.0, 0.0)])
            .await;

        assert_eq!(cached, 2);
        assert!(store.documents_for("Old Person").await.is_empty());
        assert_eq!(store.documents_for("Jane Doe").await.len(), 2);
        assert_eq!(store.conversations().turn_count("Old Person").await, 0);
        assert_eq!(store.conversations().turn_count(GENERAL_CHAT_KEY).await, 0);
        assert_eq!(store.most_recent_key().await.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_uncacheable_records_still_listed() {
        let store = SessionStore::new();
        let mut anonymous = w2("", 3.0, 0.0);
        anonymous.recipient_name = None;

        let cached = store
            .commit_batch(vec![w2("Jane Doe", 1.0, 0.0), anonymous])
            .await;

        assert_eq!(cached, 1);
        assert_eq!(store.uploaded().await.len(), 2);
        assert_eq!(store.recipients().await, vec!["Jane Doe".to_string()]);
    }

    #[tokio::test]
    async fn test_clear_empties_everything() {
        let store = SessionStore::new();
        store.commit_batch(vec![w2("Jane Doe", 1.0, 0.0)]).await;
        let generation = store.generation().await;
        assert!(store.clear_if_unchanged(generation).await);

        assert!(store.uploaded().await.is_empty());
        assert!(store.documents_for("Jane Doe").await.is_empty());
        assert_eq!(store.most_recent_key().await, None);
    }

    #[tokio::test]
    async fn test_clear_if_unchanged_keeps_newer_batch() {
        let store = SessionStore::new();
        store.commit_batch(vec![w2("Jane Doe", 1.0, 0.0)]).await;
        let started = store.generation().await;

        store.commit_batch(vec![w2("John Roe", 2.0, 0.0)]).await;
        assert!(!store.clear_if_unchanged(started).await);
        assert_eq!(store.recipients().await, vec!["John Roe".to_string()]);

        let current = store.generation().await;
        assert!(store.clear_if_unchanged(current).await);
        assert!(store.uploaded().await.is_empty());
        assert!(store.generation().await > current);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_see_whole_batches() {
        let store = SessionStore::new();
        let batch: Vec<TaxDocument> = (0..8).map(|i| w2("Jane Doe", i as f64, 0.0)).collect();

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    for _ in 0..200 {
                        seen.push(store.documents_for("Jane Doe").await.len());
                        tokio::task::yield_now().await;
                    }
                    seen
                })
            })
            .collect();

        for _ in 0..20 {
            store.commit_batch(batch.clone()).await;
            store.commit_batch(Vec::new()).await;
        }

        for reader in readers {
            let seen = reader.await.unwrap();
            assert!(seen.iter().all(|&len| len == 0 || len == batch.len()), "{:?}", seen);
        }
    }
}
