//! Conversation Engine
//!
//! Multi-turn chat grounded in a recipient's documents, a general chat that
//! needs no documents, and narrative summaries of either conversation.
//!
//! ## Histories
//!
//! Every key owns one rolling history in the shared [`ConversationStore`].
//! A chat holds the key's lock from reading the history until the reply is
//! recorded, so concurrent messages on one key are answered in order while
//! other keys proceed in parallel. The user turn is recorded only together
//! with a successful reply.

mod templates;

use std::sync::Arc;

use crate::document::TaxDocument;
use crate::model::{ChatMessage, ModelClient, ModelError, ModelRequest};
use crate::session::{ConversationStore, Turn, TurnRole, GENERAL_CHAT_KEY};

pub use templates::{
    render_system_prompt, summary_instruction, GENERAL_SUMMARY_INSTRUCTION, GENERAL_SYSTEM_PROMPT,
};

/// Reply when a recipient has no documents
pub const NO_DOCUMENTS_REPLY: &str =
    "Please upload tax documents first to start the conversation.";

/// Reply when a recipient summary is requested before any chat
pub const SUMMARY_NEEDS_CHAT: &str =
    "ERROR: Please answer the tax advisor questions before generating a summary.";

/// Reply when a general summary is requested before any chat
pub const GENERAL_SUMMARY_NEEDS_CHAT: &str =
    "ERROR: Please answer some questions before generating a summary.";

const DEFAULT_HISTORY_WINDOW: usize = 100;

/// Conversation errors
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Clone)]
pub struct ConversationEngine {
    model: Arc<dyn ModelClient>,
    model_name: Option<String>,
    template: Arc<str>,
    conversations: ConversationStore,
    window: usize,
}

impl ConversationEngine {
    pub fn new(
        model: Arc<dyn ModelClient>,
        template: impl Into<Arc<str>>,
        conversations: ConversationStore,
    ) -> Self {
        Self {
            model,
            model_name: None,
            template: template.into(),
            conversations,
            window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Limit the number of past turns sent with each request
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Answer a message about a recipient's documents
    pub async fn chat(
        &self,
        key: &str,
        documents: &[TaxDocument],
        message: &str,
    ) -> Result<String, ConversationError> {
        if documents.is_empty() {
            tracing::warn!(recipient = %key, "Chat requested without documents");
            return Ok(NO_DOCUMENTS_REPLY.to_string());
        }

        tracing::info!(recipient = %key, documents = documents.len(), "Document chat");
        let system = render_system_prompt(&self.template, documents);
        self.converse(key, &system, message).await
    }

    /// Answer a message in the document-free conversation
    pub async fn general_chat(&self, message: &str) -> Result<String, ConversationError> {
        tracing::info!("General chat");
        self.converse(GENERAL_CHAT_KEY, GENERAL_SYSTEM_PROMPT, message)
            .await
    }

    /// Intake narrative for a recipient's conversation; not recorded
    pub async fn generate_summary(
        &self,
        key: &str,
        documents: &[TaxDocument],
    ) -> Result<String, ConversationError> {
        let instruction = summary_instruction(documents);
        self.summarize(key, &instruction, SUMMARY_NEEDS_CHAT).await
    }

    /// Intake narrative for the general conversation; not recorded
    pub async fn generate_general_summary(&self) -> Result<String, ConversationError> {
        self.summarize(
            GENERAL_CHAT_KEY,
            GENERAL_SUMMARY_INSTRUCTION,
            GENERAL_SUMMARY_NEEDS_CHAT,
        )
        .await
    }

    pub fn clear(&self, key: &str) {
        tracing::info!(recipient = %key, "Cleared conversation");
        self.conversations.clear(key);
    }

    pub fn clear_general(&self) {
        self.clear(GENERAL_CHAT_KEY);
    }

    pub async fn history(&self, key: &str) -> Vec<Turn> {
        self.conversations.snapshot(key).await
    }

    async fn converse(
        &self,
        key: &str,
        system: &str,
        message: &str,
    ) -> Result<String, ConversationError> {
        let handle = self.conversations.handle(key);
        let mut history = handle.lock().await;

        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(history.window(self.window).iter().map(to_message));
        messages.push(ChatMessage::user(message));

        let reply = match self.model.complete(self.request(messages)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(conversation = %key, error = %e, "Chat model call failed");
                return Err(e.into());
            }
        };

        history.push_exchange(message, reply.clone());
        tracing::debug!(conversation = %key, turns = history.len(), "Recorded exchange");

        Ok(reply)
    }

    async fn summarize(
        &self,
        key: &str,
        instruction: &str,
        empty_reply: &str,
    ) -> Result<String, ConversationError> {
        let handle = self.conversations.handle(key);
        let history = handle.lock().await;

        if history.is_empty() {
            tracing::warn!(conversation = %key, "Summary requested before any chat");
            return Ok(empty_reply.to_string());
        }

        let mut messages: Vec<ChatMessage> =
            history.window(self.window).iter().map(to_message).collect();
        messages.push(ChatMessage::user(instruction));

        tracing::info!(conversation = %key, turns = history.len(), "Generating summary");
        Ok(self.model.complete(self.request(messages)).await?)
    }

    fn request(&self, messages: Vec<ChatMessage>) -> ModelRequest {
        let request = ModelRequest::new(messages);
        match &self.model_name {
            Some(name) => request.with_model(name),
            None => request,
        }
    }
}

fn to_message(turn: &Turn) -> ChatMessage {
    match turn.role {
        TurnRole::User => ChatMessage::user(turn.content.clone()),
        TurnRole::Assistant => ChatMessage::assistant(turn.content.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::ScriptedModel;
    use crate::model::Role;
    use crate::test_fixtures::{nec, w2};

    const TEMPLATE: &str = "Client {employee_name} with {w2_count} documents. Wages {total_wages}.{conversation_history}";

    fn engine(model: Arc<ScriptedModel>) -> (ConversationEngine, ConversationStore) {
        let store = ConversationStore::new();
        let engine = ConversationEngine::new(model, TEMPLATE, store.clone());
        (engine, store)
    }

    #[tokio::test]
    async fn test_chat_without_documents_skips_model() {
        let model = ScriptedModel::new();
        let (engine, store) = engine(model.clone());

        let reply = engine.chat("Jane Doe", &[], "Hello").await.unwrap();

        assert_eq!(reply, NO_DOCUMENTS_REPLY);
        assert_eq!(model.call_count(), 0);
        assert_eq!(store.turn_count("Jane Doe").await, 0);
    }

    #[tokio::test]
    async fn test_chat_injects_document_context() {
        let model = ScriptedModel::with_replies(["Are you married?"]);
        let (engine, _) = engine(model.clone());
        let docs = [w2("Jane Doe", 50000.0, 5000.0)];

        let reply = engine.chat("Jane Doe", &docs, "Hi").await.unwrap();
        assert_eq!(reply, "Are you married?");

        let request = &model.requests()[0];
        assert_eq!(
            request.system_prompt(),
            Some("Client Jane Doe with 1 documents. Wages 50000.00.")
        );
        assert_eq!(request.last_content(), Some("Hi"));
    }

    #[tokio::test]
    async fn test_chat_sends_prior_turns() {
        let model = ScriptedModel::with_replies(["first", "second"]);
        let (engine, _) = engine(model.clone());
        let docs = [w2("Jane Doe", 1.0, 0.0)];

        engine.chat("Jane Doe", &docs, "one").await.unwrap();
        engine.chat("Jane Doe", &docs, "two").await.unwrap();

        let second = &model.requests()[1];
        let sent: Vec<(Role, &str)> = second
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[1], (Role::User, "one"));
        assert_eq!(sent[2], (Role::Assistant, "first"));
        assert_eq!(sent[3], (Role::User, "two"));

        let history = engine.history("Jane Doe").await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].content, "second");
    }

    #[tokio::test]
    async fn test_failed_call_records_nothing() {
        let model = ScriptedModel::new();
        model.push_error("timeout");
        let (engine, store) = engine(model);

        let result = engine.chat("Jane Doe", &[w2("Jane Doe", 1.0, 0.0)], "Hi").await;

        assert!(result.is_err());
        assert_eq!(store.turn_count("Jane Doe").await, 0);
    }

    #[tokio::test]
    async fn test_history_window_limits_request() {
        let model = ScriptedModel::with_replies(["a1", "a2", "a3"]);
        let store = ConversationStore::new();
        let engine = ConversationEngine::new(model.clone(), TEMPLATE, store).with_window(2);

        for question in ["q1", "q2", "q3"] {
            engine.general_chat(question).await.unwrap();
        }

        let last = &model.requests()[2];
        // system + two remembered turns + the new message
        assert_eq!(last.messages.len(), 4);
        assert_eq!(last.messages[1].content, "q2");
        assert_eq!(engine.history(GENERAL_CHAT_KEY).await.len(), 6);
    }

    #[tokio::test]
    async fn test_summary_before_chat() {
        let model = ScriptedModel::new();
        let (engine, _) = engine(model.clone());

        let docs = [w2("Jane Doe", 1.0, 0.0)];
        assert_eq!(
            engine.generate_summary("Jane Doe", &docs).await.unwrap(),
            SUMMARY_NEEDS_CHAT
        );
        assert_eq!(
            engine.generate_general_summary().await.unwrap(),
            GENERAL_SUMMARY_NEEDS_CHAT
        );
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_summary_is_not_recorded() {
        let model = ScriptedModel::with_replies(["Are you married?", "The taxpayer reported..."]);
        let (engine, store) = engine(model.clone());
        let docs = [w2("Jane Doe", 50000.0, 5000.0), nec("Jane Doe", 1000.0, 0.0)];

        engine.chat("Jane Doe", &docs, "No").await.unwrap();
        let summary = engine.generate_summary("Jane Doe", &docs).await.unwrap();

        assert_eq!(summary, "The taxpayer reported...");
        assert_eq!(store.turn_count("Jane Doe").await, 2);

        let request = &model.requests()[1];
        assert_eq!(request.system_prompt(), None);
        let instruction = request.last_content().unwrap();
        assert!(instruction.contains("Total Income: $51000.00"));
        assert!(instruction.contains("Total Federal Tax: $5000.00"));
        assert!(instruction.contains("Document #2 (1099-NEC)"));
    }

    #[tokio::test]
    async fn test_general_chat_uses_own_key() {
        let model = ScriptedModel::with_replies(["What is your name?"]);
        let (engine, store) = engine(model.clone());

        engine.general_chat("Hello").await.unwrap();
        assert_eq!(store.turn_count(GENERAL_CHAT_KEY).await, 2);
        assert_eq!(
            model.requests()[0].system_prompt(),
            Some(GENERAL_SYSTEM_PROMPT)
        );

        engine.clear_general();
        assert_eq!(store.turn_count(GENERAL_CHAT_KEY).await, 0);
    }

    #[tokio::test]
    async fn test_concurrent_chats_on_one_key_serialize() {
        let model = ScriptedModel::with_replies(["r1", "r2", "r3", "r4"]);
        let (engine, _) = engine(model.clone());
        let docs = vec![w2("Jane Doe", 1.0, 0.0)];

        let tasks: Vec<_> = (0..4)
            .map(|i| {
                let engine = engine.clone();
                let docs = docs.clone();
                tokio::spawn(async move {
                    engine
                        .chat("Jane Doe", &docs, &format!("m{}", i))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // each request saw every exchange recorded before it
        let requests = model.requests();
        for (i, request) in requests.iter().enumerate() {
            assert_eq!(request.messages.len(), 2 + 2 * i);
        }
        assert_eq!(engine.history("Jane Doe").await.len(), 8);
    }
}
