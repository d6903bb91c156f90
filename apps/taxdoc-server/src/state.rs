//! Application state management

use std::sync::Arc;

use crate::advisor::TaxAdvisor;
use crate::config::Config;
use crate::conversation::ConversationEngine;
use crate::document::DocumentNormalizer;
use crate::extraction::TaxDocumentExtractor;
use crate::model::{ModelClient, ModelError, OpenAiProvider};
use crate::prompts::Prompts;
use crate::service::TaxDocumentService;
use crate::session::SessionStore;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize model provider: {0}")]
    ModelInit(#[from] ModelError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    documents: TaxDocumentService,
    advisor: TaxAdvisor,
}

impl AppState {
    /// Create the state with the OpenAI-compatible provider from `config`
    pub fn new(config: Config, prompts: Prompts) -> Result<Self, StateError> {
        let provider = OpenAiProvider::new(
            &config.model.base_url,
            &config.model.api_key,
            &config.model.chat_model,
            config.model.timeout(),
        )?;
        Ok(Self::with_model(config, prompts, Arc::new(provider)))
    }

    /// Create the state around any model client
    pub fn with_model(config: Config, prompts: Prompts, model: Arc<dyn ModelClient>) -> Self {
        let session = SessionStore::new();

        let extractor = TaxDocumentExtractor::new(model.clone(), prompts.extraction.clone())
            .with_model_name(&config.model.extraction_model);
        let engine = ConversationEngine::new(
            model.clone(),
            prompts.conversation.clone(),
            session.conversations().clone(),
        )
        .with_model_name(&config.model.chat_model)
        .with_window(config.limits.chat_history_window);

        let documents = TaxDocumentService::new(
            session,
            DocumentNormalizer::default(),
            extractor,
            engine,
            config.limits.max_upload_bytes,
        );

        let advisor = TaxAdvisor::new(
            model,
            &config.model.search_model,
            &config.model.validation_model,
            prompts.tax_assist.clone(),
            config.limits.tax_year,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                documents,
                advisor,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the tax document service
    pub fn documents(&self) -> &TaxDocumentService {
        &self.inner.documents
    }

    /// Get the tax research advisor
    pub fn advisor(&self) -> &TaxAdvisor {
        &self.inner.advisor
    }
}
