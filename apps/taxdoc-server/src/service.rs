//! Tax document service
//!
//! Coordinates an upload batch from validation to commit and resolves the
//! recipient a chat or summary refers to before handing it to the
//! conversation engine.
//!
//! ## Upload batches
//!
//! Files are validated up front; nothing is touched when a batch is
//! rejected at that stage. All files are then normalized and extracted
//! concurrently. When every file succeeds the records replace the whole
//! session; when any file fails the session is replaced by an empty one and
//! the error names the failing file.

use futures::future::{join_all, try_join_all};
use uuid::Uuid;

use crate::conversation::{ConversationEngine, NO_DOCUMENTS_REPLY};
use crate::document::{DocumentNormalizer, NormalizeError, TaxDocument, UploadedFile};
use crate::error::{AppError, Result};
use crate::export;
use crate::extraction::TaxDocumentExtractor;
use crate::session::{SessionStore, Turn};

/// Summary reply when no recipient can be resolved
pub const NO_DOCUMENTS_SUMMARY: &str = "Please upload tax documents first.";

/// Placeholder some clients send when no recipient is selected
const UNSET_RECIPIENT: &str = "undefined";

/// Records and previews of a committed batch
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub documents: Vec<TaxDocument>,
    /// One preview per uploaded file, in upload order
    pub previews: Vec<String>,
}

#[derive(Clone)]
pub struct TaxDocumentService {
    session: SessionStore,
    normalizer: DocumentNormalizer,
    extractor: TaxDocumentExtractor,
    engine: ConversationEngine,
    max_upload_bytes: usize,
}

impl TaxDocumentService {
    /// `engine` must share the histories of `session`
    pub fn new(
        session: SessionStore,
        normalizer: DocumentNormalizer,
        extractor: TaxDocumentExtractor,
        engine: ConversationEngine,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            session,
            normalizer,
            extractor,
            engine,
            max_upload_bytes,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Extract every file and make the records the new session
    pub async fn upload(&self, files: Vec<UploadedFile>) -> Result<UploadOutcome> {
        self.validate(&files)?;
        let batch_id = Uuid::new_v4();
        let generation = self.session.generation().await;
        tracing::info!(%batch_id, files = files.len(), "Processing upload batch");

        let (extracted, previews) = tokio::join!(
            try_join_all(files.iter().map(|file| self.extract_file(file))),
            join_all(files.iter().map(|file| self.normalizer.preview(file))),
        );

        let documents = match extracted {
            Ok(documents) => documents,
            Err(e) => {
                if self.session.clear_if_unchanged(generation).await {
                    tracing::warn!(%batch_id, "Upload batch failed, session cleared");
                } else {
                    tracing::warn!(%batch_id, "Upload batch failed, newer batch kept");
                }
                return Err(e);
            }
        };

        let cached = self.session.commit_batch(documents.clone()).await;
        tracing::info!(%batch_id, documents = documents.len(), cached, "Upload batch committed");
        Ok(UploadOutcome {
            documents,
            previews,
        })
    }

    fn validate(&self, files: &[UploadedFile]) -> Result<()> {
        if files.is_empty() {
            return Err(AppError::Validation("No files provided".to_string()));
        }

        for file in files {
            if file.is_empty() {
                return Err(AppError::Validation(format!(
                    "File is empty: {}",
                    file.display_name()
                )));
            }
            if file.size() > self.max_upload_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "File {} exceeds the upload limit of {} bytes",
                    file.display_name(),
                    self.max_upload_bytes
                )));
            }
        }

        Ok(())
    }

    async fn extract_file(&self, file: &UploadedFile) -> Result<TaxDocument> {
        let name = file.display_name();

        let pages = self.normalizer.normalize(file).await.map_err(|e| {
            tracing::warn!(file_name = %name, error = %e, "Failed to normalize upload");
            match e {
                NormalizeError::Timeout(_) => AppError::Internal(e.to_string()),
                _ => AppError::DocumentFormat {
                    file: name.to_string(),
                    message: e.to_string(),
                },
            }
        })?;

        let document = self.extractor.extract(&pages).await.map_err(|e| {
            tracing::error!(file_name = %name, error = %e, "Failed to extract tax document");
            if e.is_parse_error() {
                AppError::Extraction {
                    file: name.to_string(),
                    message: e.to_string(),
                }
            } else {
                AppError::ExtractionUnavailable {
                    file: name.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::info!(
            file_name = %name,
            pages = pages.len(),
            recipient = document.recipient_key().unwrap_or("<none>"),
            "Processed upload"
        );
        Ok(document)
    }

    /// Map a client-supplied name to a cache key, falling back to the most
    /// recently cached recipient
    async fn resolve_recipient(&self, requested: Option<&str>) -> Option<String> {
        match requested.map(str::trim) {
            Some(name) if !name.is_empty() && name != UNSET_RECIPIENT => Some(name.to_string()),
            _ => {
                let fallback = self.session.most_recent_key().await;
                tracing::info!(recipient = ?fallback, "No recipient given, using most recent");
                fallback
            }
        }
    }

    pub async fn chat(&self, recipient: Option<&str>, message: &str) -> Result<String> {
        let Some(key) = self.resolve_recipient(recipient).await else {
            tracing::warn!("Chat requested with no cached documents");
            return Ok(NO_DOCUMENTS_REPLY.to_string());
        };

        let documents = self.session.documents_for(&key).await;
        Ok(self.engine.chat(&key, &documents, message).await?)
    }

    pub async fn summary(&self, recipient: Option<&str>) -> Result<String> {
        let Some(key) = self.resolve_recipient(recipient).await else {
            tracing::warn!("Summary requested with no cached documents");
            return Ok(NO_DOCUMENTS_SUMMARY.to_string());
        };

        let documents = self.session.documents_for(&key).await;
        Ok(self.engine.generate_summary(&key, &documents).await?)
    }

    pub async fn clear_history(&self, recipient: Option<&str>) {
        if let Some(key) = self.resolve_recipient(recipient).await {
            self.engine.clear(&key);
        }
    }

    /// Resolved recipient and its turns; `None` when nothing is cached
    pub async fn history(&self, recipient: Option<&str>) -> Option<(String, Vec<Turn>)> {
        let key = self.resolve_recipient(recipient).await?;
        let turns = self.engine.history(&key).await;
        Some((key, turns))
    }

    pub async fn general_chat(&self, message: &str) -> Result<String> {
        Ok(self.engine.general_chat(message).await?)
    }

    pub async fn general_summary(&self) -> Result<String> {
        Ok(self.engine.generate_general_summary().await?)
    }

    pub fn clear_general_history(&self) {
        self.engine.clear_general();
    }

    /// Spreadsheet of the last batch; `None` when nothing was uploaded
    pub async fn spreadsheet(&self) -> Result<Option<Vec<u8>>> {
        let documents = self.session.uploaded().await;
        if documents.is_empty() {
            return Ok(None);
        }

        // rust_xlsxwriter is synchronous
        let bytes = tokio::task::spawn_blocking(move || export::to_xlsx(&documents))
            .await
            .map_err(|e| AppError::Internal(format!("Spreadsheet task failed: {}", e)))??;
        Ok(Some(bytes))
    }
}
