//! Recipient cache
//!
//! Extracted documents grouped by recipient name, in upload order. Plain
//! data structure; locking is done by [`super::SessionStore`].

use std::collections::HashMap;

use crate::document::TaxDocument;

#[derive(Debug, Default, Clone)]
pub struct RecipientCache {
    entries: HashMap<String, Vec<TaxDocument>>,
    /// Key of the most recently stored document
    most_recent: Option<String>,
}

impl RecipientCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard every record
    pub fn reset(&mut self) {
        self.entries.clear();
        self.most_recent = None;
    }

    /// Append a record under its recipient.
    ///
    /// Returns `false` (and stores nothing) when the record has no usable
    /// recipient name.
    pub fn put(&mut self, document: TaxDocument) -> bool {
        let Some(key) = document.recipient_key().map(str::to_string) else {
            return false;
        };

        self.entries.entry(key.clone()).or_default().push(document);
        self.most_recent = Some(key);
        true
    }

    /// Records for a recipient; empty for unknown names
    pub fn get(&self, recipient: &str) -> &[TaxDocument] {
        self.entries
            .get(recipient.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Fallback key when a caller does not name a recipient
    pub fn most_recent_key(&self) -> Option<&str> {
        self.most_recent.as_deref()
    }

    /// Recipient names, sorted
    pub fn recipients(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of cached documents
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
