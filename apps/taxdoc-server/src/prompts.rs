//! Prompt texts
//!
//! Loaded once at startup. Each prompt comes from its configured file or
//! falls back to the text compiled into the binary.

use std::path::Path;
use std::sync::Arc;

use crate::config::{ConfigError, PromptConfig};

const EXTRACTION: &str = include_str!("../prompts/extraction.txt");
const CONVERSATION: &str = include_str!("../prompts/conversation.txt");
const TAX_ASSIST: &str = include_str!("../prompts/tax_assist.txt");

#[derive(Debug, Clone)]
pub struct Prompts {
    /// Instruction sent with every page batch to the vision model
    pub extraction: Arc<str>,
    /// Template for document-grounded conversations
    pub conversation: Arc<str>,
    /// System prompt of the advisor query
    pub tax_assist: Arc<str>,
}

impl Default for Prompts {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Prompts {
    pub fn builtin() -> Self {
        Self {
            extraction: EXTRACTION.into(),
            conversation: CONVERSATION.into(),
            tax_assist: TAX_ASSIST.into(),
        }
    }

    pub fn load(config: &PromptConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            extraction: read_or(config.extraction_file.as_deref(), EXTRACTION)?,
            conversation: read_or(config.conversation_file.as_deref(), CONVERSATION)?,
            tax_assist: read_or(config.tax_assist_file.as_deref(), TAX_ASSIST)?,
        })
    }
}

fn read_or(path: Option<&Path>, builtin: &str) -> Result<Arc<str>, ConfigError> {
    let Some(path) = path else {
        return Ok(builtin.into());
    };

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::PromptFile {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Loaded prompt file");
    Ok(text.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_conversation_has_placeholders() {
        let prompts = Prompts::builtin();
        for placeholder in ["{employee_name}", "{w2_details}", "{total_wages}", "{w2_count}"] {
            assert!(prompts.conversation.contains(placeholder), "{}", placeholder);
        }
        assert!(prompts.extraction.contains("document_type"));
    }

    #[test]
    fn test_load_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Custom extraction").unwrap();

        let prompts = Prompts::load(&PromptConfig {
            extraction_file: Some(file.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(prompts.extraction.as_ref(), "Custom extraction");
        assert_eq!(prompts.tax_assist.as_ref(), TAX_ASSIST);
    }

    #[test]
    fn test_missing_prompt_file() {
        let err = Prompts::load(&PromptConfig {
            conversation_file: Some("/nonexistent/conversation.txt".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::PromptFile { .. }));
    }
}
