//! Tax document extraction
//!
//! Sends the raster pages of one upload to the vision model together with
//! the extraction instruction and parses the reply into a [`TaxDocument`].
//! There is no retry: a bad reply is reported to the caller.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::document::{RasterImage, TaxDocument};
use crate::model::{ChatMessage, ModelClient, ModelError, ModelRequest, ResponseSchema};

/// Extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("No pages to extract from")]
    NoPages,

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Model response is not a valid tax document: {0}")]
    Parse(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ExtractionError {
    /// True when the model answered but the answer was unusable
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::EmptyResponse | Self::Parse(_))
    }
}

/// Vision-model extractor for W-2 and 1099-NEC forms
#[derive(Clone)]
pub struct TaxDocumentExtractor {
    model: Arc<dyn ModelClient>,
    model_name: Option<String>,
    instruction: Arc<str>,
}

impl TaxDocumentExtractor {
    pub fn new(model: Arc<dyn ModelClient>, instruction: impl Into<Arc<str>>) -> Self {
        Self {
            model,
            model_name: None,
            instruction: instruction.into(),
        }
    }

    /// Use a specific model instead of the provider default
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Extract one document from all of its pages in a single request
    pub async fn extract(&self, pages: &[RasterImage]) -> Result<TaxDocument, ExtractionError> {
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let message = ChatMessage::user(self.instruction.as_ref()).with_images(pages.to_vec());
        let mut request = ModelRequest::new(vec![message]).with_schema(ResponseSchema {
            name: "tax_document".to_string(),
            schema: tax_document_schema(),
        });
        if let Some(name) = &self.model_name {
            request = request.with_model(name);
        }

        let reply = self.model.complete(request).await?;
        let document = parse_tax_document(&reply)?;

        tracing::info!(
            document_type = %document.type_label(),
            pages = pages.len(),
            "Extracted tax document"
        );

        Ok(document)
    }
}

/// Parse a model reply into a normalized record.
///
/// Accepts bare JSON or JSON inside a Markdown code fence; anything else
/// (including an empty object-less reply) is rejected.
pub fn parse_tax_document(reply: &str) -> Result<TaxDocument, ExtractionError> {
    let body = strip_code_fence(reply.trim());
    if body.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let value: Value =
        serde_json::from_str(body).map_err(|e| ExtractionError::Parse(e.to_string()))?;
    if !value.is_object() {
        return Err(ExtractionError::Parse("expected a JSON object".to_string()));
    }

    let document: TaxDocument =
        serde_json::from_value(value).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    if document == TaxDocument::default() {
        return Err(ExtractionError::EmptyResponse);
    }

    Ok(document.normalize())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as "json"
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// JSON schema for structured-output decoding
pub fn tax_document_schema() -> Value {
    let money = json!({ "type": ["number", "null"] });
    let text = json!({ "type": ["string", "null"] });
    let flag = json!({ "type": ["boolean", "null"] });

    json!({
        "type": "object",
        "properties": {
            "document_type": { "type": ["string", "null"], "enum": ["W2", "1099-NEC", null] },
            "payer_name": text,
            "payer_ein": text,
            "payer_address": text,
            "recipient_name": text,
            "recipient_address": text,
            "recipient_ssn_last4": text,
            "wages_box1": money,
            "federal_income_tax_withheld_box2": money,
            "social_security_wages_box3": money,
            "medicare_wages_box5": money,
            "box_12": {
                "type": ["object", "null"],
                "additionalProperties": { "type": "number" }
            },
            "box13_statutory_employee": flag,
            "box13_retirement_plan": flag,
            "box13_third_party_sick_pay": flag,
            "nonemployee_compensation_box1": money,
            "payer_made_direct_sales_box2": flag,
            "federal_income_tax_withheld_box4": money,
            "state": text,
            "state_wages": money,
            "state_income_tax": money,
            "state_payer_number": text,
            "locality_wages": money,
            "locality_income_tax": money,
            "locality_name": text,
            "tax_year": { "type": ["integer", "null"] }
        },
        "required": ["document_type"]
    })
}
