//! Tax document types
//!
//! The structured record produced by running one uploaded form through the
//! extraction model. Every value the model reads is optional: `None` means
//! "not read / not present on this form", which is distinct from zero.

use std::collections::BTreeMap;
use std::fmt;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// Form type identifier
///
/// Serialized as the label printed on the form (`"W2"`, `"1099-NEC"`).
/// Labels the extractor does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentKind {
    /// Form W-2, Wage and Tax Statement
    W2,
    /// Form 1099-NEC, Nonemployee Compensation
    Nec1099,
    /// Any other label returned by the model
    Other(String),
}

impl DocumentKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::W2 => "W2",
            Self::Nec1099 => "1099-NEC",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for DocumentKind {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "W2" | "W-2" => Self::W2,
            "1099-NEC" | "1099NEC" => Self::Nec1099,
            _ => Self::Other(label),
        }
    }
}

impl From<DocumentKind> for String {
    fn from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted tax form
///
/// Field names match the JSON the extraction model is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxDocument {
    pub document_type: Option<DocumentKind>,

    // Payer / employer
    pub payer_name: Option<String>,
    pub payer_ein: Option<String>,
    pub payer_address: Option<String>,

    // Recipient / employee
    pub recipient_name: Option<String>,
    pub recipient_address: Option<String>,
    pub recipient_ssn_last4: Option<String>,

    // W-2
    pub wages_box1: Option<f64>,
    pub federal_income_tax_withheld_box2: Option<f64>,
    pub social_security_wages_box3: Option<f64>,
    pub medicare_wages_box5: Option<f64>,
    pub box_12: Option<BTreeMap<String, f64>>,
    pub box13_statutory_employee: Option<bool>,
    pub box13_retirement_plan: Option<bool>,
    pub box13_third_party_sick_pay: Option<bool>,
    pub locality_wages: Option<f64>,
    pub locality_income_tax: Option<f64>,
    pub locality_name: Option<String>,

    // 1099-NEC
    pub nonemployee_compensation_box1: Option<f64>,
    pub payer_made_direct_sales_box2: Option<bool>,
    pub federal_income_tax_withheld_box4: Option<f64>,

    // State (common to both forms)
    pub state: Option<String>,
    pub state_wages: Option<f64>,
    pub state_income_tax: Option<f64>,
    pub state_payer_number: Option<String>,

    pub tax_year: Option<i32>,
}

impl TaxDocument {
    pub fn is_w2(&self) -> bool {
        matches!(self.document_type, Some(DocumentKind::W2))
    }

    pub fn is_1099_nec(&self) -> bool {
        matches!(self.document_type, Some(DocumentKind::Nec1099))
    }

    /// Label used in summaries and tables
    pub fn type_label(&self) -> &str {
        self.document_type
            .as_ref()
            .map(DocumentKind::as_str)
            .unwrap_or("Unknown")
    }

    /// Recipient name usable as a cache key (trimmed, non-empty)
    pub fn recipient_key(&self) -> Option<&str> {
        self.recipient_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// W-2 box 1
    pub fn wages(&self) -> Option<f64> {
        self.wages_box1.filter(|_| self.is_w2())
    }

    /// 1099-NEC box 1
    pub fn nonemployee_compensation(&self) -> Option<f64> {
        self.nonemployee_compensation_box1.filter(|_| self.is_1099_nec())
    }

    /// Reportable income for the form's type
    pub fn income(&self) -> Option<f64> {
        self.wages().or_else(|| self.nonemployee_compensation())
    }

    /// Federal income tax withheld (W-2 box 2 or 1099-NEC box 4)
    pub fn federal_withholding(&self) -> Option<f64> {
        match self.document_type {
            Some(DocumentKind::W2) => self.federal_income_tax_withheld_box2,
            Some(DocumentKind::Nec1099) => self.federal_income_tax_withheld_box4,
            _ => None,
        }
    }

    pub fn social_security_wages(&self) -> Option<f64> {
        self.social_security_wages_box3.filter(|_| self.is_w2())
    }

    pub fn medicare_wages(&self) -> Option<f64> {
        self.medicare_wages_box5.filter(|_| self.is_w2())
    }

    /// Drop the field group that does not belong to this form's type.
    ///
    /// Models occasionally fill 1099-NEC boxes on a W-2 (and vice versa);
    /// those values must read as absent. Unknown types keep neither group.
    pub fn normalize(mut self) -> Self {
        if !self.is_w2() {
            self.wages_box1 = None;
            self.federal_income_tax_withheld_box2 = None;
            self.social_security_wages_box3 = None;
            self.medicare_wages_box5 = None;
            self.box_12 = None;
            self.box13_statutory_employee = None;
            self.box13_retirement_plan = None;
            self.box13_third_party_sick_pay = None;
            self.locality_wages = None;
            self.locality_income_tax = None;
            self.locality_name = None;
        }
        if !self.is_1099_nec() {
            self.nonemployee_compensation_box1 = None;
            self.payer_made_direct_sales_box2 = None;
            self.federal_income_tax_withheld_box4 = None;
        }
        self
    }
}

/// A file received from an upload request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename, if the client sent one
    pub file_name: Option<String>,
    /// Declared content type
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: Option<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            file_name,
            content_type,
            data,
        }
    }

    /// Name for logs and error messages
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("<unnamed>")
    }

    /// PDF if declared as `application/pdf` or named `*.pdf`
    pub fn is_pdf(&self) -> bool {
        let by_type = self
            .content_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("application/pdf"));
        let by_name = self
            .file_name
            .as_deref()
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"));
        by_type || by_name
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A raster page ready to attach to a vision request
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
