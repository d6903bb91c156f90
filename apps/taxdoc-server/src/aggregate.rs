//! Totals and summaries over one recipient's documents
//!
//! Pure functions. Missing amounts count as zero here and nowhere else.

use std::fmt::Write;

use crate::document::{DocumentKind, TaxDocument};

/// Sums across a recipient's documents
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    /// W-2 wages plus 1099-NEC nonemployee compensation
    pub total_income: f64,
    /// W-2 box 2 plus 1099-NEC box 4
    pub total_federal_tax: f64,
    /// W-2 only
    pub total_ss_wages: f64,
    /// W-2 only
    pub total_medicare_wages: f64,
    pub total_state_wages: f64,
    pub total_state_tax: f64,
}

impl Totals {
    pub fn from_documents(documents: &[TaxDocument]) -> Self {
        documents.iter().fold(Self::default(), |mut totals, doc| {
            totals.total_income += doc.income().unwrap_or(0.0);
            totals.total_federal_tax += doc.federal_withholding().unwrap_or(0.0);
            totals.total_ss_wages += doc.social_security_wages().unwrap_or(0.0);
            totals.total_medicare_wages += doc.medicare_wages().unwrap_or(0.0);
            totals.total_state_wages += doc.state_wages.unwrap_or(0.0);
            totals.total_state_tax += doc.state_income_tax.unwrap_or(0.0);
            totals
        })
    }
}

/// Two-decimal amount as used in prompts
pub fn money(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Numbered, per-document block listing the payer and the amounts that
/// apply to the form's type
pub fn document_summary(documents: &[TaxDocument]) -> String {
    let mut summary = String::new();

    for (i, doc) in documents.iter().enumerate() {
        let _ = write!(summary, "\nDocument #{} ({}):\n", i + 1, doc.type_label());
        let _ = writeln!(
            summary,
            "  Payer: {}",
            doc.payer_name.as_deref().unwrap_or("N/A")
        );

        match doc.document_type {
            Some(DocumentKind::W2) => {
                let _ = writeln!(summary, "  Wages: ${:.2}", doc.wages().unwrap_or(0.0));
                let _ = writeln!(
                    summary,
                    "  Federal Tax Withheld: ${:.2}",
                    doc.federal_withholding().unwrap_or(0.0)
                );
            }
            Some(DocumentKind::Nec1099) => {
                let _ = writeln!(
                    summary,
                    "  Nonemployee Compensation: ${:.2}",
                    doc.nonemployee_compensation().unwrap_or(0.0)
                );
                let _ = writeln!(
                    summary,
                    "  Federal Tax Withheld: ${:.2}",
                    doc.federal_withholding().unwrap_or(0.0)
                );
            }
            _ => {}
        }
    }

    summary
}
