//! Tax research queries
//!
//! Stateless question answering backed by a web-search-capable model.
//! Free-form questions pass a cheap tax-topic check first; the canned
//! questions skip it. Failures degrade to a fixed apology instead of an
//! error response.

use std::sync::Arc;

use crate::model::{ChatMessage, ModelClient, ModelRequest};

pub const OFF_TOPIC_REPLY: &str = "I can only answer questions related to U.S. federal taxes and IRS matters. Please ask a tax-related question.";

pub const UNAVAILABLE_REPLY: &str = "Error retrieving IRS information. Please try again later.";

const DISCLAIMER: &str = "This is an educational estimate based on IRS guidelines. For your actual tax situation, please consult a tax professional or use official IRS tools.";

/// Questions answered without a topic check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedQuestion {
    FilingDeadlines,
    LatestUpdates,
    TaxBrackets,
    StandardDeduction,
}

impl CannedQuestion {
    pub fn question(self, tax_year: u16) -> String {
        match self {
            Self::FilingDeadlines => format!(
                "What are the tax year {} IRS tax filing deadlines (filing in {})?",
                tax_year,
                tax_year.saturating_add(1)
            ),
            Self::LatestUpdates => format!(
                "What are the latest IRS updates and announcements for tax year {}?",
                tax_year
            ),
            Self::TaxBrackets => format!(
                "What are the tax year {} federal income tax brackets?",
                tax_year
            ),
            Self::StandardDeduction => format!(
                "What is the standard deduction amount for tax year {}?",
                tax_year
            ),
        }
    }
}

#[derive(Clone)]
pub struct TaxAdvisor {
    model: Arc<dyn ModelClient>,
    search_model: String,
    validation_model: String,
    system_prompt: Arc<str>,
    tax_year: u16,
}

impl TaxAdvisor {
    pub fn new(
        model: Arc<dyn ModelClient>,
        search_model: impl Into<String>,
        validation_model: impl Into<String>,
        system_prompt: impl Into<Arc<str>>,
        tax_year: u16,
    ) -> Self {
        Self {
            model,
            search_model: search_model.into(),
            validation_model: validation_model.into(),
            system_prompt: system_prompt.into(),
            tax_year,
        }
    }

    /// Answer a free-form question if it is about federal taxes
    pub async fn query(&self, question: &str) -> String {
        if !self.is_tax_related(question).await {
            tracing::warn!(question = %question, "Rejected non-tax question");
            return OFF_TOPIC_REPLY.to_string();
        }
        self.search(question).await
    }

    pub async fn canned(&self, canned: CannedQuestion) -> String {
        self.search(&canned.question(self.tax_year)).await
    }

    async fn is_tax_related(&self, question: &str) -> bool {
        let prompt = format!(
            "Determine if the following question relates to U.S. federal income taxes or IRS topics such as:\n\
             - tax brackets, deductions, credits\n\
             - filing status, dependents\n\
             - tax forms (1040, W-2, 1099, etc.)\n\
             - IRS publications or policies\n\
             - AGI, taxable income calculations\n\n\
             Respond only with \"YES\" or \"NO\".\n\n\
             Question: {}",
            question
        );
        let request =
            ModelRequest::new(vec![ChatMessage::user(prompt)]).with_model(&self.validation_model);

        match self.model.complete(request).await {
            Ok(answer) => {
                let accepted = answer.trim().to_uppercase().starts_with("YES");
                tracing::info!(accepted, answer = %answer.trim(), "Tax topic check");
                accepted
            }
            Err(e) => {
                tracing::error!(error = %e, "Tax topic check failed");
                false
            }
        }
    }

    async fn search(&self, question: &str) -> String {
        tracing::info!(question = %question, tax_year = self.tax_year, "Tax research query");

        let request = ModelRequest::new(vec![
            ChatMessage::system(self.system_prompt.as_ref()),
            ChatMessage::user(self.user_prompt(question)),
        ])
        .with_model(&self.search_model)
        .with_web_search();

        match self.model.complete(request).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!(error = %e, "Tax research query failed");
                UNAVAILABLE_REPLY.to_string()
            }
        }
    }

    fn user_prompt(&self, question: &str) -> String {
        let year = self.tax_year;
        let filing = year.saturating_add(1);
        let prior = year.saturating_sub(1);
        format!(
            "CRITICAL: This question is about TAX YEAR {year} (filing in {filing}).\n\
             This is for income earned in {year}, to be filed in {filing}.\n\
             Do NOT provide information for tax year {prior} or any other year.\n\n\
             USER CONTEXT:\n\
             Tax Year: {year} (filing in {filing})\n\
             Income Year: {year}\n\
             Filing Year: {filing}\n\n\
             USER QUESTION:\n\
             {question}\n\n\
             ---\n\
             INSTRUCTION TO ASSISTANT:\n\
             1. Search ONLY for tax year {year} information from IRS.gov.\n\
             2. If the user provides specific income amounts and asks for calculations (EITC, tax owed, etc.):\n\
             \x20  - Use the official {year} IRS tables, formulas, and thresholds from IRS.gov\n\
             \x20  - Perform the calculation step-by-step showing the formula used\n\
             \x20  - Cite the specific IRS publication or table used (e.g., \"IRS Publication 596, EITC Table for {year}\")\n\
             \x20  - Clearly state any assumptions made\n\
             3. If {year} information is not yet available, explicitly state: \"Tax year {year} information is not yet published by the IRS. The most recent available is [year].\"\n\
             4. NEVER provide {prior} or prior year information without clearly stating the year.\n\
             5. Provide a factual, compliant, and concise answer with IRS.gov sources.\n\
             6. End with: \"{DISCLAIMER}\"\n"
        )
    }
}
