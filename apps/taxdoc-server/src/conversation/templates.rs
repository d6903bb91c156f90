//! Prompt rendering for the conversation engine

use crate::aggregate::{document_summary, money, Totals};
use crate::document::TaxDocument;

/// System prompt of the document-free conversation
pub const GENERAL_SYSTEM_PROMPT: &str = "\
You are a professional tax advisor. A client is asking you questions without providing W-2 forms yet.

Your role is to:
- NEVER repeat questions you've already asked
- Use the client's name when they provide it to personalize the conversation
- Ask probing questions to understand their tax situation (one at a time)
- Gather information about income, marital status, dependents, and household support
- Provide helpful tax guidance based on the information they share
- Be conversational, warm, and friendly

CONVERSATION FLOW (ask only if not already answered):
1. If they just provided their name, thank them and ask about their annual income
2. Then ask about marital status (single, married, divorced, widowed)
3. Then ask about number of dependents/children
4. Then ask who provides financial support for household
5. Provide tax guidance based on information gathered

Respond naturally and helpfully (do NOT repeat questions already asked).";

/// Narrative instruction for the document-free conversation
pub const GENERAL_SUMMARY_INSTRUCTION: &str = "\
Based on the conversation history, create a professional intake summary narrative.

Generate a professional narrative summary with 3-4 paragraphs covering:

Paragraph 1: Client's name, marital status, living situation, and dependent information
Paragraph 2: Financial support details and who can claim dependents
Paragraph 3: Income sources and employment details
Paragraph 4 (if applicable): Any additional relevant tax information discussed

Example format:
The taxpayer reported that she is not married and lived with her dependent child for the entire previous year. \
She stated that no one else can claim her child as a dependent because she is the sole provider for the household. \
She provided one W-2 form as her only source of income.

Write in third person using past tense (\"reported\", \"stated\", \"provided\"). \
Extract all relevant information from the conversation and format as flowing narrative paragraphs.";

const DEFAULT_NAME: &str = "Taxpayer";

/// Fill the conversation template from a recipient's documents.
///
/// Placeholders without a value in this context are removed.
pub fn render_system_prompt(template: &str, documents: &[TaxDocument]) -> String {
    let totals = Totals::from_documents(documents);
    let name = documents
        .first()
        .and_then(TaxDocument::recipient_key)
        .unwrap_or(DEFAULT_NAME);

    let replacements = [
        ("{conversation_history}", String::new()),
        ("{employee_name}", name.to_string()),
        ("{w2_count}", documents.len().to_string()),
        ("{w2_details}", document_summary(documents)),
        ("{total_wages}", money(totals.total_income)),
        ("{total_federal_tax}", money(totals.total_federal_tax)),
        ("{total_ss_wages}", money(totals.total_ss_wages)),
        ("{total_medicare_wages}", money(totals.total_medicare_wages)),
        ("{total_state_wages}", money(totals.total_state_wages)),
        ("{total_state_tax}", money(totals.total_state_tax)),
        ("{additional_info}", String::new()),
        ("{current_message}", String::new()),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |prompt, (placeholder, value)| {
            prompt.replace(placeholder, value)
        })
}

/// Narrative instruction for a recipient, embedding their document data
pub fn summary_instruction(documents: &[TaxDocument]) -> String {
    let totals = Totals::from_documents(documents);
    format!(
        "Based on the conversation history, create a professional intake summary narrative.\n\n\
         TAX DOCUMENT DATA:\n{}\n\
         Total Income: ${}\n\
         Total Federal Tax: ${}\n\n\
         Generate a professional narrative summary with 3-4 paragraphs covering:\n\n\
         Paragraph 1: Marital status, living situation, and dependent information\n\
         Paragraph 2: Financial support details and who can claim dependents\n\
         Paragraph 3: Income sources (number of tax documents) and employment/contractor details\n\
         Paragraph 4 (if applicable): Any additional relevant tax information discussed\n\n\
         Write in third person using past tense. Extract all relevant information from the \
         conversation and format as flowing narrative paragraphs.",
        document_summary(documents),
        money(totals.total_income),
        money(totals.total_federal_tax),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::Prompts;
    use crate::test_fixtures::{nec, w2};

    #[test]
    fn test_render_builtin_template() {
        let mut doc = w2("Jane Doe", 50000.0, 5000.0);
        doc.state_income_tax = Some(1200.0);
        let prompt = render_system_prompt(&Prompts::builtin().conversation, &[doc]);

        assert!(prompt.contains("talking with Jane Doe"));
        assert!(prompt.contains("Total Income: $50000.00"));
        assert!(prompt.contains("Total Federal Tax Withheld: $5000.00"));
        assert!(prompt.contains("Total State Income Tax: $1200.00"));
        assert!(prompt.contains("Document #1 (W2)"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_render_counts_and_fallback_name() {
        let mut first = nec("", 10.0, 0.0);
        first.recipient_name = None;
        let docs = [first, w2("Jane Doe", 5.0, 0.0)];

        let prompt = render_system_prompt("{employee_name}|{w2_count}|{total_wages}", &docs);
        assert_eq!(prompt, "Taxpayer|2|15.00");
    }

    #[test]
    fn test_summary_instruction_embeds_totals() {
        let instruction = summary_instruction(&[w2("Jane Doe", 50000.0, 5000.0)]);
        assert!(instruction.contains("TAX DOCUMENT DATA:\n\nDocument #1 (W2):"));
        assert!(instruction.contains("Total Income: $50000.00\nTotal Federal Tax: $5000.00\n"));
    }
}
