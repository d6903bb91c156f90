//! Table and spreadsheet export
//!
//! The on-screen table lists only the amounts that belong to each row's
//! form type; the spreadsheet always has the full fixed column layout.
//! Missing values are written as empty text or zero.

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::document::{DocumentKind, TaxDocument};

pub const SHEET_NAME: &str = "Tax Documents";

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const XLSX_FILE_NAME: &str = "tax_documents.xlsx";

pub const XLSX_HEADERS: [&str; 17] = [
    "Document Type",
    "Payer Name",
    "Payer EIN",
    "Payer Address",
    "Recipient Name",
    "Recipient Address",
    "Recipient SSN Last4",
    "Wages (W-2 Box 1)",
    "Federal Tax Withheld (W-2 Box 2)",
    "Social Security Wages (W-2 Box 3)",
    "Medicare Wages (W-2 Box 5)",
    "Nonemployee Compensation (1099-NEC Box 1)",
    "Federal Tax Withheld (1099-NEC Box 4)",
    "State",
    "State Wages/Income",
    "State Income Tax",
    "Tax Year",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to build spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),
}

/// One table row; serializes as a JSON object in column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    cells: Vec<(&'static str, String)>,
}

impl TableRow {
    fn push(&mut self, column: &'static str, value: String) {
        self.cells.push((column, value));
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn amount(value: Option<f64>) -> String {
    format!("{:.2}", value.unwrap_or(0.0))
}

pub fn table_rows(documents: &[TaxDocument]) -> Vec<TableRow> {
    documents.iter().map(table_row).collect()
}

fn table_row(doc: &TaxDocument) -> TableRow {
    let mut row = TableRow::default();
    row.push(
        "Document Type",
        doc.document_type
            .as_ref()
            .map(|kind| kind.as_str().to_string())
            .unwrap_or_default(),
    );
    row.push("Payer Name", text(&doc.payer_name));
    row.push("Payer EIN", text(&doc.payer_ein));
    row.push("Recipient Name", text(&doc.recipient_name));
    row.push("Recipient SSN Last4", text(&doc.recipient_ssn_last4));

    match doc.document_type {
        Some(DocumentKind::W2) => {
            row.push("Wages", amount(doc.wages_box1));
            row.push("Federal Tax Withheld", amount(doc.federal_income_tax_withheld_box2));
            row.push("Social Security Wages", amount(doc.social_security_wages_box3));
            row.push("Medicare Wages", amount(doc.medicare_wages_box5));
        }
        Some(DocumentKind::Nec1099) => {
            row.push(
                "Nonemployee Compensation",
                amount(doc.nonemployee_compensation_box1),
            );
            row.push("Federal Tax Withheld", amount(doc.federal_income_tax_withheld_box4));
        }
        _ => {}
    }

    row.push("State", text(&doc.state));
    row.push("State Wages/Income", amount(doc.state_wages));
    row.push("State Income Tax", amount(doc.state_income_tax));
    row.push("Tax Year", doc.tax_year.unwrap_or(0).to_string());
    row
}

/// Spreadsheet with a header row and one row per document
pub fn to_xlsx(documents: &[TaxDocument]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, header) in XLSX_HEADERS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }

        for (i, doc) in documents.iter().enumerate() {
            let row = i as u32 + 1;
            let kind = doc
                .document_type
                .as_ref()
                .map(DocumentKind::as_str)
                .unwrap_or("");

            let texts = [
                (0, kind),
                (1, doc.payer_name.as_deref().unwrap_or("")),
                (2, doc.payer_ein.as_deref().unwrap_or("")),
                (3, doc.payer_address.as_deref().unwrap_or("")),
                (4, doc.recipient_name.as_deref().unwrap_or("")),
                (5, doc.recipient_address.as_deref().unwrap_or("")),
                (6, doc.recipient_ssn_last4.as_deref().unwrap_or("")),
                (13, doc.state.as_deref().unwrap_or("")),
            ];
            for (col, value) in texts {
                sheet.write_string(row, col, value)?;
            }

            let numbers = [
                (7, doc.wages_box1),
                (8, doc.federal_income_tax_withheld_box2),
                (9, doc.social_security_wages_box3),
                (10, doc.medicare_wages_box5),
                (11, doc.nonemployee_compensation_box1),
                (12, doc.federal_income_tax_withheld_box4),
                (14, doc.state_wages),
                (15, doc.state_income_tax),
                (16, doc.tax_year.map(f64::from)),
            ];
            for (col, value) in numbers {
                sheet.write_number(row, col, value.unwrap_or(0.0))?;
            }
        }

        sheet.autofit();
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(rows = documents.len(), bytes = bytes.len(), "Built spreadsheet");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{nec, w2};

    #[test]
    fn test_w2_row_columns() {
        let mut doc = w2("Jane Doe", 50000.0, 5000.0);
        doc.state = Some("CA".to_string());
        doc.tax_year = Some(2025);

        let rows = table_rows(&[doc]);
        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(
            columns,
            vec![
                "Document Type",
                "Payer Name",
                "Payer EIN",
                "Recipient Name",
                "Recipient SSN Last4",
                "Wages",
                "Federal Tax Withheld",
                "Social Security Wages",
                "Medicare Wages",
                "State",
                "State Wages/Income",
                "State Income Tax",
                "Tax Year",
            ]
        );
        assert_eq!(rows[0].get("Document Type"), Some("W2"));
        assert_eq!(rows[0].get("Wages"), Some("50000.00"));
        assert_eq!(rows[0].get("Social Security Wages"), Some("0.00"));
        assert_eq!(rows[0].get("Payer EIN"), Some(""));
        assert_eq!(rows[0].get("State"), Some("CA"));
        assert_eq!(rows[0].get("Tax Year"), Some("2025"));
    }

    #[test]
    fn test_1099_row_and_missing_values() {
        let rows = table_rows(&[nec("Jane Doe", 1200.5, 0.0), TaxDocument::default()]);

        assert_eq!(rows[0].get("Nonemployee Compensation"), Some("1200.50"));
        assert_eq!(rows[0].get("Federal Tax Withheld"), Some("0.00"));
        assert_eq!(rows[0].get("Wages"), None);

        assert_eq!(rows[1].get("Document Type"), Some(""));
        assert_eq!(rows[1].get("Tax Year"), Some("0"));
        assert_eq!(rows[1].get("State Wages/Income"), Some("0.00"));
        assert_eq!(rows[1].columns().count(), 9);
    }

    #[test]
    fn test_row_serializes_in_column_order() {
        let json = serde_json::to_string(&table_rows(&[w2("Jane Doe", 1.0, 0.0)])[0]).unwrap();
        let type_at = json.find("\"Document Type\"").unwrap();
        let wages_at = json.find("\"Wages\"").unwrap();
        let year_at = json.find("\"Tax Year\"").unwrap();
        assert!(type_at < wages_at && wages_at < year_at);
    }

    #[test]
    fn test_xlsx_is_zip_container() {
        let bytes = to_xlsx(&[w2("Jane Doe", 50000.0, 5000.0), nec("John Roe", 10.0, 1.0)])
            .unwrap();
        assert!(bytes.starts_with(b"PK"));
        assert!(to_xlsx(&[]).unwrap().starts_with(b"PK"));
    }
}
