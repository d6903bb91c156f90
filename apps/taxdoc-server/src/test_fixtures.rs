//! Shared test inputs

use std::io::Cursor;

use crate::document::{DocumentKind, TaxDocument};

/// A solid-color PNG of the given size
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([240, 240, 240]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

/// A valid one-page PDF (72pt x 72pt) with a filled rectangle
pub fn one_page_pdf() -> Vec<u8> {
    let content = "0 0 1 rg 8 8 56 24 re f";
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 72 72] /Contents 4 0 R >>".to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

pub fn w2(recipient: &str, wages: f64, federal: f64) -> TaxDocument {
    TaxDocument {
        document_type: Some(DocumentKind::W2),
        payer_name: Some("Acme Corp".to_string()),
        recipient_name: Some(recipient.to_string()),
        wages_box1: Some(wages),
        federal_income_tax_withheld_box2: Some(federal),
        ..Default::default()
    }
}

pub fn nec(recipient: &str, compensation: f64, federal: f64) -> TaxDocument {
    TaxDocument {
        document_type: Some(DocumentKind::Nec1099),
        payer_name: Some("Client LLC".to_string()),
        recipient_name: Some(recipient.to_string()),
        nonemployee_compensation_box1: Some(compensation),
        federal_income_tax_withheld_box4: Some(federal),
        ..Default::default()
    }
}

/// Model reply for a W-2, as JSON text
pub fn w2_reply(recipient: &str, wages: f64, federal: f64) -> String {
    serde_json::to_string(&w2(recipient, wages, federal)).unwrap()
}
