//! Uploaded tax documents
//!
//! - `types`: the extracted record and upload/raster containers
//! - `normalizer`: file bytes → raster pages for vision input

mod normalizer;
mod types;

pub use normalizer::{
    DocumentNormalizer, NormalizeError, EXTRACTION_DPI, PREVIEW_DPI, PREVIEW_FALLBACK,
};
pub use types::{DocumentKind, RasterImage, TaxDocument, UploadedFile};
