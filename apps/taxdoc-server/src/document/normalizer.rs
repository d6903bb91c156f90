//! Document normalization
//!
//! Turns an uploaded file into the raster pages a vision model can read.
//! Images pass through after a decode check; PDFs are rendered page by page
//! with MuPDF. Rendering is CPU-bound and always runs on the blocking pool.

use base64::Engine;
use tokio::time::{timeout, Duration};

use super::types::{RasterImage, UploadedFile};

/// Resolution for pages sent to the extraction model
pub const EXTRACTION_DPI: f32 = 300.0;
/// Resolution for the on-screen preview of a PDF's first page
pub const PREVIEW_DPI: f32 = 180.0;
/// Preview shown when a file cannot be previewed
pub const PREVIEW_FALLBACK: &str = "/images/pdf-icon.png";

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";
const PDF_POINTS_PER_INCH: f32 = 72.0;
/// Timeout for rendering a whole document
const RENDER_TIMEOUT_SECS: u64 = 60;

/// Normalization errors. All of them mean the upload is not a readable
/// PDF or image.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("PDF contains no pages")]
    NoPages,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Failed to render page: {0}")]
    Render(String),

    #[error("PDF uploads require the pdf-render feature")]
    PdfUnsupported,

    #[error("Rendering timed out after {0} seconds")]
    Timeout(u64),
}

/// Converts uploads into raster pages
#[derive(Debug, Clone)]
pub struct DocumentNormalizer {
    dpi: f32,
    preview_dpi: f32,
}

impl Default for DocumentNormalizer {
    fn default() -> Self {
        Self::new(EXTRACTION_DPI, PREVIEW_DPI)
    }
}

impl DocumentNormalizer {
    pub fn new(dpi: f32, preview_dpi: f32) -> Self {
        Self { dpi, preview_dpi }
    }

    /// Normalize on the blocking pool with a render timeout
    pub async fn normalize(&self, file: &UploadedFile) -> Result<Vec<RasterImage>, NormalizeError> {
        let normalizer = self.clone();
        let file = file.clone();

        timeout(
            Duration::from_secs(RENDER_TIMEOUT_SECS),
            tokio::task::spawn_blocking(move || normalizer.normalize_blocking(&file)),
        )
        .await
        .map_err(|_| NormalizeError::Timeout(RENDER_TIMEOUT_SECS))?
        .map_err(|e| NormalizeError::Render(format!("Task join error: {}", e)))?
    }

    /// Ordered raster pages for one upload: one for an image, N for an
    /// N-page PDF.
    pub fn normalize_blocking(&self, file: &UploadedFile) -> Result<Vec<RasterImage>, NormalizeError> {
        if file.is_pdf() {
            let pages = render_pdf(&file.data, self.dpi, None)?;
            tracing::debug!(
                file_name = %file.display_name(),
                pages = pages.len(),
                dpi = self.dpi,
                "Rendered PDF pages"
            );
            Ok(pages)
        } else {
            let mime_type = file
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string());
            let decoded = image::load_from_memory(&file.data)
                .map_err(|e| NormalizeError::InvalidImage(e.to_string()))?;

            Ok(vec![RasterImage {
                mime_type,
                data: file.data.to_vec(),
                width: decoded.width(),
                height: decoded.height(),
            }])
        }
    }

    /// Data URL preview for upload responses; never fails
    pub async fn preview(&self, file: &UploadedFile) -> String {
        let normalizer = self.clone();
        let file = file.clone();

        match timeout(
            Duration::from_secs(RENDER_TIMEOUT_SECS),
            tokio::task::spawn_blocking(move || normalizer.preview_blocking(&file)),
        )
        .await
        {
            Ok(Ok(preview)) => preview,
            _ => PREVIEW_FALLBACK.to_string(),
        }
    }

    pub fn preview_blocking(&self, file: &UploadedFile) -> String {
        let content_type = file
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        if content_type.starts_with("image/") {
            return data_url(content_type, &file.data);
        }

        if file.is_pdf() {
            return match render_pdf(&file.data, self.preview_dpi, Some(1)) {
                Ok(pages) => pages
                    .first()
                    .map(|page| data_url(&page.mime_type, &page.data))
                    .unwrap_or_else(|| PREVIEW_FALLBACK.to_string()),
                Err(e) => {
                    tracing::warn!(file_name = %file.display_name(), "Preview render failed: {}", e);
                    PREVIEW_FALLBACK.to_string()
                }
            };
        }

        PREVIEW_FALLBACK.to_string()
    }
}

fn data_url(mime_type: &str, data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

#[cfg(feature = "pdf-render")]
fn render_pdf(
    data: &[u8],
    dpi: f32,
    max_pages: Option<usize>,
) -> Result<Vec<RasterImage>, NormalizeError> {
    use mupdf::{Colorspace, Document, Matrix};

    let doc = Document::from_bytes(data, "application/pdf")
        .map_err(|e| NormalizeError::InvalidPdf(e.to_string()))?;
    let page_count = doc
        .page_count()
        .map_err(|e| NormalizeError::InvalidPdf(e.to_string()))? as usize;

    if page_count == 0 {
        return Err(NormalizeError::NoPages);
    }

    let limit = max_pages.map_or(page_count, |max| max.min(page_count));
    let scale = dpi / PDF_POINTS_PER_INCH;
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();

    let mut pages = Vec::with_capacity(limit);
    for index in 0..limit {
        let page = doc
            .load_page(index as i32)
            .map_err(|e| NormalizeError::Render(format!("page {}: {}", index + 1, e)))?;
        let pixmap = page
            .to_pixmap(&matrix, &colorspace, false, true)
            .map_err(|e| NormalizeError::Render(format!("page {}: {}", index + 1, e)))?;

        pages.push(encode_pixmap(&pixmap)?);
    }

    Ok(pages)
}

#[cfg(not(feature = "pdf-render"))]
fn render_pdf(
    _data: &[u8],
    _dpi: f32,
    _max_pages: Option<usize>,
) -> Result<Vec<RasterImage>, NormalizeError> {
    Err(NormalizeError::PdfUnsupported)
}

#[cfg(feature = "pdf-render")]
fn encode_pixmap(pixmap: &mupdf::Pixmap) -> Result<RasterImage, NormalizeError> {
    use std::io::Cursor;

    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(r);
            let b = samples.get(offset + 2).copied().unwrap_or(r);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    let img = image::RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| NormalizeError::Render("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| NormalizeError::Render(e.to_string()))?;

    Ok(RasterImage {
        mime_type: "image/png".to_string(),
        data: output,
        width,
        height,
    })
}
