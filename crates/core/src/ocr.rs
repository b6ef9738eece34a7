//! OCR collaborator contract
//!
//! Recognition itself is an opaque service: given a page raster and a
//! language code it produces lines of words with bounding boxes and
//! confidence, reporting fractional progress along the way. This module owns
//! the service trait, its output types, and the overall-progress
//! interpolation used while a run walks the document.

use image::RgbaImage;

use crate::geometry::WordBox;

/// Language code handed to the OCR service. Multi-language configuration is
/// out of scope; recognition is always English.
pub const OCR_LANGUAGE: &str = "eng";

/// A single recognized word in raster pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedWord {
    pub text: String,

    /// Recognition confidence in percent (0..100).
    pub confidence: f32,

    pub bbox: WordBox,
}

/// One line of recognized words, in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedLine {
    pub words: Vec<RecognizedWord>,
}

/// Full OCR output for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrPage {
    /// The page's recognized text as one string.
    pub text: String,

    pub lines: Vec<RecognizedLine>,
}

/// Per-page entry of the recognition summary, rebuilt only when a full OCR
/// run completes.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrSummary {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR recognition failed: {0}")]
    Recognition(String),
    #[error("invalid page image: {0}")]
    InvalidImage(String),
}

/// OCR service collaborator.
pub trait OcrService {
    /// Recognize one page image. `on_progress` receives the service's own
    /// completion fraction in `0.0..=1.0` while recognition runs.
    fn recognize(
        &mut self,
        image: &RgbaImage,
        language: &str,
        on_progress: &mut dyn FnMut(f32),
    ) -> Result<OcrPage, OcrError>;
}

/// Overall progress of an OCR run over `total_pages` pages, while the
/// service is `service_progress` (0..1) through 1-based page `page_number`.
///
/// The run spans 50..100 of the operation's progress; the nested
/// interpolation never regresses and lands exactly on 100 when the last
/// page's service reports 1.0.
pub fn overall_ocr_progress(page_number: u32, total_pages: u32, service_progress: f32) -> f32 {
    let total = total_pages as f32;
    50.0 + ((page_number as f32 - 1.0) / total + service_progress / total) * 50.0
}
