//! OCR Editor Core Library
//!
//! Text-layer reconciliation for an OCR-backed PDF editor: rasterized pages
//! are OCR'd into an editable overlay aligned with the display raster, user
//! edits mutate the overlay, and export flattens the edited text back onto
//! the page images. Rasterization, recognition and PDF assembly are
//! collaborators supplied by the `ocr-editor-engine` crate (or any other
//! implementation of its traits).

pub mod export;
pub mod geometry;
pub mod ocr;
pub mod overlay;
pub mod progress;
pub mod session;

pub use export::{
    composite_page, default_export_filename, encode_jpeg, ExportError, FontLibrary, ERASE_MARGIN,
    JPEG_QUALITY,
};
pub use geometry::{
    project_box, FontFamily, FontStyler, FontWeight, HeuristicFontStyler, OverlayBox, RenderScale,
    WordBox, DEFAULT_SCALE, MAX_SCALE, MIN_SCALE,
};
pub use ocr::{
    overall_ocr_progress, OcrError, OcrPage, OcrService, OcrSummary, RecognizedLine,
    RecognizedWord, OCR_LANGUAGE,
};
pub use overlay::{
    hex_to_rgb, rgb_to_hex, EditForm, OverlayCollection, OverlayItemId, OverlayTextItem,
    PageOverlay,
};
pub use progress::{NullProgress, ProgressSink};
pub use session::{EditorSession, Operation, SessionError, THUMBNAIL_SCALE};
