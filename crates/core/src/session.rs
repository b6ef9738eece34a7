//! Editor session and command layer
//!
//! One [`EditorSession`] owns everything an editing workflow touches: the
//! loaded document, per-page rasters and thumbnails, the text overlay, the
//! OCR summaries and the edit-mode flag. Every user gesture maps onto a
//! session command (`load_document`, `run_ocr`, `apply_edit`,
//! `export_document`, ...), so the core runs identically under any UI
//! toolkit or none at all.
//!
//! Long-running commands are strictly sequential over pages and never run
//! concurrently with each other: a second command issued while one is active
//! is rejected with [`SessionError::OperationInProgress`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use ocr_editor_engine::{
    AssemblyError, DocumentHandle, EncodedPage, PdfAssembler, PdfSource, RasterError, Rasterizer,
    RgbaImage,
};

use crate::export::{composite_page, encode_jpeg, ExportError, FontLibrary, JPEG_QUALITY};
use crate::geometry::{FontStyler, HeuristicFontStyler, RenderScale};
use crate::ocr::{overall_ocr_progress, OcrError, OcrService, OcrSummary, OCR_LANGUAGE};
use crate::overlay::{EditForm, OverlayCollection, OverlayItemId, OverlayTextItem};
use crate::progress::ProgressSink;

/// Scale used for page thumbnails, independent of the display scale.
pub const THUMBNAIL_SCALE: f32 = 0.3;

/// Long-running session commands; at most one runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Ocr,
    Zoom,
    Export,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Load => "load",
            Operation::Ocr => "ocr",
            Operation::Zoom => "zoom",
            Operation::Export => "export",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("not a PDF file: {0}")]
    NotAPdf(String),
    #[error("{0} operation already in progress")]
    OperationInProgress(Operation),
    #[error("edit mode is off")]
    EditModeOff,
    #[error("unknown overlay item {0}")]
    UnknownItem(OverlayItemId),
    #[error("PDF assembler is not ready")]
    AssemblerNotReady,
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}

struct LoadedDocument {
    handle: DocumentHandle,
    page_count: u32,
}

struct SessionState {
    rasterizer: Box<dyn Rasterizer + Send>,
    ocr: Box<dyn OcrService + Send>,
    assembler: Box<dyn PdfAssembler + Send>,
    styler: Box<dyn FontStyler + Send>,
    fonts: FontLibrary,
    document: Option<LoadedDocument>,
    scale: RenderScale,
    rasters: HashMap<u32, RgbaImage>,
    thumbnails: HashMap<u32, RgbaImage>,
    overlay: OverlayCollection,
    summaries: Vec<OcrSummary>,
    edit_mode: bool,
}

/// The editor's state and command surface.
#[derive(Clone)]
pub struct EditorSession {
    state: Arc<Mutex<SessionState>>,
    active: Arc<Mutex<Option<Operation>>>,
}

impl EditorSession {
    /// Build a session around the three collaborators. Fonts for export
    /// compositing are probed from the system; the default font heuristic is
    /// installed.
    pub fn new(
        rasterizer: Box<dyn Rasterizer + Send>,
        ocr: Box<dyn OcrService + Send>,
        assembler: Box<dyn PdfAssembler + Send>,
    ) -> Self {
        let state = SessionState {
            rasterizer,
            ocr,
            assembler,
            styler: Box::new(HeuristicFontStyler),
            fonts: FontLibrary::with_system_fonts(),
            document: None,
            scale: RenderScale::default(),
            rasters: HashMap::new(),
            thumbnails: HashMap::new(),
            overlay: OverlayCollection::new(),
            summaries: Vec::new(),
            edit_mode: false,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Replace the font classification strategy.
    pub fn with_font_styler(self, styler: Box<dyn FontStyler + Send>) -> Self {
        self.state.lock().unwrap().styler = styler;
        self
    }

    /// Replace the compositing font library.
    pub fn with_font_library(self, fonts: FontLibrary) -> Self {
        self.state.lock().unwrap().fonts = fonts;
        self
    }

    /// Run the PDF assembler's initialization handshake. Must succeed before
    /// `export_document` can do any work.
    pub fn initialize_assembler(&self, deadline: Duration) -> Result<(), SessionError> {
        self.state.lock().unwrap().assembler.initialize(deadline)?;
        Ok(())
    }

    fn begin_operation(&self, operation: Operation) -> Result<(), SessionError> {
        let mut active = self.active.lock().unwrap();
        if let Some(current) = *active {
            return Err(SessionError::OperationInProgress(current));
        }
        *active = Some(operation);
        Ok(())
    }

    fn end_operation(&self) {
        *self.active.lock().unwrap() = None;
    }

    /// Load a document from a file path. The declared type must be PDF (a
    /// `.pdf` extension); content validation is the rasterizer's concern.
    pub fn load_document(
        &self,
        path: &Path,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), SessionError> {
        let declared_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !declared_pdf {
            return Err(SessionError::NotAPdf(path.display().to_string()));
        }

        self.load_from_source(PdfSource::from(path), progress)
    }

    /// Load a document from raw bytes (no declared file type to check).
    pub fn load_document_bytes(
        &self,
        bytes: Vec<u8>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), SessionError> {
        self.load_from_source(PdfSource::Bytes(bytes), progress)
    }

    fn load_from_source(
        &self,
        source: PdfSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), SessionError> {
        self.begin_operation(Operation::Load)?;
        let result = self.load_inner(source, progress);
        progress.finish();
        self.end_operation();
        result
    }

    fn load_inner(
        &self,
        source: PdfSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        progress.begin("Loading PDF...");

        // A new load replaces the previous document wholesale.
        if let Some(previous) = state.document.take() {
            let _ = state.rasterizer.close(previous.handle);
        }
        state.rasters.clear();
        state.thumbnails.clear();
        state.overlay.clear();
        state.summaries.clear();

        let handle = state.rasterizer.open(source)?;
        let page_count = match state.rasterizer.page_count(handle) {
            Ok(count) => count,
            Err(err) => {
                let _ = state.rasterizer.close(handle);
                return Err(err.into());
            }
        };

        // Sequential render of every page drives the 0..50 progress span.
        // On failure the document does not count as loaded, but rasters
        // rendered so far stay in place.
        let scale = state.scale.factor();
        for page in 1..=page_count {
            match state.rasterizer.render_page(handle, page - 1, scale) {
                Ok(raster) => {
                    state.rasters.insert(page, raster);
                }
                Err(err) => {
                    let _ = state.rasterizer.close(handle);
                    return Err(err.into());
                }
            }
            progress.update(page as f32 / page_count as f32 * 50.0);
        }

        // Thumbnails render once per page after the main pass.
        for page in 1..=page_count {
            match state.rasterizer.render_page(handle, page - 1, THUMBNAIL_SCALE) {
                Ok(thumbnail) => {
                    state.thumbnails.insert(page, thumbnail);
                }
                Err(err) => {
                    let _ = state.rasterizer.close(handle);
                    return Err(err.into());
                }
            }
        }

        state.document = Some(LoadedDocument { handle, page_count });
        info!(page_count, "document loaded");
        Ok(())
    }

    /// Run OCR over every page at the current display scale, rebuilding the
    /// text overlay and the per-page summaries.
    pub fn run_ocr(&self, progress: &mut dyn ProgressSink) -> Result<(), SessionError> {
        self.begin_operation(Operation::Ocr)?;
        let result = self.run_ocr_inner(progress);
        progress.finish();
        self.end_operation();
        result
    }

    fn run_ocr_inner(&self, progress: &mut dyn ProgressSink) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let (handle, page_count) = match &state.document {
            Some(document) => (document.handle, document.page_count),
            None => return Err(SessionError::NoDocument),
        };

        progress.begin("Extracting text with OCR...");
        state.overlay.clear();
        state.summaries.clear();

        let scale = state.scale.factor();
        let mut summaries = Vec::with_capacity(page_count as usize);

        for page in 1..=page_count {
            progress.status(&format!("Processing page {page} of {page_count}..."));

            // OCR always runs on a fresh raster at the display scale, so
            // word boxes land directly in display space.
            let raster = state.rasterizer.render_page(handle, page - 1, scale)?;

            let recognized = state.ocr.recognize(&raster, OCR_LANGUAGE, &mut |fraction| {
                progress.update(overall_ocr_progress(page, page_count, fraction));
            })?;

            let mut items = Vec::new();
            for line in &recognized.lines {
                if line.words.is_empty() {
                    continue;
                }
                for word in &line.words {
                    if word.text.trim().is_empty() {
                        continue;
                    }
                    items.push(OverlayTextItem::from_word(page, word, state.styler.as_ref()));
                }
            }
            state.overlay.replace_page(page, items);
            summaries.push(OcrSummary { page_number: page, text: recognized.text });
        }

        // The summary view only fills in when the whole run succeeded.
        state.summaries = summaries;
        info!(
            pages = page_count,
            items = state.overlay.total_item_count(),
            "ocr run complete"
        );
        Ok(())
    }

    /// Apply a zoom step. The resulting scale is clamped; every page
    /// re-renders at the new scale and the overlay reprojects, so user edits
    /// keep their place instead of reverting.
    pub fn zoom(&self, delta: f32) -> Result<RenderScale, SessionError> {
        self.begin_operation(Operation::Zoom)?;
        let result = self.zoom_inner(delta);
        self.end_operation();
        result
    }

    fn zoom_inner(&self, delta: f32) -> Result<RenderScale, SessionError> {
        let mut state = self.state.lock().unwrap();
        let state = &mut *state;

        let previous = state.scale;
        let next = previous.zoom(delta);
        state.scale = next;

        let Some(document) = &state.document else {
            return Ok(next);
        };
        let (handle, page_count) = (document.handle, document.page_count);

        for page in 1..=page_count {
            let raster = state.rasterizer.render_page(handle, page - 1, next.factor())?;
            state.rasters.insert(page, raster);
        }

        state.overlay.rescale(previous.factor(), next.factor());
        Ok(next)
    }

    /// Toggle edit mode; returns the new state. Pure flag flip, no data
    /// mutation.
    pub fn toggle_edit_mode(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.edit_mode = !state.edit_mode;
        state.edit_mode
    }

    pub fn edit_mode(&self) -> bool {
        self.state.lock().unwrap().edit_mode
    }

    /// Open an item for editing, returning the pre-populated form. Requires
    /// edit mode to be on.
    pub fn open_edit(&self, id: OverlayItemId) -> Result<EditForm, SessionError> {
        let state = self.state.lock().unwrap();
        if !state.edit_mode {
            return Err(SessionError::EditModeOff);
        }

        state
            .overlay
            .item(id)
            .map(EditForm::for_item)
            .ok_or(SessionError::UnknownItem(id))
    }

    /// Overwrite an item's live text and style from an edit form. The
    /// OCR-time baseline fields stay untouched.
    pub fn apply_edit(&self, id: OverlayItemId, form: &EditForm) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.overlay.apply_edit(id, form) {
            Ok(())
        } else {
            Err(SessionError::UnknownItem(id))
        }
    }

    /// Export the document with all edits flattened into the page images.
    ///
    /// Fails fast, before any per-page work, when no document is loaded or
    /// the assembler handshake has not completed. All-or-nothing: any
    /// per-page error aborts the whole export.
    pub fn export_document(&self, progress: &mut dyn ProgressSink) -> Result<Vec<u8>, SessionError> {
        self.begin_operation(Operation::Export)?;
        let result = self.export_inner(progress);
        progress.finish();
        self.end_operation();
        result
    }

    fn export_inner(&self, progress: &mut dyn ProgressSink) -> Result<Vec<u8>, SessionError> {
        let state = self.state.lock().unwrap();

        let document = state.document.as_ref().ok_or(SessionError::NoDocument)?;
        if !state.assembler.is_ready() {
            return Err(SessionError::AssemblerNotReady);
        }
        let page_count = document.page_count;

        progress.begin("Preparing PDF...");

        let mut pages = Vec::with_capacity(page_count as usize);
        for page in 1..=page_count {
            progress.status(&format!("Processing page {page}/{page_count}..."));
            progress.update(page as f32 / page_count as f32 * 80.0);

            // Composite over a copy so the on-screen raster never changes.
            let Some(raster) = state.rasters.get(&page) else {
                continue;
            };
            let items = state
                .overlay
                .page(page)
                .map(|overlay| overlay.items.as_slice())
                .unwrap_or(&[]);

            let composited = composite_page(raster, items, &state.fonts);
            let width = composited.width();
            let height = composited.height();
            let jpeg = encode_jpeg(&composited, JPEG_QUALITY)?;
            pages.push(EncodedPage { jpeg, width, height });
        }

        progress.status("Saving PDF...");
        progress.update(95.0);
        let bytes = state.assembler.assemble(&pages)?;
        progress.update(100.0);

        info!(pages = pages.len(), bytes = bytes.len(), "document exported");
        Ok(bytes)
    }

    pub fn has_document(&self) -> bool {
        self.state.lock().unwrap().document.is_some()
    }

    /// Page count of the loaded document; 0 when none is loaded.
    pub fn page_count(&self) -> u32 {
        self.state
            .lock()
            .unwrap()
            .document
            .as_ref()
            .map(|document| document.page_count)
            .unwrap_or(0)
    }

    pub fn scale(&self) -> RenderScale {
        self.state.lock().unwrap().scale
    }

    /// Overlay items of a page, in OCR scan order.
    pub fn page_items(&self, page_number: u32) -> Vec<OverlayTextItem> {
        self.state
            .lock()
            .unwrap()
            .overlay
            .page(page_number)
            .map(|page| page.items.clone())
            .unwrap_or_default()
    }

    pub fn item(&self, id: OverlayItemId) -> Option<OverlayTextItem> {
        self.state.lock().unwrap().overlay.item(id).cloned()
    }

    /// Per-page OCR summaries of the last completed run.
    pub fn summaries(&self) -> Vec<OcrSummary> {
        self.state.lock().unwrap().summaries.clone()
    }

    /// The current display raster of a page, if rendered.
    pub fn raster(&self, page_number: u32) -> Option<RgbaImage> {
        self.state.lock().unwrap().rasters.get(&page_number).cloned()
    }

    pub fn thumbnail(&self, page_number: u32) -> Option<RgbaImage> {
        self.state.lock().unwrap().thumbnails.get(&page_number).cloned()
    }
}
