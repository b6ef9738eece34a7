//! Page rasterization collaborator
//!
//! The editor core only ever asks "render page N at scale S"; everything else
//! about the underlying PDF library is hidden behind the [`Rasterizer`]
//! trait. Two backends are provided: [`LopdfRasterizer`], a dependency-light
//! fallback that parses page geometry with `lopdf` and paints placeholder
//! rasters, and (behind the `pdfium` feature) a real renderer backed by the
//! pdfium library.

use image::{Rgba, RgbaImage};
use lopdf::Document;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Opaque handle to a document opened by a [`Rasterizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    /// US Letter, the fallback when a page carries no usable MediaBox.
    pub const US_LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

    /// Pixel dimensions of this page rendered at `scale`.
    pub fn pixel_dimensions(&self, scale: f32) -> (u32, u32) {
        let width = (self.width_pt * scale).round().max(1.0) as u32;
        let height = (self.height_pt * scale).round().max(1.0) as u32;
        (width, height)
    }
}

/// Where the PDF bytes come from.
#[derive(Debug, Clone)]
pub enum PdfSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for PdfSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for PdfSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for PdfSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Rasterization collaborator.
///
/// Implementations own the documents they open; pages are addressed by
/// zero-based index. Render output dimensions are proportional to the
/// requested scale.
pub trait Rasterizer {
    fn open(&mut self, source: PdfSource) -> Result<DocumentHandle, RasterError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RasterError>;
    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, RasterError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        scale: f32,
    ) -> Result<RgbaImage, RasterError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), RasterError>;
}

/// Fallback rasterizer built on `lopdf`.
///
/// Parses real page geometry but paints placeholder rasters (white page with
/// a light frame) instead of actual page content. Good enough for headless
/// use and tests; swap in the pdfium backend for true rendering.
#[derive(Debug, Default)]
pub struct LopdfRasterizer {
    next_handle: u64,
    docs: HashMap<DocumentHandle, Vec<PageSize>>,
}

impl LopdfRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, RasterError> {
        if bytes.windows(b"/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(RasterError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| Self::media_box_size(array))
                .unwrap_or(PageSize::US_LETTER);
            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(RasterError::Backend("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn media_box_size(array: &[lopdf::Object]) -> Option<PageSize> {
        if array.len() != 4 {
            return None;
        }
        let x0 = array[0].as_float().ok()?;
        let y0 = array[1].as_float().ok()?;
        let x1 = array[2].as_float().ok()?;
        let y1 = array[3].as_float().ok()?;
        Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
    }

    fn sizes(&self, handle: DocumentHandle) -> Result<&Vec<PageSize>, RasterError> {
        self.docs.get(&handle).ok_or(RasterError::InvalidHandle(handle.raw()))
    }
}

impl Rasterizer for LopdfRasterizer {
    fn open(&mut self, source: PdfSource) -> Result<DocumentHandle, RasterError> {
        let bytes = match source {
            PdfSource::Path(path) => fs::read(path)?,
            PdfSource::Bytes(bytes) => bytes,
        };

        let sizes = Self::page_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, sizes);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RasterError> {
        Ok(self.sizes(handle)?.len() as u32)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, RasterError> {
        let sizes = self.sizes(handle)?;
        sizes.get(page_index as usize).copied().ok_or(RasterError::PageOutOfRange {
            page: page_index,
            page_count: sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        scale: f32,
    ) -> Result<RgbaImage, RasterError> {
        let size = self.page_size(handle, page_index)?;
        let scale = if scale > 0.0 { scale } else { 1.0 };
        let (width, height) = size.pixel_dimensions(scale);

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        let frame = Rgba([210, 210, 210, 255]);
        if width >= 3 && height >= 3 {
            for x in 0..width {
                image.put_pixel(x, 0, frame);
                image.put_pixel(x, height - 1, frame);
            }
            for y in 0..height {
                image.put_pixel(0, y, frame);
                image.put_pixel(width - 1, y, frame);
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), RasterError> {
        self.docs
            .remove(&handle)
            .map(|_| ())
            .ok_or(RasterError::InvalidHandle(handle.raw()))
    }
}

#[cfg(feature = "pdfium")]
pub mod pdfium_backend {
    //! Real page rendering through the pdfium library.

    use super::*;
    use pdfium_render::prelude::*;

    pub struct PdfiumRasterizer {
        pdfium: &'static Pdfium,
        next_handle: u64,
        docs: HashMap<DocumentHandle, PdfDocument<'static>>,
    }

    impl PdfiumRasterizer {
        /// Bind to a pdfium library found next to the executable, in the
        /// working directory, or on the system library path.
        pub fn new() -> Result<Self, RasterError> {
            let bindings =
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                    .or_else(|_| Pdfium::bind_to_system_library())
                    .map_err(|e| {
                        RasterError::Backend(format!("failed to bind pdfium library: {e}"))
                    })?;

            // pdfium must outlive every document loaded from it
            let pdfium: &'static Pdfium = Box::leak(Box::new(Pdfium::new(bindings)));

            Ok(Self { pdfium, next_handle: 0, docs: HashMap::new() })
        }

        fn doc(&self, handle: DocumentHandle) -> Result<&PdfDocument<'static>, RasterError> {
            self.docs.get(&handle).ok_or(RasterError::InvalidHandle(handle.raw()))
        }

        fn page(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PdfPage<'_>, RasterError> {
            let doc = self.doc(handle)?;
            doc.pages().get(page_index as u16).map_err(|_| RasterError::PageOutOfRange {
                page: page_index,
                page_count: doc.pages().len() as u32,
            })
        }
    }

    impl Rasterizer for PdfiumRasterizer {
        fn open(&mut self, source: PdfSource) -> Result<DocumentHandle, RasterError> {
            let bytes = match source {
                PdfSource::Path(path) => fs::read(path)?,
                PdfSource::Bytes(bytes) => bytes,
            };

            // The document borrows its backing bytes for its whole life.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(bytes, None)
                .map_err(|e| RasterError::Backend(e.to_string()))?;

            self.next_handle += 1;
            let handle = DocumentHandle(self.next_handle);
            self.docs.insert(handle, document);

            Ok(handle)
        }

        fn page_count(&self, handle: DocumentHandle) -> Result<u32, RasterError> {
            Ok(self.doc(handle)?.pages().len() as u32)
        }

        fn page_size(
            &self,
            handle: DocumentHandle,
            page_index: u32,
        ) -> Result<PageSize, RasterError> {
            let page = self.page(handle, page_index)?;
            Ok(PageSize { width_pt: page.width().value, height_pt: page.height().value })
        }

        fn render_page(
            &self,
            handle: DocumentHandle,
            page_index: u32,
            scale: f32,
        ) -> Result<RgbaImage, RasterError> {
            let page = self.page(handle, page_index)?;
            let scale = if scale > 0.0 { scale } else { 1.0 };

            let config = PdfRenderConfig::new().scale_page_by_factor(scale);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| RasterError::Backend(e.to_string()))?;

            let width = bitmap.width() as u32;
            let height = bitmap.height() as u32;
            RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes().to_vec())
                .ok_or_else(|| RasterError::Backend("pdfium returned a malformed bitmap".into()))
        }

        fn close(&mut self, handle: DocumentHandle) -> Result<(), RasterError> {
            self.docs
                .remove(&handle)
                .map(|_| ())
                .ok_or(RasterError::InvalidHandle(handle.raw()))
        }
    }
}
