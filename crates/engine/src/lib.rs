//! Collaborator layer for the OCR editor
//!
//! Rasterization and PDF assembly live behind trait seams so the editor core
//! can treat both as opaque services: give the rasterizer a page number and a
//! scale and get back a pixel image; give the assembler a sequence of encoded
//! page images and get back a serialized PDF.

pub mod assembly;
pub mod raster;

pub use assembly::{AssemblyError, EncodedPage, LopdfAssembler, PdfAssembler};
pub use raster::{
    DocumentHandle, LopdfRasterizer, PageSize, PdfSource, RasterError, Rasterizer,
};

#[cfg(feature = "pdfium")]
pub use raster::pdfium_backend::PdfiumRasterizer;

pub use image::RgbaImage;
