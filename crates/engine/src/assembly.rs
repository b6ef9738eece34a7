//! PDF assembly collaborator
//!
//! Builds a fresh output document from a sequence of JPEG-encoded page
//! images, one full-page image per page, page size equal to the image's
//! pixel dimensions. Backends must be initialized through an explicit
//! handshake before any assembly work; initialization either succeeds within
//! the given deadline or fails with a typed error, so callers never poll.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::time::Duration;

/// One page's worth of input for the assembler.
#[derive(Debug, Clone)]
pub struct EncodedPage {
    /// JPEG-encoded image data (embedded verbatim as a DCTDecode stream).
    pub jpeg: Vec<u8>,

    /// Image width in pixels; also the page width in points.
    pub width: u32,

    /// Image height in pixels; also the page height in points.
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("PDF assembler not initialized")]
    NotInitialized,
    #[error("PDF assembler unavailable after {0:?}")]
    InitializationTimeout(Duration),
    #[error("no pages to assemble")]
    NoPages,
    #[error("failed to build page {page}: {message}")]
    Page { page: u32, message: String },
    #[error("failed to serialize document: {0}")]
    Serialize(String),
}

/// PDF assembly collaborator.
pub trait PdfAssembler {
    /// Initialization handshake. Resolves ready within `deadline` or fails
    /// with [`AssemblyError::InitializationTimeout`] (or a backend error).
    fn initialize(&mut self, deadline: Duration) -> Result<(), AssemblyError>;

    fn is_ready(&self) -> bool;

    /// Assemble one page per input image and serialize the document.
    fn assemble(&self, pages: &[EncodedPage]) -> Result<Vec<u8>, AssemblyError>;
}

/// Assembler built on `lopdf`.
#[derive(Debug, Default)]
pub struct LopdfAssembler {
    ready: bool,
}

impl LopdfAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    fn image_object(page: &EncodedPage) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => page.width as i64,
                "Height" => page.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            page.jpeg.clone(),
        )
    }
}

impl PdfAssembler for LopdfAssembler {
    fn initialize(&mut self, _deadline: Duration) -> Result<(), AssemblyError> {
        // lopdf links statically, so readiness is immediate; the deadline
        // matters for backends that load lazily.
        self.ready = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn assemble(&self, pages: &[EncodedPage]) -> Result<Vec<u8>, AssemblyError> {
        if !self.ready {
            return Err(AssemblyError::NotInitialized);
        }
        if pages.is_empty() {
            return Err(AssemblyError::NoPages);
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

        for (index, page) in pages.iter().enumerate() {
            let page_number = index as u32 + 1;
            let image_id = doc.add_object(Self::image_object(page));

            let width = page.width as i64;
            let height = page.height as i64;
            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            Object::Integer(width),
                            Object::Integer(0),
                            Object::Integer(0),
                            Object::Integer(height),
                            Object::Integer(0),
                            Object::Integer(0),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                    Operation::new("Q", vec![]),
                ],
            };
            let encoded = content.encode().map_err(|e| AssemblyError::Page {
                page: page_number,
                message: e.to_string(),
            })?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let mut xobjects = Dictionary::new();
            xobjects.set("Im0", image_id);
            let resources = dictionary! { "XObject" => xobjects };

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ],
                "Contents" => content_id,
                "Resources" => resources,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| AssemblyError::Serialize(e.to_string()))?;

        Ok(output)
    }
}
