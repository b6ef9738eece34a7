//! Export compositing
//!
//! Flattens a page for export: starting from a copy of the page's display
//! raster, every overlay item with non-empty text gets its original region
//! erased (an opaque white rectangle, slightly inflated to cover stray
//! speckle around the glyphs) and its current text painted back on top in
//! the item's current style. Items whose text was emptied are skipped
//! entirely, so their original glyphs keep showing.

use ab_glyph::{FontVec, PxScale};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::warn;

use crate::geometry::{FontFamily, FontWeight, OverlayBox};
use crate::overlay::OverlayTextItem;

/// JPEG quality used for exported page images.
pub const JPEG_QUALITY: u8 = 95;

/// Pixels added on each side of an erased region.
pub const ERASE_MARGIN: f32 = 2.0;

const ERASE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JPEG encoding failed: {0}")]
    Encode(String),
}

/// Fonts used to paint edited text onto page rasters.
///
/// Each family bucket resolves to a system font; when a face is missing,
/// erasing still happens but text for that bucket cannot be drawn. Probing
/// is best-effort across common install locations.
#[derive(Debug, Default)]
pub struct FontLibrary {
    sans: Option<FontVec>,
    sans_bold: Option<FontVec>,
    serif: Option<FontVec>,
    monospace: Option<FontVec>,
}

impl FontLibrary {
    /// A library with no faces; compositing erases but never draws text.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Probe well-known system font locations for each bucket.
    pub fn with_system_fonts() -> Self {
        Self {
            sans: Self::load_first(&[
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans.ttf",
                "/System/Library/Fonts/Supplemental/Arial.ttf",
                "C:\\Windows\\Fonts\\arial.ttf",
            ]),
            sans_bold: Self::load_first(&[
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
                "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
                "C:\\Windows\\Fonts\\arialbd.ttf",
            ]),
            serif: Self::load_first(&[
                "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
                "/usr/share/fonts/TTF/DejaVuSerif.ttf",
                "/usr/share/fonts/dejavu/DejaVuSerif.ttf",
                "/System/Library/Fonts/Supplemental/Times New Roman.ttf",
                "C:\\Windows\\Fonts\\times.ttf",
            ]),
            monospace: Self::load_first(&[
                "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
                "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
                "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
                "/System/Library/Fonts/Supplemental/Courier New.ttf",
                "C:\\Windows\\Fonts\\cour.ttf",
            ]),
        }
    }

    fn load_first(paths: &[&str]) -> Option<FontVec> {
        for path in paths {
            if let Ok(data) = std::fs::read(path) {
                if let Ok(font) = FontVec::try_from_vec(data) {
                    return Some(font);
                }
            }
        }
        None
    }

    /// Resolve the face for a family bucket and weight. Bold only switches
    /// faces for the sans buckets; serif and monospace reuse their face.
    pub fn face_for(&self, family: FontFamily, weight: FontWeight) -> Option<&FontVec> {
        match family {
            FontFamily::Monospace => self.monospace.as_ref().or(self.sans.as_ref()),
            FontFamily::Serif => self.serif.as_ref().or(self.sans.as_ref()),
            FontFamily::HeaderSans | FontFamily::Sans => {
                if weight.is_bold() {
                    self.sans_bold.as_ref().or(self.sans.as_ref())
                } else {
                    self.sans.as_ref()
                }
            }
        }
    }

    pub fn has_any(&self) -> bool {
        self.sans.is_some()
            || self.sans_bold.is_some()
            || self.serif.is_some()
            || self.monospace.is_some()
    }
}

fn pixel_rect(bbox: &OverlayBox) -> Option<Rect> {
    let width = bbox.width.round();
    let height = bbox.height.round();
    if width < 1.0 || height < 1.0 {
        return None;
    }

    Some(Rect::at(bbox.left.round() as i32, bbox.top.round() as i32)
        .of_size(width as u32, height as u32))
}

/// Flatten one page: paint every edited-or-unedited non-empty item over a
/// copy of the base raster. The base image is never mutated.
pub fn composite_page(
    base: &RgbaImage,
    items: &[OverlayTextItem],
    fonts: &FontLibrary,
) -> RgbaImage {
    let mut output = base.clone();
    let mut missing_faces = 0usize;

    for item in items {
        if item.text.trim().is_empty() {
            continue;
        }

        if let Some(erase) = pixel_rect(&item.bbox.inflate(ERASE_MARGIN)) {
            draw_filled_rect_mut(&mut output, erase, ERASE_COLOR);
        }

        match fonts.face_for(item.font_family, item.weight) {
            Some(face) => {
                let color = Rgba([item.color[0], item.color[1], item.color[2], 255]);
                draw_text_mut(
                    &mut output,
                    color,
                    item.bbox.left.round() as i32,
                    item.bbox.top.round() as i32,
                    PxScale::from(item.font_size),
                    face,
                    &item.text,
                );
            }
            None => missing_faces += 1,
        }
    }

    if missing_faces > 0 {
        warn!(missing_faces, "no font face available; erased regions left blank");
    }

    output
}

/// Encode a composited raster as JPEG at the given quality.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| ExportError::Encode(e.to_string()))?;

    Ok(buffer)
}

/// Timestamp-based name for the exported file.
pub fn default_export_filename() -> String {
    format!("edited-document-{}.pdf", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{FontWeight, HeuristicFontStyler, WordBox};
    use crate::ocr::RecognizedWord;
    use crate::overlay::OverlayTextItem;

    fn dark_base(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255]))
    }

    fn item_at(text: &str, bbox: WordBox) -> OverlayTextItem {
        let word = RecognizedWord { text: text.to_string(), confidence: 90.0, bbox };
        OverlayTextItem::from_word(1, &word, &HeuristicFontStyler)
    }

    #[test]
    fn test_composite_erases_inflated_region() {
        let base = dark_base(100, 60);
        let item = item_at("Hello", WordBox::new(10.0, 10.0, 60.0, 30.0));

        let output = composite_page(&base, &[item], &FontLibrary::empty());

        // inflated region (8,8)..(62,32) is white
        assert_eq!(*output.get_pixel(8, 8), Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(61, 31), Rgba([255, 255, 255, 255]));
        assert_eq!(*output.get_pixel(35, 20), Rgba([255, 255, 255, 255]));
        // outside the inflated region is untouched
        assert_eq!(*output.get_pixel(7, 7), Rgba([40, 40, 40, 255]));
        assert_eq!(*output.get_pixel(63, 33), Rgba([40, 40, 40, 255]));
    }

    #[test]
    fn test_composite_skips_blank_items() {
        let base = dark_base(100, 60);
        let mut item = item_at("Hello", WordBox::new(10.0, 10.0, 60.0, 30.0));
        item.text = "   ".to_string();

        let output = composite_page(&base, &[item], &FontLibrary::empty());

        assert_eq!(output, base);
    }

    #[test]
    fn test_composite_does_not_mutate_base() {
        let base = dark_base(100, 60);
        let item = item_at("Hello", WordBox::new(10.0, 10.0, 60.0, 30.0));

        let _ = composite_page(&base, &[item], &FontLibrary::empty());

        assert_eq!(*base.get_pixel(35, 20), Rgba([40, 40, 40, 255]));
    }

    #[test]
    fn test_composite_is_visually_idempotent() {
        let base = dark_base(100, 60);
        let fonts = FontLibrary::with_system_fonts();
        let item = item_at("Hello", WordBox::new(10.0, 10.0, 60.0, 30.0));

        let once = composite_page(&base, std::slice::from_ref(&item), &fonts);
        let twice = composite_page(&once, &[item], &fonts);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_composite_draws_text_when_font_available() {
        let fonts = FontLibrary::with_system_fonts();
        if fonts.face_for(FontFamily::Serif, FontWeight::Normal).is_none() {
            return; // no usable font on this machine; erase-only behavior covered elsewhere
        }

        let base = dark_base(200, 80);
        let mut item = item_at("Hello", WordBox::new(10.0, 10.0, 160.0, 40.0));
        item.text = "World".to_string();

        let output = composite_page(&base, &[item], &fonts);

        let mut dark_pixels = 0;
        for y in 10..50 {
            for x in 10..170 {
                let pixel = output.get_pixel(x, y);
                if pixel[0] < 128 {
                    dark_pixels += 1;
                }
            }
        }
        assert!(dark_pixels > 0, "expected glyph pixels inside the erased region");
    }

    #[test]
    fn test_composite_clips_boxes_at_image_edge() {
        let base = dark_base(50, 50);
        // inflation pushes the erase rectangle to (-2,-2)
        let item = item_at("Edge", WordBox::new(0.0, 0.0, 20.0, 12.0));

        let output = composite_page(&base, &[item], &FontLibrary::empty());

        assert_eq!(*output.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_face_for_falls_back_to_sans() {
        let fonts = FontLibrary::with_system_fonts();
        if fonts.face_for(FontFamily::Sans, FontWeight::Normal).is_some() {
            // every bucket resolves once a sans face exists
            assert!(fonts.face_for(FontFamily::Serif, FontWeight::Normal).is_some());
            assert!(fonts.face_for(FontFamily::Monospace, FontWeight::Bold).is_some());
            assert!(fonts.face_for(FontFamily::HeaderSans, FontWeight::Bold).is_some());
        }

        let empty = FontLibrary::empty();
        assert!(empty.face_for(FontFamily::Sans, FontWeight::Normal).is_none());
        assert!(!empty.has_any());
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_markers() {
        let image = dark_base(16, 16);
        let bytes = encode_jpeg(&image, JPEG_QUALITY).expect("encode");

        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_default_export_filename_shape() {
        let name = default_export_filename();
        assert!(name.starts_with("edited-document-"));
        assert!(name.ends_with(".pdf"));

        let stamp = &name["edited-document-".len()..name.len() - ".pdf".len()];
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }
}
