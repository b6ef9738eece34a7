//! Overlay geometry and render-scale projection
//!
//! OCR reports word boxes in the pixel space of the raster it ran on. The
//! overlay keeps those boxes in display space and reprojects them whenever
//! the render scale changes, so items keep tracking the zoomed page.

use serde::{Deserialize, Serialize};

/// Lower bound for the render scale.
pub const MIN_SCALE: f32 = 0.5;

/// Upper bound for the render scale.
pub const MAX_SCALE: f32 = 3.0;

/// Scale applied when a document is first opened.
pub const DEFAULT_SCALE: f32 = 1.5;

/// Current render scale, always clamped to `[MIN_SCALE, MAX_SCALE]`.
///
/// Zoom requests outside the range are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderScale(f32);

impl RenderScale {
    pub fn new(factor: f32) -> Self {
        Self(factor.clamp(MIN_SCALE, MAX_SCALE))
    }

    /// The scale after applying a zoom step, clamped into range.
    pub fn zoom(self, delta: f32) -> Self {
        Self::new(self.0 + delta)
    }

    pub fn factor(self) -> f32 {
        self.0
    }
}

impl Default for RenderScale {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
    }
}

/// Word bounding box as reported by OCR: corner form, raster pixels,
/// top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl WordBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

/// Overlay item bounding box: edge form, display pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl OverlayBox {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    pub fn from_word_box(word: WordBox) -> Self {
        Self {
            left: word.x0,
            top: word.y0,
            width: word.x1 - word.x0,
            height: word.y1 - word.y0,
        }
    }

    /// The box grown by `margin` on each side.
    pub fn inflate(&self, margin: f32) -> Self {
        Self {
            left: self.left - margin,
            top: self.top - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }
}

/// Project a box from one render scale into another.
///
/// All coordinates scale linearly by `to_scale / from_scale`; projecting back
/// with the scales swapped recovers the original box up to floating-point
/// error.
pub fn project_box(bbox: OverlayBox, from_scale: f32, to_scale: f32) -> OverlayBox {
    let ratio = to_scale / from_scale;
    OverlayBox {
        left: bbox.left * ratio,
        top: bbox.top * ratio,
        width: bbox.width * ratio,
        height: bbox.height * ratio,
    }
}

/// Font family bucket assigned to an overlay item.
///
/// Each bucket carries a CSS font stack so a UI adapter can style items
/// without its own mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontFamily {
    Monospace,
    Serif,
    /// Large sans-serif text, typically headings.
    HeaderSans,
    Sans,
}

impl FontFamily {
    pub fn css_stack(&self) -> &'static str {
        match self {
            FontFamily::Monospace => "Courier New, monospace",
            FontFamily::Serif => "Times New Roman, serif",
            FontFamily::HeaderSans => "Arial, sans-serif",
            FontFamily::Sans => "Arial, Helvetica, sans-serif",
        }
    }

    /// First family of the stack, as an edit form shows it.
    pub fn display_name(&self) -> &'static str {
        match self {
            FontFamily::Monospace => "Courier New",
            FontFamily::Serif => "Times New Roman",
            FontFamily::HeaderSans | FontFamily::Sans => "Arial",
        }
    }
}

/// Font weight of an overlay item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontWeight {
    Normal,
    Bold,
    Numeric(u16),
}

impl FontWeight {
    /// Bold iff the literal `Bold` keyword or a numeric weight above 400.
    pub fn is_bold(&self) -> bool {
        match self {
            FontWeight::Bold => true,
            FontWeight::Numeric(value) => *value > 400,
            FontWeight::Normal => false,
        }
    }
}

/// Strategy mapping a recognized word to a visual style.
///
/// Pluggable so the classification can be swapped without touching the
/// overlay manager or the export compositor.
pub trait FontStyler {
    /// Classify a word into a font family bucket.
    ///
    /// `confidence` is the OCR confidence in percent (0..100); `box_height`
    /// is the word box height in display pixels.
    fn classify(&self, text: &str, confidence: f32, box_height: f32) -> FontFamily;

    /// Estimate a font size from the word box height.
    fn font_size(&self, box_height: f32) -> f32;
}

/// Default best-effort classification.
///
/// A visual approximation, not font-metric detection: uppercase identifiers
/// read as monospace, confident mid-size text as serif, tall text as heading
/// sans, everything else as body sans.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFontStyler;

impl HeuristicFontStyler {
    fn looks_monospace(text: &str) -> bool {
        text.len() > 3
            && text
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    }
}

impl FontStyler for HeuristicFontStyler {
    fn classify(&self, text: &str, confidence: f32, box_height: f32) -> FontFamily {
        if Self::looks_monospace(text) {
            return FontFamily::Monospace;
        }
        if confidence > 80.0 && box_height > 12.0 {
            return FontFamily::Serif;
        }
        if box_height > 18.0 {
            return FontFamily::HeaderSans;
        }
        FontFamily::Sans
    }

    fn font_size(&self, box_height: f32) -> f32 {
        (box_height * 0.85).round().max(10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_box_eq(a: OverlayBox, b: OverlayBox, tolerance: f32) {
        assert!((a.left - b.left).abs() < tolerance, "left: {} vs {}", a.left, b.left);
        assert!((a.top - b.top).abs() < tolerance, "top: {} vs {}", a.top, b.top);
        assert!((a.width - b.width).abs() < tolerance, "width: {} vs {}", a.width, b.width);
        assert!((a.height - b.height).abs() < tolerance, "height: {} vs {}", a.height, b.height);
    }

    #[test]
    fn test_projection_round_trip() {
        let original = OverlayBox::new(10.0, 20.0, 150.0, 18.0);

        for (s1, s2) in [(1.5, 3.0), (0.5, 1.5), (1.0, 2.75), (2.0, 0.5)] {
            let there = project_box(original, s1, s2);
            let back = project_box(there, s2, s1);
            assert_box_eq(back, original, 1e-4);
        }
    }

    #[test]
    fn test_projection_scales_linearly() {
        let bbox = OverlayBox::new(10.0, 10.0, 50.0, 20.0);
        let projected = project_box(bbox, 1.5, 3.0);

        assert_box_eq(projected, OverlayBox::new(20.0, 20.0, 100.0, 40.0), 1e-4);
    }

    #[test]
    fn test_zoom_clamps_to_range() {
        let scale = RenderScale::new(1.5);
        assert_eq!(scale.zoom(10.0).factor(), 3.0);
        assert_eq!(scale.zoom(-10.0).factor(), 0.5);
    }

    #[test]
    fn test_repeated_zoom_stays_clamped() {
        let mut scale = RenderScale::default();
        for _ in 0..40 {
            scale = scale.zoom(0.1);
            assert!(scale.factor() <= MAX_SCALE);
        }
        assert_eq!(scale.factor(), MAX_SCALE);

        for _ in 0..40 {
            scale = scale.zoom(-0.1);
            assert!(scale.factor() >= MIN_SCALE);
        }
        assert_eq!(scale.factor(), MIN_SCALE);
    }

    #[test]
    fn test_font_size_heuristic() {
        let styler = HeuristicFontStyler;
        assert_eq!(styler.font_size(20.0), 17.0);
        assert_eq!(styler.font_size(5.0), 10.0);
    }

    #[test]
    fn test_font_family_buckets() {
        let styler = HeuristicFontStyler;

        // Uppercase identifier wins regardless of confidence or height
        assert_eq!(styler.classify("ABC123", 10.0, 50.0), FontFamily::Monospace);
        assert_eq!(styler.classify("ABC123", 99.0, 5.0), FontFamily::Monospace);

        assert_eq!(styler.classify("Hello", 90.0, 14.0), FontFamily::Serif);
        assert_eq!(styler.classify("Hello", 50.0, 20.0), FontFamily::HeaderSans);
        assert_eq!(styler.classify("hi", 50.0, 10.0), FontFamily::Sans);
    }

    #[test]
    fn test_font_family_css_stacks() {
        assert_eq!(FontFamily::Monospace.css_stack(), "Courier New, monospace");
        assert_eq!(FontFamily::Serif.css_stack(), "Times New Roman, serif");
        assert_eq!(FontFamily::HeaderSans.css_stack(), "Arial, sans-serif");
        assert_eq!(FontFamily::Sans.css_stack(), "Arial, Helvetica, sans-serif");
        assert_eq!(FontFamily::Serif.display_name(), "Times New Roman");
        assert_eq!(FontFamily::HeaderSans.display_name(), "Arial");
    }

    #[test]
    fn test_short_uppercase_is_not_monospace() {
        let styler = HeuristicFontStyler;
        assert_eq!(styler.classify("ABC", 50.0, 10.0), FontFamily::Sans);
    }

    #[test]
    fn test_weight_classification() {
        assert!(FontWeight::Bold.is_bold());
        assert!(FontWeight::Numeric(700).is_bold());
        assert!(!FontWeight::Numeric(400).is_bold());
        assert!(!FontWeight::Normal.is_bold());
    }

    #[test]
    fn test_inflate_grows_every_side() {
        let bbox = OverlayBox::new(10.0, 10.0, 50.0, 20.0);
        let grown = bbox.inflate(2.0);

        assert_box_eq(grown, OverlayBox::new(8.0, 8.0, 54.0, 24.0), 1e-6);
    }
}
