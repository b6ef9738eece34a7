//! Editable text overlay
//!
//! One overlay text item per OCR'd word, keyed by page. Items are created
//! wholesale when an OCR run repopulates a page, mutated only through the
//! edit operation, and reprojected (never regenerated) when the render scale
//! changes, so user edits survive zooming.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::geometry::{project_box, FontFamily, FontStyler, FontWeight, OverlayBox};
use crate::ocr::RecognizedWord;

/// Unique identifier for an overlay text item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayItemId(Uuid);

impl OverlayItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OverlayItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The editable unit of the overlay.
///
/// Live fields reflect the current (possibly edited) state; the `original_*`
/// fields keep the OCR-time baseline forever, so export knows what to erase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayTextItem {
    pub id: OverlayItemId,

    /// Page this item belongs to (1-based).
    pub page_number: u32,

    /// Current text content.
    pub text: String,

    /// Bounding box in display coordinate space.
    pub bbox: OverlayBox,

    /// Current font size in display pixels.
    pub font_size: f32,

    pub font_family: FontFamily,

    /// Current text color, RGB.
    pub color: [u8; 3],

    pub weight: FontWeight,

    /// Text as recognized by OCR.
    pub original_text: String,

    /// Font size assigned at creation time.
    pub original_font_size: f32,

    /// Font family assigned at creation time.
    pub original_font_family: FontFamily,
}

impl OverlayTextItem {
    /// Build an item from a recognized word. The bounding box is taken
    /// verbatim from the OCR output; style comes from the styler strategy.
    pub fn from_word(page_number: u32, word: &RecognizedWord, styler: &dyn FontStyler) -> Self {
        let bbox = OverlayBox::from_word_box(word.bbox);
        let font_size = styler.font_size(bbox.height);
        let font_family = styler.classify(&word.text, word.confidence, bbox.height);

        Self {
            id: OverlayItemId::new(),
            page_number,
            text: word.text.clone(),
            bbox,
            font_size,
            font_family,
            color: [0, 0, 0],
            weight: FontWeight::Normal,
            original_text: word.text.clone(),
            original_font_size: font_size,
            original_font_family: font_family,
        }
    }

    /// Whether the live text differs from the OCR baseline.
    pub fn has_changes(&self) -> bool {
        self.text != self.original_text
    }

    fn rescale(&mut self, from_scale: f32, to_scale: f32) {
        self.bbox = project_box(self.bbox, from_scale, to_scale);
        self.font_size *= to_scale / from_scale;
    }
}

/// Edit form state, pre-populated by `open_edit` and applied by `apply_edit`.
///
/// Text, color and weight reflect the live item; font size and family are
/// seeded from the creation-time values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditForm {
    pub text: String,
    pub font_size: f32,
    pub font_family: FontFamily,

    /// Color as a `#rrggbb` hex string.
    pub color: String,

    /// Weight classification: bold or normal.
    pub bold: bool,
}

impl EditForm {
    pub fn for_item(item: &OverlayTextItem) -> Self {
        Self {
            text: item.text.clone(),
            font_size: item.original_font_size,
            font_family: item.original_font_family,
            color: rgb_to_hex(item.color),
            bold: item.weight.is_bold(),
        }
    }
}

/// Format an RGB triple as a `#rrggbb` hex string.
pub fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

/// Parse a `#rrggbb` (or `rrggbb`) hex string; anything malformed is black.
pub fn hex_to_rgb(hex: &str) -> [u8; 3] {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return [0, 0, 0];
    }

    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).unwrap_or(0);
    [channel(0..2), channel(2..4), channel(4..6)]
}

/// All overlay items for one page, in OCR scan order (line-major, then
/// word-major).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageOverlay {
    pub page_number: u32,
    pub items: Vec<OverlayTextItem>,
}

impl PageOverlay {
    pub fn new(page_number: u32, items: Vec<OverlayTextItem>) -> Self {
        Self { page_number, items }
    }
}

/// Page number → overlay items for every page that has been OCR'd.
#[derive(Debug, Clone, Default)]
pub struct OverlayCollection {
    pages: HashMap<u32, PageOverlay>,
}

impl OverlayCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every page overlay. Called when an OCR run starts over.
    pub fn clear(&mut self) {
        self.pages.clear();
    }

    /// Install the items for a page, replacing any previous overlay for it.
    /// Every OCR'd page gets an entry, even when no words survived filtering.
    pub fn replace_page(&mut self, page_number: u32, items: Vec<OverlayTextItem>) {
        self.pages.insert(page_number, PageOverlay::new(page_number, items));
    }

    pub fn page(&self, page_number: u32) -> Option<&PageOverlay> {
        self.pages.get(&page_number)
    }

    pub fn item(&self, id: OverlayItemId) -> Option<&OverlayTextItem> {
        self.pages
            .values()
            .flat_map(|page| page.items.iter())
            .find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: OverlayItemId) -> Option<&mut OverlayTextItem> {
        self.pages
            .values_mut()
            .flat_map(|page| page.items.iter_mut())
            .find(|item| item.id == id)
    }

    /// Overwrite an item's live fields from an edit form. The `original_*`
    /// fields are never touched. Returns false for an unknown id.
    pub fn apply_edit(&mut self, id: OverlayItemId, form: &EditForm) -> bool {
        let Some(item) = self.item_mut(id) else {
            return false;
        };

        item.text = form.text.clone();
        item.font_size = form.font_size;
        item.font_family = form.font_family;
        item.color = hex_to_rgb(&form.color);
        item.weight = if form.bold { FontWeight::Bold } else { FontWeight::Normal };
        true
    }

    /// Reproject every item after a render-scale change. Positions and
    /// derived sizes move; text content, color and weight stay as edited.
    pub fn rescale(&mut self, from_scale: f32, to_scale: f32) {
        for page in self.pages.values_mut() {
            for item in &mut page.items {
                item.rescale(from_scale, to_scale);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn total_item_count(&self) -> usize {
        self.pages.values().map(|page| page.items.len()).sum()
    }

    /// Page numbers with an overlay entry, ascending.
    pub fn page_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<_> = self.pages.keys().copied().collect();
        numbers.sort_unstable();
        numbers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{HeuristicFontStyler, WordBox};

    fn word(text: &str, confidence: f32, bbox: WordBox) -> RecognizedWord {
        RecognizedWord { text: text.to_string(), confidence, bbox }
    }

    fn sample_item() -> OverlayTextItem {
        OverlayTextItem::from_word(
            1,
            &word("Hello", 90.0, WordBox::new(10.0, 10.0, 60.0, 30.0)),
            &HeuristicFontStyler,
        )
    }

    #[test]
    fn test_item_captures_originals() {
        let item = sample_item();

        assert_eq!(item.text, "Hello");
        assert_eq!(item.original_text, "Hello");
        assert_eq!(item.bbox, OverlayBox::new(10.0, 10.0, 50.0, 20.0));
        // height 20 -> round(17) with the 0.85 factor
        assert_eq!(item.font_size, 17.0);
        assert_eq!(item.original_font_size, 17.0);
        assert_eq!(item.font_family, FontFamily::Serif);
        assert_eq!(item.color, [0, 0, 0]);
        assert!(!item.has_changes());
    }

    #[test]
    fn test_apply_edit_preserves_originals() {
        let mut collection = OverlayCollection::new();
        let item = sample_item();
        let id = item.id;
        collection.replace_page(1, vec![item]);

        let form = EditForm {
            text: "World".to_string(),
            font_size: 24.0,
            font_family: FontFamily::Monospace,
            color: "#ff0000".to_string(),
            bold: true,
        };
        assert!(collection.apply_edit(id, &form));

        let item = collection.item(id).expect("item");
        assert_eq!(item.text, "World");
        assert_eq!(item.font_size, 24.0);
        assert_eq!(item.font_family, FontFamily::Monospace);
        assert_eq!(item.color, [255, 0, 0]);
        assert_eq!(item.weight, FontWeight::Bold);
        assert!(item.has_changes());

        assert_eq!(item.original_text, "Hello");
        assert_eq!(item.original_font_size, 17.0);
        assert_eq!(item.original_font_family, FontFamily::Serif);
    }

    #[test]
    fn test_apply_edit_unknown_item() {
        let mut collection = OverlayCollection::new();
        let form = EditForm {
            text: String::new(),
            font_size: 10.0,
            font_family: FontFamily::Sans,
            color: "#000000".to_string(),
            bold: false,
        };
        assert!(!collection.apply_edit(OverlayItemId::new(), &form));
    }

    #[test]
    fn test_apply_edit_is_idempotent_overwrite() {
        let mut collection = OverlayCollection::new();
        let item = sample_item();
        let id = item.id;
        collection.replace_page(1, vec![item]);

        let form = EditForm {
            text: "World".to_string(),
            font_size: 24.0,
            font_family: FontFamily::Serif,
            color: "#00ff00".to_string(),
            bold: false,
        };
        collection.apply_edit(id, &form);
        collection.apply_edit(id, &form);

        let item = collection.item(id).expect("item");
        assert_eq!(item.text, "World");
        assert_eq!(item.color, [0, 255, 0]);
    }

    #[test]
    fn test_rescale_moves_items_without_reverting_edits() {
        let mut collection = OverlayCollection::new();
        let item = sample_item();
        let id = item.id;
        collection.replace_page(1, vec![item]);

        let form = EditForm {
            text: "World".to_string(),
            font_size: 17.0,
            font_family: FontFamily::Serif,
            color: "#000000".to_string(),
            bold: false,
        };
        collection.apply_edit(id, &form);

        collection.rescale(1.5, 3.0);

        let item = collection.item(id).expect("item");
        assert_eq!(item.text, "World");
        assert_eq!(item.bbox, OverlayBox::new(20.0, 20.0, 100.0, 40.0));
        assert_eq!(item.font_size, 34.0);
        assert_eq!(item.original_text, "Hello");
    }

    #[test]
    fn test_rescale_round_trip_restores_geometry() {
        let mut collection = OverlayCollection::new();
        let item = sample_item();
        let id = item.id;
        let original_bbox = item.bbox;
        collection.replace_page(1, vec![item]);

        collection.rescale(1.5, 0.5);
        collection.rescale(0.5, 1.5);

        let item = collection.item(id).expect("item");
        assert!((item.bbox.left - original_bbox.left).abs() < 1e-4);
        assert!((item.bbox.height - original_bbox.height).abs() < 1e-4);
        assert!((item.font_size - 17.0).abs() < 1e-4);
    }

    #[test]
    fn test_replace_page_swaps_items_wholesale() {
        let mut collection = OverlayCollection::new();
        let first = sample_item();
        let first_id = first.id;
        collection.replace_page(1, vec![first]);

        let second = sample_item();
        let second_id = second.id;
        collection.replace_page(1, vec![second]);

        assert!(collection.item(first_id).is_none());
        assert!(collection.item(second_id).is_some());
        assert_eq!(collection.total_item_count(), 1);
    }

    #[test]
    fn test_empty_page_keeps_collection_entry() {
        let mut collection = OverlayCollection::new();
        collection.replace_page(3, Vec::new());

        assert!(collection.page(3).is_some());
        assert_eq!(collection.page_numbers(), vec![3]);
        assert_eq!(collection.total_item_count(), 0);
    }

    #[test]
    fn test_edit_form_seeds_from_item() {
        let mut item = sample_item();
        item.text = "Edited".to_string();
        item.font_size = 40.0;
        item.color = [18, 52, 86];
        item.weight = FontWeight::Numeric(600);

        let form = EditForm::for_item(&item);
        assert_eq!(form.text, "Edited");
        // font size and family come from the creation-time values
        assert_eq!(form.font_size, 17.0);
        assert_eq!(form.font_family, FontFamily::Serif);
        assert_eq!(form.color, "#123456");
        assert!(form.bold);
    }

    #[test]
    fn test_item_json_round_trip() {
        let item = sample_item();

        let json = serde_json::to_string(&item).expect("serialize");
        let back: OverlayTextItem = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.id, item.id);
        assert_eq!(back.text, item.text);
        assert_eq!(back.bbox, item.bbox);
        assert_eq!(back.original_font_family, item.original_font_family);
    }

    #[test]
    fn test_hex_round_trip() {
        for rgb in [[0, 0, 0], [255, 255, 255], [18, 52, 86], [1, 2, 3]] {
            assert_eq!(hex_to_rgb(&rgb_to_hex(rgb)), rgb);
        }
    }

    #[test]
    fn test_invalid_hex_is_black() {
        assert_eq!(hex_to_rgb("not-a-color"), [0, 0, 0]);
        assert_eq!(hex_to_rgb("#12345"), [0, 0, 0]);
        assert_eq!(hex_to_rgb(""), [0, 0, 0]);
        assert_eq!(hex_to_rgb("#gggggg"), [0, 0, 0]);
    }
}
