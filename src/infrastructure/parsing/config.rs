//! Selector configuration for product page extraction
//!
//! Centralized CSS selectors and fallback chains. Each field lists its rules
//! in priority order; the first rule that yields a non-empty value wins.

use serde::{Deserialize, Serialize};

/// One step of a fallback chain.
///
/// Reads the text of the first element matching `selector`, or the named
/// `attribute` of that element when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub selector: String,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldRule {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: None,
        }
    }

    pub fn attribute(selector: &str, attribute: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }
}

/// Selectors for product detail pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSelectors {
    /// Price has a single rule, no fallback
    pub price: Vec<FieldRule>,
    pub name: Vec<FieldRule>,
    pub brand: Vec<FieldRule>,

    /// Actionable "add to basket" control
    pub add_to_basket_button: String,
    /// Elements whose text is scanned for `add_to_basket_phrase`
    pub add_to_basket_text: String,
    /// Compared case-insensitively against whitespace-normalized text
    pub add_to_basket_phrase: String,

    /// Variant group containers
    pub swatch_group: String,
    /// Swatch controls inside a group, both unselected and selected kinds
    pub swatch: String,
    pub swatch_image: String,
    pub swatch_label_attribute: String,
}

impl Default for ExtractionSelectors {
    fn default() -> Self {
        Self {
            price: vec![FieldRule::text("span.css-18jtttk > b.css-0")],
            name: vec![
                FieldRule::text("[data-at=\"product_name\"]"),
                FieldRule::attribute("meta[property=\"og:title\"]", "content"),
                FieldRule::text("h1"),
            ],
            brand: vec![
                FieldRule::text("a[data-at=\"brand_name\"]"),
                FieldRule::text("a[href*=\"/brand/\"]"),
            ],
            add_to_basket_button: "button[data-at=\"add_to_basket_btn\"]".to_string(),
            add_to_basket_text: "span".to_string(),
            add_to_basket_phrase: "Add to Basket".to_string(),
            // The live markup renders data-comp="SwatchGroup " with a trailing space
            swatch_group: "[data-comp~=\"SwatchGroup\"]".to_string(),
            swatch: "button[data-at=\"swatch\"], button[data-at=\"selected_swatch\"]".to_string(),
            swatch_image: "img".to_string(),
            swatch_label_attribute: "aria-label".to_string(),
        }
    }
}
