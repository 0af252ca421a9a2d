//! Product page extraction
//!
//! Each field walks its own fallback chain; the first rule that yields a
//! non-empty value wins and later rules are skipped. Missing fields are
//! `None`, never errors.
//!
//! Stock detection is deliberately permissive: the product counts as in stock
//! when EITHER an add-to-basket control exists OR some text element reads
//! "Add to Basket". A page that renders that phrase for an unavailable item
//! is reported as in stock. This is a known limitation of the heuristic.

use tracing::debug;

use super::config::{ExtractionSelectors, FieldRule};
use super::document::{DocumentQuery, HtmlDocument, NodeQuery, Pattern};
use super::sku::{sku_from_image_url, strip_selected_suffix, variant_url};
use super::{ParsingError, ParsingResult};
use crate::domain::{DEFAULT_PRODUCT_NAME, ExtractionResult, VariantResult};

/// A fallback rule with its selector compiled
#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Pattern,
    attribute: Option<String>,
}

impl CompiledRule {
    fn read<D: DocumentQuery>(&self, doc: &D) -> Option<String> {
        let node = doc.find_first(&self.pattern)?;
        let value = match &self.attribute {
            Some(name) => node.attribute(name).map(|v| v.trim().to_string())?,
            None => node.text_content(),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Extractor for product pages, with every configured selector compiled once
#[derive(Debug, Clone)]
pub struct ProductExtractor {
    price_rules: Vec<CompiledRule>,
    name_rules: Vec<CompiledRule>,
    brand_rules: Vec<CompiledRule>,

    add_to_basket_button: Pattern,
    add_to_basket_text: Pattern,
    add_to_basket_phrase: String,

    swatch_group: Pattern,
    swatch: Pattern,
    swatch_image: Pattern,
    swatch_label_attribute: String,
}

impl ProductExtractor {
    /// Create an extractor with the default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_selectors(&ExtractionSelectors::default())
    }

    /// Create an extractor with custom selectors
    pub fn with_selectors(selectors: &ExtractionSelectors) -> ParsingResult<Self> {
        Ok(Self {
            price_rules: Self::compile_rules("price", &selectors.price)?,
            name_rules: Self::compile_rules("name", &selectors.name)?,
            brand_rules: Self::compile_rules("brand", &selectors.brand)?,
            add_to_basket_button: Self::compile("add_to_basket_button", &selectors.add_to_basket_button)?,
            add_to_basket_text: Self::compile("add_to_basket_text", &selectors.add_to_basket_text)?,
            add_to_basket_phrase: selectors.add_to_basket_phrase.to_lowercase(),
            swatch_group: Self::compile("swatch_group", &selectors.swatch_group)?,
            swatch: Self::compile("swatch", &selectors.swatch)?,
            swatch_image: Self::compile("swatch_image", &selectors.swatch_image)?,
            swatch_label_attribute: selectors.swatch_label_attribute.clone(),
        })
    }

    fn compile(field: &str, selector: &str) -> ParsingResult<Pattern> {
        Pattern::parse(selector).map_err(|e| match e {
            ParsingError::InvalidPattern { reason, .. } => {
                ParsingError::invalid_selector(field, selector, reason)
            }
            other => other,
        })
    }

    fn compile_rules(field: &str, rules: &[FieldRule]) -> ParsingResult<Vec<CompiledRule>> {
        rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    pattern: Self::compile(field, &rule.selector)?,
                    attribute: rule.attribute.clone(),
                })
            })
            .collect()
    }

    /// Extract price, name, brand and stock status from raw markup.
    ///
    /// The returned `url` is empty; callers attach it with
    /// [`ExtractionResult::with_url`].
    pub fn extract_product(&self, markup: &str) -> ExtractionResult {
        self.extract_product_from(&HtmlDocument::parse(markup))
    }

    pub fn extract_product_from<D: DocumentQuery>(&self, doc: &D) -> ExtractionResult {
        let price = Self::first_value(doc, "price", &self.price_rules);
        let name = Self::first_value(doc, "name", &self.name_rules);
        let brand = Self::first_value(doc, "brand", &self.brand_rules);
        let in_stock = self.detect_in_stock(doc);

        ExtractionResult {
            url: String::new(),
            price,
            in_stock: Some(in_stock),
            name,
            brand,
        }
    }

    /// Product display name, falling back to a placeholder
    pub fn extract_product_name(&self, markup: &str) -> String {
        self.extract_product_name_from(&HtmlDocument::parse(markup))
    }

    pub fn extract_product_name_from<D: DocumentQuery>(&self, doc: &D) -> String {
        Self::first_value(doc, "name", &self.name_rules)
            .unwrap_or_else(|| DEFAULT_PRODUCT_NAME.to_string())
    }

    /// Every well-formed swatch of every variant group, in document order
    pub fn extract_variants(&self, markup: &str, base_url: &str) -> Vec<VariantResult> {
        self.extract_variants_from(&HtmlDocument::parse(markup), base_url)
    }

    pub fn extract_variants_from<D: DocumentQuery>(&self, doc: &D, base_url: &str) -> Vec<VariantResult> {
        doc.find_all(&self.swatch_group)
            .into_iter()
            .flat_map(|group| group.find_all_within(&self.swatch))
            .filter_map(|swatch| self.read_swatch(swatch, base_url))
            .collect()
    }

    fn read_swatch<'a, N: NodeQuery<'a>>(&self, swatch: N, base_url: &str) -> Option<VariantResult> {
        let Some(image) = swatch.find_first_within(&self.swatch_image) else {
            debug!("Skipping swatch without image");
            return None;
        };
        let image_url = image.attribute("src").map(str::trim).filter(|src| !src.is_empty());
        let label = swatch
            .attribute(&self.swatch_label_attribute)
            .map(str::trim)
            .filter(|label| !label.is_empty());

        let (Some(image_url), Some(label)) = (image_url, label) else {
            debug!("Skipping swatch missing image source or label");
            return None;
        };
        let Some(sku) = sku_from_image_url(image_url) else {
            debug!("Skipping swatch without SKU in image URL: {}", image_url);
            return None;
        };

        Some(VariantResult {
            url: variant_url(base_url, &sku),
            name: strip_selected_suffix(label).to_string(),
            image_url: image_url.to_string(),
            sku,
        })
    }

    fn first_value<D: DocumentQuery>(doc: &D, field: &str, rules: &[CompiledRule]) -> Option<String> {
        for (i, rule) in rules.iter().enumerate() {
            if let Some(value) = rule.read(doc) {
                debug!("Extracted {} using rule {} ({}): {}", field, i, rule.pattern.as_str(), value);
                return Some(value);
            }
        }
        debug!("No value for {} after {} rules", field, rules.len());
        None
    }

    fn detect_in_stock<D: DocumentQuery>(&self, doc: &D) -> bool {
        let has_button = doc.exists(&self.add_to_basket_button);
        let has_text = doc
            .find_all(&self.add_to_basket_text)
            .iter()
            .any(|node| node.text_content().to_lowercase().contains(&self.add_to_basket_phrase));

        debug!("Stock detection: button={}, text={}", has_button, has_text);
        has_button || has_text
    }
}
