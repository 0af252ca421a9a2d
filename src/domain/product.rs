use serde::{Deserialize, Serialize};

/// Display name used when a page carries no recognizable product name
pub const DEFAULT_PRODUCT_NAME: &str = "Sephora Product";

/// Structured fields extracted from a single product page.
///
/// Every field is optional: a page that lacks a price or brand is still a
/// valid extraction, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub url: String,
    pub price: Option<String>,
    pub in_stock: Option<bool>,
    pub name: Option<String>,
    pub brand: Option<String>,
}

impl ExtractionResult {
    /// Attach the source URL to a result produced from markup alone
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// One selectable product variant (color, size) found on a product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantResult {
    pub sku: String,
    pub name: String,
    pub url: String,
    pub image_url: String,
}

/// Outcome of the variant workflow for one product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantReport {
    /// URL that was fetched
    pub source_url: String,
    /// Source URL with query and fragment removed; variant URLs hang off it
    pub base_url: String,
    pub product_name: String,
    /// Variants in document order; empty means "no variants found"
    pub variants: Vec<VariantResult>,
}

impl VariantReport {
    pub fn found(&self) -> bool {
        !self.variants.is_empty()
    }

    pub fn total(&self) -> usize {
        self.variants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_result_serializes_camel_case_with_nulls() {
        let result = ExtractionResult {
            url: "https://example.com/p".to_string(),
            price: Some("$10.00".to_string()),
            in_stock: Some(true),
            name: None,
            brand: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["inStock"], serde_json::json!(true));
        assert_eq!(json["price"], serde_json::json!("$10.00"));
        assert!(json["name"].is_null());
        assert!(json["brand"].is_null());
    }

    #[test]
    fn variant_report_found() {
        let report = VariantReport {
            source_url: "https://example.com/p?skuId=1".to_string(),
            base_url: "https://example.com/p".to_string(),
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            variants: vec![],
        };
        assert!(!report.found());
        assert_eq!(report.total(), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["productName"], serde_json::json!("Sephora Product"));
    }
}
