//! SKU and variant URL helpers
//!
//! Small string parsers that silently reject malformed input. Patterns:
//! - image URLs carry the SKU as `sku/s<digits>`
//! - product URLs carry the selected SKU in the `skuId` query key
//! - the active swatch label ends in `- Selected`

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Query key that selects a variant on a product page
pub const SKU_QUERY_KEY: &str = "skuId";

static IMAGE_SKU: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sku/s(\d+)").expect("image SKU pattern is valid"));

static SELECTED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*-\s*Selected$").expect("selected suffix pattern is valid"));

/// SKU digits from a swatch image URL, without the leading `s`
pub fn sku_from_image_url(image_url: &str) -> Option<String> {
    IMAGE_SKU
        .captures(image_url)
        .and_then(|captures| captures.get(1))
        .map(|digits| digits.as_str().to_string())
}

/// Numeric `skuId` query value of an absolute product URL
pub fn sku_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == SKU_QUERY_KEY)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()))
}

/// URL with its query string and fragment removed
pub fn base_url(url: &str) -> &str {
    url.find(['?', '#']).map_or(url, |end| &url[..end])
}

/// Canonical URL of one variant: `base` with the SKU query parameter appended
pub fn variant_url(base: &str, sku: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{SKU_QUERY_KEY}={sku}")
}

/// Swatch label without the `- Selected` marker of the active swatch
pub fn strip_selected_suffix(label: &str) -> &str {
    SELECTED_SUFFIX
        .find(label)
        .map_or(label, |suffix| &label[..suffix.start()])
}
