//! Variant discovery for a single product page

use tracing::info;

use super::fetcher::{FetchError, PageFetcher};
use crate::domain::VariantReport;
use crate::infrastructure::parsing::{ProductExtractor, default_extractor, sku::base_url};

/// Fetch `url` once and list its variants with the default selectors.
///
/// A page without variants is `Ok` with an empty list; only a failed fetch
/// is an error.
pub async fn scrape_variants(fetcher: &dyn PageFetcher, url: &str) -> Result<VariantReport, FetchError> {
    scrape_variants_with(fetcher, default_extractor(), url).await
}

pub async fn scrape_variants_with(
    fetcher: &dyn PageFetcher,
    extractor: &ProductExtractor,
    url: &str,
) -> Result<VariantReport, FetchError> {
    let markup = fetcher.fetch(url).await?;
    let base = base_url(url);

    let report = VariantReport {
        source_url: url.to_string(),
        base_url: base.to_string(),
        product_name: extractor.extract_product_name(&markup),
        variants: extractor.extract_variants(&markup, base),
    };

    if report.found() {
        info!("Found {} variants for {}", report.total(), url);
    } else {
        info!("No variants found for {}", url);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawling::fetcher::FnFetcher;
    use crate::domain::DEFAULT_PRODUCT_NAME;

    const PAGE: &str = r#"<html><body>
        <h1>Lip Tint</h1>
        <div data-comp="SwatchGroup ">
            <button data-at="selected_swatch" aria-label="Rose - Selected">
                <img src="https://cdn.example.com/productimages/sku/s1111111-main-grid.jpg">
            </button>
            <button data-at="swatch" aria-label="Coral">
                <img src="https://cdn.example.com/productimages/sku/s2222222-main-grid.jpg">
            </button>
        </div>
    </body></html>"#;

    #[tokio::test]
    async fn variants_use_the_base_url() {
        let fetcher = FnFetcher::new(|_url: String| async move { Ok(PAGE.to_string()) });

        let report = scrape_variants(&fetcher, "https://www.sephora.com/product/tint-P1?skuId=1111111&icid2=x")
            .await
            .unwrap();

        assert_eq!(report.base_url, "https://www.sephora.com/product/tint-P1");
        assert_eq!(report.product_name, "Lip Tint");
        assert_eq!(report.total(), 2);
        assert_eq!(report.variants[0].name, "Rose");
        assert_eq!(
            report.variants[1].url,
            "https://www.sephora.com/product/tint-P1?skuId=2222222"
        );
    }

    #[tokio::test]
    async fn no_variants_is_not_an_error() {
        let fetcher = FnFetcher::new(|_url: String| async move { Ok("<html><body></body></html>".to_string()) });

        let report = scrape_variants(&fetcher, "https://www.sephora.com/product/p2").await.unwrap();

        assert!(!report.found());
        assert_eq!(report.product_name, DEFAULT_PRODUCT_NAME);
    }

    #[tokio::test]
    async fn fetch_failure_is_an_error() {
        let fetcher = FnFetcher::new(|_url: String| async move { Err::<String, _>(FetchError::Timeout { seconds: 60 }) });

        let err = scrape_variants(&fetcher, "https://www.sephora.com/product/p3").await.unwrap_err();
        assert!(err.is_timeout());
    }
}
