use std::sync::Arc;

use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::adapters::{ExtractionRule, PLACEHOLDER_IMAGE, SiteAdapter, site_label};
use crate::fetch::PageFetcher;
use crate::normalizer::normalize;
use crate::utils::error::{AppError, Result};

/// What one extraction attempt produced. Transient; only the ledger merges
/// this into a stored product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub title: Option<String>,
    pub price: Decimal,
    pub image: Option<String>,
    pub site: String,
}

impl ExtractionResult {
    pub fn image_or_placeholder(&self) -> String {
        self.image
            .clone()
            .filter(|image| !image.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
    }
}

pub struct Extractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl Extractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetches the page and applies the resolved adapter's rules.
    ///
    /// Fails with `PriceNotFound` when no rule yields a usable price; fetch
    /// failures surface as `Unreachable` from the resilience layer.
    pub async fn extract(&self, url: &str) -> Result<ExtractionResult> {
        let parsed = Url::parse(url).map_err(|e| AppError::InvalidUrl(format!("{url}: {e}")))?;
        let adapter = SiteAdapter::resolve(&parsed);

        let html = self.fetcher.fetch(url, adapter.requires_render()).await?;

        // Parsing stays synchronous; scraper's document type is not Send and
        // must not be held across an await.
        let fields = apply_adapter(&html, adapter);

        let price = normalize(fields.price.as_deref());
        if price.is_zero() {
            return Err(AppError::PriceNotFound {
                url: url.to_string(),
            });
        }

        Ok(ExtractionResult {
            title: fields.title,
            price,
            image: fields.image,
            site: site_label(&parsed),
        })
    }
}

struct RawFields {
    title: Option<String>,
    price: Option<String>,
    image: Option<String>,
}

fn apply_adapter(html: &str, adapter: SiteAdapter) -> RawFields {
    let document = Html::parse_document(html);

    let title = first_match(&document, adapter.title_rules())
        .or_else(|| first_match(&document, adapter.generic_title_rules()));
    let price = first_match(&document, adapter.price_rules())
        .or_else(|| first_match(&document, adapter.generic_price_rules()));
    let image = first_match(&document, adapter.image_rules())
        .or_else(|| first_match(&document, adapter.generic_image_rules()));

    RawFields { title, price, image }
}

fn first_match(document: &Html, rules: &[ExtractionRule]) -> Option<String> {
    rules.iter().find_map(|rule| apply_rule(document, rule))
}

fn apply_rule(document: &Html, rule: &ExtractionRule) -> Option<String> {
    match rule {
        ExtractionRule::Meta(property) => {
            let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
            document
                .select(&selector)
                .next()?
                .value()
                .attr("content")
                .map(|content| content.trim().to_string())
                .filter(|content| !content.is_empty())
        }
        ExtractionRule::Css(css) => {
            let selector = Selector::parse(css).ok()?;
            let element = document.select(&selector).next()?;
            let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
            (!text.is_empty()).then_some(text)
        }
    }
}
