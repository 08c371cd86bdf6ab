use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extractor::ExtractionResult;
use crate::models::{PricePoint, generate_id};

/// A tracked product page.
///
/// `(owner, url)` is the product's identity: at most one record exists per
/// owner per URL, with `owner` left empty in single-tenant deployments.
/// `price_history` is seeded with one entry at creation and only ever appended
/// to; `current_price` always equals the price of the last history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub owner: Option<String>,
    pub url: String,
    pub title: String,
    pub image: String,
    pub site: String,
    pub current_price: Decimal,
    pub price_history: Vec<PricePoint>,
    pub last_checked: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creation path: seeds the history with exactly the first observation.
    pub fn new(
        owner: Option<String>,
        url: String,
        result: &ExtractionResult,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(),
            owner,
            url,
            title: result
                .title
                .clone()
                .unwrap_or_else(|| "Unknown Product".to_string()),
            image: result.image_or_placeholder(),
            site: result.site.clone(),
            current_price: result.price,
            price_history: vec![PricePoint::new(result.price, now)],
            last_checked: now,
            created_at: now,
        }
    }

    pub fn latest_price(&self) -> Option<&PricePoint> {
        self.price_history.last()
    }
}
