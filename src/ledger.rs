use chrono::{DateTime, Utc};

use crate::extractor::ExtractionResult;
use crate::models::{PricePoint, Product};

/// Merges a fresh extraction result into a tracked product.
///
/// Appends a history entry only when the observed price differs from
/// `current_price`; `last_checked` is refreshed unconditionally. Returns
/// whether the price changed.
pub fn apply_update(product: &mut Product, result: &ExtractionResult, now: DateTime<Utc>) -> bool {
    // Opportunistic refresh; a missing field on a recheck never erases data
    if let Some(title) = result.title.as_deref().filter(|t| !t.is_empty()) {
        product.title = title.to_string();
    }
    if let Some(image) = result.image.as_deref().filter(|i| !i.is_empty()) {
        product.image = image.to_string();
    }
    if !result.site.is_empty() {
        product.site = result.site.clone();
    }

    let changed = result.price != product.current_price;
    if changed {
        product.price_history.push(PricePoint::new(result.price, now));
        product.current_price = result.price;
    }

    product.last_checked = now;
    changed
}
