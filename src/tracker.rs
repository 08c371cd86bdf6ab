use std::sync::Arc;

use chrono::Utc;
use url::Url;

use crate::extractor::Extractor;
use crate::ledger;
use crate::models::Product;
use crate::store::ProductStore;
use crate::utils::error::{AppError, Result};

#[derive(Debug)]
pub struct TrackOutcome {
    pub product: Product,
    pub created: bool,
}

/// Ties the extraction pipeline to the persistence store: on-demand tracking
/// plus the per-product recheck used by the scheduler.
pub struct ProductTracker {
    store: Arc<dyn ProductStore>,
    extractor: Extractor,
}

impl ProductTracker {
    pub fn new(store: Arc<dyn ProductStore>, extractor: Extractor) -> Self {
        Self { store, extractor }
    }

    /// Starts tracking a product page. A duplicate `(owner, url)` request
    /// short-circuits to the existing product instead of re-extracting.
    pub async fn track(&self, owner: Option<&str>, url: &str) -> Result<TrackOutcome> {
        Url::parse(url).map_err(|e| AppError::InvalidUrl(format!("{url}: {e}")))?;

        if let Some(existing) = self.store.find_by_identity(owner, url).await? {
            tracing::debug!(url, "Already tracked: {}", existing.title);
            return Ok(TrackOutcome {
                product: existing,
                created: false,
            });
        }

        let result = self.extractor.extract(url).await?;
        let product = Product::new(owner.map(str::to_string), url.to_string(), &result, Utc::now());
        self.store.create(&product).await?;

        tracing::info!(url, price = %product.current_price, "Tracking new product: {}", product.title);
        Ok(TrackOutcome {
            product,
            created: true,
        })
    }

    /// Re-runs extraction for an already-tracked product and applies the
    /// ledger update. Returns whether the price changed.
    pub async fn recheck(&self, product: &mut Product) -> Result<bool> {
        let result = self.extractor.extract(&product.url).await?;

        // The caller's copy may be a stale snapshot taken before another
        // recheck of the same product saved. Re-read so that run's appended
        // history entry is not overwritten here.
        if let Some(fresh) = self
            .store
            .find_by_identity(product.owner.as_deref(), &product.url)
            .await?
        {
            *product = fresh;
        }

        let changed = ledger::apply_update(product, &result, Utc::now());
        self.store.save(product).await?;
        Ok(changed)
    }

    pub async fn list(&self) -> Result<Vec<Product>> {
        self.store.list_all().await
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        self.store.delete_by_id(id).await
    }
}
