use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::models::{PricePoint, Product};
use crate::utils::error::{AppError, Result};

/// Persistence seam for tracked products. The core never retries store
/// failures; they propagate as `AppError::Database`.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn find_by_identity(&self, owner: Option<&str>, url: &str) -> Result<Option<Product>>;
    async fn create(&self, product: &Product) -> Result<()>;
    async fn save(&self, product: &Product) -> Result<()>;
    async fn list_all(&self) -> Result<Vec<Product>>;
    /// Idempotent: deleting an unknown id is not an error.
    async fn delete_by_id(&self, id: &str) -> Result<()>;
}

// Price history is embedded as a JSON column so ordering survives storage
// untouched. Absent owners are stored as '' rather than NULL: SQLite treats
// NULLs as distinct in unique indexes, which would break per-URL uniqueness
// for single-tenant deployments.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    owner TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    image TEXT NOT NULL,
    site TEXT NOT NULL,
    current_price TEXT NOT NULL,
    price_history TEXT NOT NULL,
    last_checked TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(owner, url)
)
"#;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(AppError::Database)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::query(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn find_by_identity(&self, owner: Option<&str>, url: &str) -> Result<Option<Product>> {
        let row = sqlx::query("SELECT * FROM products WHERE owner = ? AND url = ?")
            .bind(owner.unwrap_or(""))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_product).transpose()
    }

    async fn create(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, owner, url, title, image, site, current_price, price_history, last_checked, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(product.owner.as_deref().unwrap_or(""))
        .bind(&product.url)
        .bind(&product.title)
        .bind(&product.image)
        .bind(&product.site)
        .bind(product.current_price.to_string())
        .bind(serde_json::to_string(&product.price_history)?)
        .bind(product.last_checked)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET title = ?, image = ?, site = ?, current_price = ?, price_history = ?, last_checked = ?
            WHERE id = ?
            "#,
        )
        .bind(&product.title)
        .bind(&product.image)
        .bind(&product.site)
        .bind(product.current_price.to_string())
        .bind(serde_json::to_string(&product.price_history)?)
        .bind(product.last_checked)
        .bind(&product.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query("SELECT * FROM products ORDER BY last_checked DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_product).collect()
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_product(row: SqliteRow) -> Result<Product> {
    let owner: String = row.try_get("owner")?;
    let price_text: String = row.try_get("current_price")?;
    let history_json: String = row.try_get("price_history")?;

    let current_price = Decimal::from_str(&price_text)
        .map_err(|e| AppError::Internal(format!("corrupt price column: {e}")))?;
    let price_history: Vec<PricePoint> = serde_json::from_str(&history_json)?;
    let last_checked: DateTime<Utc> = row.try_get("last_checked")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(Product {
        id: row.try_get("id")?,
        owner: (!owner.is_empty()).then_some(owner),
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        image: row.try_get("image")?,
        site: row.try_get("site")?,
        current_price,
        price_history,
        last_checked,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractionResult;

    async fn memory_store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    fn sample_product(url: &str, owner: Option<&str>) -> Product {
        let result = ExtractionResult {
            title: Some("Gaming Mouse".to_string()),
            price: Decimal::from_str("5000").unwrap(),
            image: Some("https://wasi.lk/img/mouse.jpg".to_string()),
            site: "Wasi.lk".to_string(),
        };
        Product::new(owner.map(str::to_string), url.to_string(), &result, Utc::now())
    }

    #[tokio::test]
    async fn test_create_and_find_roundtrip() {
        let store = memory_store().await;
        let product = sample_product("https://wasi.lk/product/x", None);

        store.create(&product).await.unwrap();
        let found = store
            .find_by_identity(None, "https://wasi.lk/product/x")
            .await
            .unwrap()
            .expect("product should exist");

        assert_eq!(found.id, product.id);
        assert_eq!(found.current_price, product.current_price);
        assert_eq!(found.price_history, product.price_history);
        assert_eq!(found.owner, None);
    }

    #[tokio::test]
    async fn test_duplicate_identity_is_rejected() {
        let store = memory_store().await;
        let first = sample_product("https://wasi.lk/product/x", None);
        let second = sample_product("https://wasi.lk/product/x", None);

        store.create(&first).await.unwrap();
        let err = store.create(&second).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_same_url_different_owner_is_allowed() {
        let store = memory_store().await;
        store
            .create(&sample_product("https://wasi.lk/product/x", Some("alice")))
            .await
            .unwrap();
        store
            .create(&sample_product("https://wasi.lk/product/x", Some("bob")))
            .await
            .unwrap();

        let alice = store
            .find_by_identity(Some("alice"), "https://wasi.lk/product/x")
            .await
            .unwrap();
        assert_eq!(alice.unwrap().owner.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_save_persists_history_growth() {
        let store = memory_store().await;
        let mut product = sample_product("https://wasi.lk/product/x", None);
        store.create(&product).await.unwrap();

        product
            .price_history
            .push(PricePoint::new(Decimal::from_str("4500").unwrap(), Utc::now()));
        product.current_price = Decimal::from_str("4500").unwrap();
        store.save(&product).await.unwrap();

        let found = store
            .find_by_identity(None, "https://wasi.lk/product/x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.price_history.len(), 2);
        assert_eq!(found.current_price, Decimal::from_str("4500").unwrap());
        assert_eq!(
            found.current_price,
            found.price_history.last().unwrap().price
        );
    }

    #[tokio::test]
    async fn test_list_all_orders_by_last_checked_desc() {
        let store = memory_store().await;
        let mut older = sample_product("https://wasi.lk/product/a", None);
        older.last_checked = Utc::now() - chrono::Duration::hours(2);
        let newer = sample_product("https://wasi.lk/product/b", None);

        store.create(&older).await.unwrap();
        store.create(&newer).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].url, "https://wasi.lk/product/b");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = memory_store().await;
        let product = sample_product("https://wasi.lk/product/x", None);
        store.create(&product).await.unwrap();

        store.delete_by_id(&product.id).await.unwrap();
        store.delete_by_id(&product.id).await.unwrap(); // second call is a no-op

        assert!(
            store
                .find_by_identity(None, "https://wasi.lk/product/x")
                .await
                .unwrap()
                .is_none()
        );
    }
}
