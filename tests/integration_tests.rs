use std::sync::Arc;

use rust_decimal::Decimal;
use std::str::FromStr;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricepulse::AppError;
use pricepulse::config::ScraperConfig;
use pricepulse::extractor::Extractor;
use pricepulse::fetch::FetchClient;
use pricepulse::scheduler::{BatchSummary, run_batch};
use pricepulse::store::SqliteStore;
use pricepulse::tracker::ProductTracker;

fn test_scraper_config() -> ScraperConfig {
    ScraperConfig {
        retry_attempts: 3,
        retry_delay_ms: 10,
        request_timeout: 5,
        ..ScraperConfig::default()
    }
}

async fn build_tracker() -> Arc<ProductTracker> {
    let store = Arc::new(SqliteStore::connect("sqlite::memory:", 1).await.unwrap());
    let fetcher = Arc::new(FetchClient::new(test_scraper_config()).unwrap());
    Arc::new(ProductTracker::new(store, Extractor::new(fetcher)))
}

fn product_page(title: &str, price: &str) -> String {
    format!(
        r#"<html>
            <head>
                <title>{title}</title>
                <meta property="og:image" content="https://cdn.example.com/{title}.jpg">
            </head>
            <body><div class="product-price">Rs. {price}</div></body>
        </html>"#
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn track_then_recheck_records_price_drop() {
    let server = MockServer::start().await;
    let tracker = build_tracker().await;
    let url = format!("{}/product/x", server.uri());

    mount_page(&server, "/product/x", product_page("Gaming Mouse", "5,000")).await;

    let outcome = tracker.track(None, &url).await.unwrap();
    assert!(outcome.created);
    assert_eq!(
        outcome.product.current_price,
        Decimal::from_str("5000").unwrap()
    );
    assert_eq!(outcome.product.price_history.len(), 1);
    assert_eq!(outcome.product.title, "Gaming Mouse");
    assert_eq!(
        outcome.product.image,
        "https://cdn.example.com/Gaming Mouse.jpg"
    );

    // The shop drops the price
    server.reset().await;
    mount_page(&server, "/product/x", product_page("Gaming Mouse", "4,500")).await;

    let mut product = outcome.product;
    let changed = tracker.recheck(&mut product).await.unwrap();

    assert!(changed);
    assert_eq!(product.price_history.len(), 2);
    assert_eq!(product.current_price, Decimal::from_str("4500").unwrap());

    // A second recheck at the same price changes nothing
    let changed = tracker.recheck(&mut product).await.unwrap();
    assert!(!changed);
    assert_eq!(product.price_history.len(), 2);
}

#[tokio::test]
async fn duplicate_track_returns_existing_product() {
    let server = MockServer::start().await;
    let tracker = build_tracker().await;
    let url = format!("{}/product/x", server.uri());

    mount_page(&server, "/product/x", product_page("Gaming Mouse", "5,000")).await;

    let first = tracker.track(None, &url).await.unwrap();
    let second = tracker.track(None, &url).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.product.id, second.product.id);
    assert_eq!(tracker.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn page_without_price_surfaces_not_found() {
    let server = MockServer::start().await;
    let tracker = build_tracker().await;
    let url = format!("{}/product/blank", server.uri());

    // A page with no price is a successful fetch; only one request may land
    Mock::given(method("GET"))
        .and(path("/product/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Mystery Item</title></head><body></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = tracker.track(None, &url).await.unwrap_err();
    assert!(matches!(err, AppError::PriceNotFound { .. }));
    assert!(tracker.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    let tracker = build_tracker().await;
    let url = format!("{}/product/flaky", server.uri());

    // First two attempts fail at the transport level, the third sees the page
    Mock::given(method("GET"))
        .and(path("/product/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_page(&server, "/product/flaky", product_page("Keyboard", "9,900")).await;

    let outcome = tracker.track(None, &url).await.unwrap();
    assert!(outcome.created);
    assert_eq!(
        outcome.product.current_price,
        Decimal::from_str("9900").unwrap()
    );
}

#[tokio::test]
async fn dead_server_exhausts_attempts_and_reports_unreachable() {
    let server = MockServer::start().await;
    let tracker = build_tracker().await;
    let url = format!("{}/product/dead", server.uri());

    Mock::given(method("GET"))
        .and(path("/product/dead"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3) // all attempts land here, none succeed
        .mount(&server)
        .await;

    let err = tracker.track(None, &url).await.unwrap_err();
    match err {
        AppError::Unreachable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[tokio::test]
async fn recheck_batch_isolates_failures_and_leaves_failed_items_untouched() {
    let server = MockServer::start().await;
    let tracker = build_tracker().await;
    let good_url = format!("{}/product/good", server.uri());
    let bad_url = format!("{}/product/bad", server.uri());

    mount_page(&server, "/product/good", product_page("Good Item", "1,000")).await;
    mount_page(&server, "/product/bad", product_page("Bad Item", "2,000")).await;

    tracker.track(None, &good_url).await.unwrap();
    tracker.track(None, &bad_url).await.unwrap();

    // The bad item's page goes away; the good one gets cheaper
    server.reset().await;
    mount_page(&server, "/product/good", product_page("Good Item", "900")).await;
    Mock::given(method("GET"))
        .and(path("/product/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let summary = run_batch(Arc::clone(&tracker), 2).await;
    assert_eq!(
        summary,
        BatchSummary {
            total: 2,
            changed: 1,
            failed: 1
        }
    );

    let products = tracker.list().await.unwrap();
    let good = products.iter().find(|p| p.url == good_url).unwrap();
    let bad = products.iter().find(|p| p.url == bad_url).unwrap();

    assert_eq!(good.current_price, Decimal::from_str("900").unwrap());
    assert_eq!(good.price_history.len(), 2);

    assert_eq!(bad.current_price, Decimal::from_str("2000").unwrap());
    assert_eq!(bad.price_history.len(), 1);

    // The next run is independent: the bad page comes back with a new price
    server.reset().await;
    mount_page(&server, "/product/good", product_page("Good Item", "900")).await;
    mount_page(&server, "/product/bad", product_page("Bad Item", "1,800")).await;

    let summary = run_batch(Arc::clone(&tracker), 2).await;
    assert_eq!(
        summary,
        BatchSummary {
            total: 2,
            changed: 1,
            failed: 0
        }
    );

    let bad = tracker
        .list()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.url == bad_url)
        .unwrap();
    assert_eq!(bad.current_price, Decimal::from_str("1800").unwrap());
    assert_eq!(bad.price_history.len(), 2);
}
