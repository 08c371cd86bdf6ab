use std::ffi::OsStr;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;

use crate::config::ScraperConfig;
use crate::utils::error::{AppError, Result};

/// Content acquisition seam for the extraction pipeline. `render` selects the
/// scripted-browser path over a plain HTTP fetch.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, render: bool) -> Result<String>;
}

/// Runs `action` up to `attempts` times with a fixed delay between tries.
/// Any acquisition context the caller holds outlives every attempt and is
/// released by the caller once, however many tries were needed.
pub(crate) async fn fetch_with_retries<T, F, Fut>(attempts: u32, delay_ms: u64, action: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let strategy = FixedInterval::from_millis(delay_ms).take(attempts.saturating_sub(1) as usize);
    Retry::spawn(strategy, action).await
}

pub struct FetchClient {
    http: reqwest::Client,
    config: ScraperConfig,
}

impl FetchClient {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;

        Ok(Self { http, config })
    }

    async fn fetch_static(&self, url: &str) -> Result<String> {
        let attempt = || async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            Ok(response.text().await?)
        };

        fetch_with_retries(self.config.retry_attempts, self.config.retry_delay_ms, attempt)
            .await
            .map_err(|e| self.unreachable(url, e))
    }

    async fn fetch_rendered(&self, url: &str) -> Result<String> {
        // One browser session per in-flight fetch; navigation is what gets
        // retried, the session is released exactly once when this call returns.
        let browser = Arc::new(self.launch_browser()?);

        let attempt = || {
            let browser = Arc::clone(&browser);
            let url = url.to_string();
            let user_agent = self.config.user_agent.clone();
            let timeout = Duration::from_secs(self.config.request_timeout);
            async move {
                tokio::task::spawn_blocking(move || render_page(&browser, &url, &user_agent, timeout))
                    .await
                    .map_err(|e| AppError::Internal(format!("render task panicked: {e}")))?
            }
        };

        fetch_with_retries(self.config.retry_attempts, self.config.retry_delay_ms, attempt)
            .await
            .map_err(|e| self.unreachable(url, e))
    }

    fn launch_browser(&self) -> Result<Browser> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false) // Often needed in containerized environments
            .args(vec![
                OsStr::new("--no-sandbox"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-extensions"),
                // Price text never needs images or webfonts
                OsStr::new("--blink-settings=imagesEnabled=false"),
                OsStr::new("--disable-remote-fonts"),
            ])
            .build()
            .map_err(|e| AppError::Render(format!("failed to create launch options: {e}")))?;

        if let Some(chrome_path) = &self.config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        Browser::new(launch_options).map_err(|e| AppError::Render(format!("failed to launch browser: {e}")))
    }

    fn unreachable(&self, url: &str, last_error: AppError) -> AppError {
        // PriceNotFound never passes through the retry loop; whatever we saw
        // last here is a fetch-level failure.
        AppError::Unreachable {
            url: url.to_string(),
            attempts: self.config.retry_attempts,
            reason: last_error.to_string(),
        }
    }
}

fn render_page(browser: &Browser, url: &str, user_agent: &str, timeout: Duration) -> Result<String> {
    let tab = browser
        .new_tab()
        .map_err(|e| AppError::Render(format!("failed to create tab: {e}")))?;
    tab.set_default_timeout(timeout);

    tab.set_user_agent(user_agent, None, None)
        .map_err(|e| AppError::Render(format!("failed to set user agent: {e}")))?;

    tab.navigate_to(url)
        .map_err(|e| AppError::Render(format!("navigation failed: {e}")))?;
    tab.wait_until_navigated()
        .map_err(|e| AppError::Render(format!("page load failed: {e}")))?;

    let html = tab
        .get_content()
        .map_err(|e| AppError::Render(format!("failed to get page content: {e}")))?;

    // Close tab to free resources; the browser itself outlives retries
    let _ = tab.close(true);

    Ok(html)
}

#[async_trait]
impl PageFetcher for FetchClient {
    async fn fetch(&self, url: &str, render: bool) -> Result<String> {
        if render {
            self.fetch_rendered(url).await
        } else {
            self.fetch_static(url).await
        }
    }
}
