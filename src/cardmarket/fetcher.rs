//! Page fetching: the shared contract and the plain-HTTP strategy.

use crate::cardmarket::models::FetchResult;
use crate::config::Config;
use crate::error::ResolutionError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Desktop browser identity; Cardmarket blocks default client identifiers.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36";

pub const REFERER: &str = "https://www.google.com";

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const MAX_REDIRECTS: usize = 10;

/// Trait for page fetching strategies - enables mocking for tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a URL and returns its markup along with the final URL.
    async fn fetch(&self, url: &str) -> Result<FetchResult, ResolutionError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Box<T> {
    async fn fetch(&self, url: &str) -> Result<FetchResult, ResolutionError> {
        (**self).fetch(url).await
    }
}

/// Plain HTTP GET with spoofed browser headers.
pub struct DirectFetcher {
    client: Client,
    timeout: Duration,
}

impl DirectFetcher {
    /// Creates a direct fetcher from the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_timeout(Duration::from_secs(config.request_timeout_secs), config.proxy.as_deref())
    }

    /// Creates a direct fetcher with an explicit request timeout.
    pub fn with_timeout(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            // Single-match searches redirect straight to the product page
            .redirect(wreq::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(proxy_url) = proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self { client, timeout })
    }

    fn classify_transport_error(&self, error: wreq::Error) -> ResolutionError {
        if error.is_timeout() {
            ResolutionError::timeout(self.timeout)
        } else {
            ResolutionError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for DirectFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult, ResolutionError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("User-Agent", USER_AGENT)
            .header("Referer", REFERER)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            if status == 403 || status == 429 {
                warn!("Blocked by Cardmarket ({}). Try the rendered fetcher or a proxy.", status);
            }
            return Err(ResolutionError::Http { status: status.as_u16() });
        }

        let final_url = response.uri().to_string();
        let html = response.text().await.map_err(|e| self.classify_transport_error(e))?;

        if html.trim().is_empty() {
            return Err(ResolutionError::EmptyBody);
        }

        Ok(FetchResult::new(html, final_url))
    }
}
