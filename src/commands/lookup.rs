//! Tag lookup command implementation.

use crate::cardmarket::{DirectFetcher, PageFetcher, RenderedFetcher, Resolver, WebDriverContext};
use crate::config::{Config, FetchStrategy};
use crate::format::{Formatter, Outcome};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Rendered output of one or more lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub output: String,
    pub failures: usize,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.failures == 0
    }
}

/// Removes all whitespace from a user-entered tag.
pub fn normalize_tag(tag: &str) -> String {
    tag.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Creates the plain HTTP fetcher described by `config`.
pub fn direct_fetcher(config: &Config) -> Result<DirectFetcher> {
    DirectFetcher::new(config).context("Failed to create HTTP client")
}

/// Opens a WebDriver session and wraps it in a deadline-bounded fetcher.
pub async fn rendered_fetcher(config: &Config) -> Result<RenderedFetcher<WebDriverContext>> {
    let deadline = Duration::from_secs(config.render_timeout_secs);
    let context = WebDriverContext::connect(&config.webdriver_url, deadline).await?;
    Ok(RenderedFetcher::with_timeout(context, deadline))
}

/// Ends the WebDriver session owned by a rendered resolver.
pub async fn close_rendered(resolver: Resolver<RenderedFetcher<WebDriverContext>>) {
    if let Err(e) = resolver.into_fetcher().into_context().close().await {
        warn!("{:#}", e);
    }
}

/// Resolves tags and formats the results.
pub struct LookupCommand {
    config: Config,
}

impl LookupCommand {
    /// Creates a new lookup command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Resolves a single tag with the configured fetcher.
    pub async fn execute(&self, tag: &str) -> Result<Report> {
        self.execute_batch(&[tag.to_string()]).await
    }

    /// Resolves several tags, one after another, with one shared fetcher.
    pub async fn execute_batch(&self, tags: &[String]) -> Result<Report> {
        match self.config.fetcher {
            FetchStrategy::Direct => {
                let resolver = Resolver::new(direct_fetcher(&self.config)?);
                Ok(self.execute_with_resolver(&resolver, tags).await)
            }
            FetchStrategy::Rendered => {
                let resolver = Resolver::new(rendered_fetcher(&self.config).await?);
                let report = self.execute_with_resolver(&resolver, tags).await;
                close_rendered(resolver).await;
                Ok(report)
            }
        }
    }

    /// Resolves tags with a provided resolver (for testing).
    ///
    /// A failing tag is reported in the output and does not stop the batch.
    pub async fn execute_with_resolver<F: PageFetcher>(
        &self,
        resolver: &Resolver<F>,
        tags: &[String],
    ) -> Report {
        let mut outcomes: Vec<Outcome> = Vec::with_capacity(tags.len());

        for tag in tags {
            let tag = normalize_tag(tag);
            info!("Looking up tag: {:?}", tag);

            let result = resolver.resolve(&tag).await;
            if let Err(e) = &result {
                warn!("Lookup of {:?} failed: {}", tag, e);
            }
            outcomes.push((tag, result));
        }

        let failures = outcomes.iter().filter(|(_, r)| r.is_err()).count();
        let formatter = Formatter::new(self.config.format);

        let output = match outcomes.as_slice() {
            [(tag, Ok(card))] => formatter.format_card(tag, card),
            [(tag, Err(e))] => formatter.format_error(tag, e),
            _ => formatter.format_outcomes(&outcomes),
        };

        Report { output, failures }
    }
}
