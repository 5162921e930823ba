//! Tag resolution pipeline: fetch, classify, follow one search hop, extract.

use crate::cardmarket::classifier::{classify, title_of};
use crate::cardmarket::fetcher::PageFetcher;
use crate::cardmarket::models::{CardData, FetchResult, PageClassification};
use crate::cardmarket::parser::Parser;
use crate::cardmarket::urls::{absolutize_link, search_url_for, BASE_URL};
use crate::error::ResolutionError;
use tracing::{debug, info, warn};

/// Resolves tags into card data using an injected page fetcher.
pub struct Resolver<F> {
    fetcher: F,
    base_url: String,
    parser: Parser,
}

impl<F: PageFetcher> Resolver<F> {
    /// Creates a resolver against the live marketplace.
    pub fn new(fetcher: F) -> Self {
        Self::with_base_url(fetcher, BASE_URL)
    }

    /// Creates a resolver against a custom origin (for testing).
    pub fn with_base_url(fetcher: F, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let parser = Parser::new(base_url.clone());
        Self { fetcher, base_url, parser }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Resolves a tag into one card, or one classified error.
    pub async fn resolve(&self, tag: &str) -> Result<CardData, ResolutionError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ResolutionError::InvalidInput);
        }

        info!("Resolving tag: {}", tag);

        let url = search_url_for(&self.base_url, tag);
        let page = self.fetcher.fetch(&url).await?;

        match self.classify(&page) {
            PageClassification::NoResultsPage => Err(ResolutionError::NotFound),
            PageClassification::UnknownPage => Err(ResolutionError::AmbiguousTag),
            PageClassification::ProductPage => self.parser.extract(&page.html),
            PageClassification::SearchResultsPage(link) => {
                let product_url = absolutize_link(&page.url, &link);
                info!("Following first search result: {}", product_url);

                let product = self.fetcher.fetch(&product_url).await?;
                match self.classify(&product) {
                    PageClassification::ProductPage => self.parser.extract(&product.html),
                    other => {
                        // Only one hop is followed
                        warn!("Followed result is not a product page: {:?}", other);
                        Err(ResolutionError::Extraction(format!(
                            "followed search result did not land on a product page ({})",
                            product.url
                        )))
                    }
                }
            }
        }
    }

    fn classify(&self, page: &FetchResult) -> PageClassification {
        let classification = classify(&page.html, &title_of(&page.html));
        debug!("{} classified as {:?}", page.url, classification);
        classification
    }
}
