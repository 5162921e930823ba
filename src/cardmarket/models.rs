//! Data models for resolved cards, fetched pages, and page classification.

use serde::{Deserialize, Serialize};

/// Placeholder for any field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder name when the product heading is missing.
pub const NAME_NOT_FOUND: &str = "Name not found";

/// A resolved card with its price summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardData {
    /// Product name from the page heading
    pub name: String,
    /// Absolute image URL, or empty when no candidate matched
    pub image_url: String,
    /// Price summary
    pub price: CardPrice,
}

impl CardData {
    /// Returns true if an image URL was found.
    pub fn has_image(&self) -> bool {
        !self.image_url.is_empty()
    }
}

/// Display strings for the three price fields shown on a product page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPrice {
    /// Lowest listed offer ("From")
    pub from: String,
    /// Price trend
    pub trend: String,
    /// 30-days average price
    pub avg30: String,
}

impl CardPrice {
    /// A price with every field set to the sentinel.
    pub fn unavailable() -> Self {
        Self {
            from: NOT_AVAILABLE.to_string(),
            trend: NOT_AVAILABLE.to_string(),
            avg30: NOT_AVAILABLE.to_string(),
        }
    }

    /// Returns true if neither of the two most reliable fields was found.
    pub fn is_missing_core_fields(&self) -> bool {
        self.from == NOT_AVAILABLE && self.trend == NOT_AVAILABLE
    }
}

impl Default for CardPrice {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// Raw markup plus the URL it was actually served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub html: String,
    pub url: String,
}

impl FetchResult {
    pub fn new(html: impl Into<String>, url: impl Into<String>) -> Self {
        Self { html: html.into(), url: url.into() }
    }
}

/// What kind of page a fetch landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageClassification {
    /// A single product with price data.
    ProductPage,
    /// A listing; carries the href of the first product link.
    SearchResultsPage(String),
    /// The marketplace reported no matches.
    NoResultsPage,
    /// A search page with nothing to follow.
    UnknownPage,
}
