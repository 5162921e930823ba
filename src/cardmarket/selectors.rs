//! CSS selectors for Cardmarket HTML parsing.
//!
//! This file contains every selector and label the resolver depends on.
//! Update this file when Cardmarket changes their HTML structure.
//!
//! **Update process**: When extraction fails with a selector error, capture
//! the HTML, update selectors, and add a test fixture.

use scraper::Selector;
use std::sync::LazyLock;

/// Selectors for search results and no-results pages.
pub mod search {
    use super::*;

    /// "No results" message.
    pub static NO_RESULTS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".no-results-text").unwrap());

    /// Listing container that holds the result rows.
    pub static LISTING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "#ProductsTable, \
             .table-body, \
             .search-results",
        )
        .unwrap()
    });

    /// Links to single-card product pages.
    pub static PRODUCT_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href*='/Products/Singles/']").unwrap());

    /// Page title.
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
}

/// Selectors for single product pages.
pub mod product {
    use super::*;

    /// Product name heading.
    pub static NAME: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

    /// Label cells of the info list.
    pub static LABEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dt").unwrap());

    /// Inner value span of a price cell.
    pub static VALUE_SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
}

/// A price field located by its label text.
#[derive(Debug, Clone, Copy)]
pub struct PriceLabel {
    /// Text contained in the `dt` label (case-insensitive)
    pub label: &'static str,
    /// Prefer the `span` inside the `dd` over the whole `dd` text
    pub value_in_span: bool,
}

pub const PRICE_FROM: PriceLabel = PriceLabel { label: "From", value_in_span: false };
pub const PRICE_TREND: PriceLabel = PriceLabel { label: "Price Trend", value_in_span: true };
pub const PRICE_AVG30: PriceLabel =
    PriceLabel { label: "30-days average price", value_in_span: true };

/// A candidate location for the card image.
pub struct ImageCandidate {
    /// Human-readable name, used in logs
    pub name: &'static str,
    pub selector: &'static LazyLock<Selector>,
    /// Attribute holding the URL
    pub attr: &'static str,
}

static FRONT_IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img.is-front").unwrap());

static CARD_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        ".card-image img, \
         #image img",
    )
    .unwrap()
});

static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta[property='og:image']").unwrap());

/// Image candidates in priority order; the first acceptable value wins.
pub static IMAGE_CANDIDATES: [ImageCandidate; 3] = [
    ImageCandidate { name: "front image", selector: &FRONT_IMAGE, attr: "src" },
    ImageCandidate { name: "card image", selector: &CARD_IMAGE, attr: "src" },
    ImageCandidate { name: "og:image", selector: &OG_IMAGE, attr: "content" },
];

/// Tokens that identify a lazy-load placeholder instead of a real image.
pub const IMAGE_PLACEHOLDERS: &[&str] =
    &["transparent.gif", "data:image/gif;base64,R0lGODlhAQABA"];

/// Acceptance predicate for image candidates.
pub fn is_acceptable_image(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !IMAGE_PLACEHOLDERS.iter().any(|p| value.contains(p))
}
