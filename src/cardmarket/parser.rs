//! HTML parser for Cardmarket product pages.

use crate::cardmarket::classifier::has_no_results_marker;
use crate::cardmarket::models::{CardData, CardPrice, NAME_NOT_FOUND, NOT_AVAILABLE};
use crate::cardmarket::selectors::{
    self, is_acceptable_image, product, PriceLabel, IMAGE_CANDIDATES,
};
use crate::cardmarket::urls::{normalize_image_url, BASE_URL};
use crate::error::ResolutionError;
use scraper::{ElementRef, Html};
use tracing::{debug, trace, warn};

/// Parser for Cardmarket product pages.
pub struct Parser {
    origin: String,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(BASE_URL)
    }
}

impl Parser {
    /// Creates a parser that resolves root-relative URLs against `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self { origin: origin.into() }
    }

    /// Extracts card data from a confirmed product page.
    pub fn extract(&self, html: &str) -> Result<CardData, ResolutionError> {
        let document = Html::parse_document(html);

        let price = CardPrice {
            from: self.parse_price(&document, selectors::PRICE_FROM),
            trend: self.parse_price(&document, selectors::PRICE_TREND),
            avg30: self.parse_price(&document, selectors::PRICE_AVG30),
        };

        if price.is_missing_core_fields() {
            if has_no_results_marker(&document) {
                return Err(ResolutionError::NotFound);
            }
            warn!("No price labels matched on product page");
            return Err(ResolutionError::Extraction(
                "neither 'From' nor 'Price Trend' found".to_string(),
            ));
        }

        let name = self.parse_name(&document);
        let image_url = self.parse_image(&document).unwrap_or_default();

        debug!("Extracted {} (from: {}, trend: {})", name, price.from, price.trend);

        Ok(CardData { name, image_url, price })
    }

    /// Text of the first heading, or the not-found sentinel.
    fn parse_name(&self, document: &Html) -> String {
        document
            .select(&product::NAME)
            .next()
            .map(|e| collapse_whitespace(&e.text().collect::<String>()))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| NAME_NOT_FOUND.to_string())
    }

    /// Walks the image candidates in order and returns the first acceptable URL.
    fn parse_image(&self, document: &Html) -> Option<String> {
        for candidate in &IMAGE_CANDIDATES {
            let value = document
                .select(candidate.selector)
                .filter_map(|e| e.value().attr(candidate.attr))
                .find(|v| is_acceptable_image(v));

            match value {
                Some(raw) => {
                    trace!("Image matched via {}: {}", candidate.name, raw);
                    return Some(normalize_image_url(&self.origin, raw));
                }
                None => trace!("No image via {}", candidate.name),
            }
        }
        None
    }

    /// Reads the value that follows a labelled `dt`, or the sentinel.
    fn parse_price(&self, document: &Html, field: PriceLabel) -> String {
        document
            .select(&product::LABEL)
            .find(|dt| own_text(*dt).to_lowercase().contains(&field.label.to_lowercase()))
            .and_then(next_element_sibling)
            .filter(|dd| dd.value().name() == "dd")
            .and_then(|dd| {
                let value_el = if field.value_in_span {
                    dd.select(&product::VALUE_SPAN).next().unwrap_or(dd)
                } else {
                    dd
                };
                let text = collapse_whitespace(&value_el.text().collect::<String>());
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// Text directly owned by an element, excluding descendants.
fn own_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|node| node.value().as_text().map(|t| String::from(&**t)))
        .collect::<String>()
}

fn next_element_sibling(element: ElementRef) -> Option<ElementRef> {
    element.next_siblings().find_map(ElementRef::wrap)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
