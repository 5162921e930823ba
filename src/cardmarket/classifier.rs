//! Page-type classification for fetched Cardmarket pages.

use crate::cardmarket::models::PageClassification;
use crate::cardmarket::selectors::search;
use crate::cardmarket::urls::is_search_url;
use scraper::Html;
use tracing::debug;

/// Returns the trimmed `<title>` text, or an empty string when absent.
pub fn title_of(html: &str) -> String {
    let document = Html::parse_document(html);
    document_title(&document)
}

fn document_title(document: &Html) -> String {
    document
        .select(&search::TITLE)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Classifies a page from its markup and title.
///
/// The listing-link check runs before the title heuristic, since product
/// pages may carry "Search" in unrelated text.
pub fn classify(html: &str, title: &str) -> PageClassification {
    let document = Html::parse_document(html);
    classify_document(&document, title)
}

/// Classifies an already-parsed document.
pub fn classify_document(document: &Html, title: &str) -> PageClassification {
    if has_no_results_marker(document) {
        debug!("Classified as no-results page");
        return PageClassification::NoResultsPage;
    }

    if let Some(link) = first_product_link(document) {
        debug!("Classified as search results page, first product: {}", link);
        return PageClassification::SearchResultsPage(link);
    }

    if title.to_lowercase().contains("search") {
        debug!("Classified as unknown search page (title: {})", title);
        return PageClassification::UnknownPage;
    }

    PageClassification::ProductPage
}

/// Returns true if the no-results marker element is present.
pub fn has_no_results_marker(document: &Html) -> bool {
    document.select(&search::NO_RESULTS).next().is_some()
}

/// Finds the first product link inside a results listing.
fn first_product_link(document: &Html) -> Option<String> {
    document
        .select(&search::LISTING)
        .flat_map(|listing| listing.select(&search::PRODUCT_LINK))
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty() && !is_search_url(href))
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_of() {
        let html = "<html><head><title>  Pikachu | Cardmarket </title></head></html>";
        assert_eq!(title_of(html), "Pikachu | Cardmarket");
        assert_eq!(title_of("<html><body></body></html>"), "");
    }

    #[test]
    fn test_classify_no_results() {
        let html = r#"<html><body>
            <p class="no-results-text">Sorry, no matches for your query</p>
            <dl><dt>From</dt><dd>0,02 €</dd></dl>
        </body></html>"#;
        assert_eq!(classify(html, "Search | Cardmarket"), PageClassification::NoResultsPage);
    }

    #[test]
    fn test_classify_no_results_beats_listing() {
        let html = r#"<html><body>
            <p class="no-results-text">Nothing</p>
            <div class="table-body"><a href="/en/Pokemon/Products/Singles/A/B">B</a></div>
        </body></html>"#;
        assert_eq!(classify(html, ""), PageClassification::NoResultsPage);
    }

    #[test]
    fn test_classify_search_results() {
        let html = r#"<html><body>
            <div class="table-body">
                <div class="row"><a href="/en/Pokemon/Products/Singles/Pokemon-Card-151/Charizard-ex-V1-sv2a182">Charizard ex</a></div>
                <div class="row"><a href="/en/Pokemon/Products/Singles/Pokemon-Card-151/Charizard-ex-V2-sv2a201">Charizard ex</a></div>
            </div>
        </body></html>"#;
        assert_eq!(
            classify(html, "Search results | Cardmarket"),
            PageClassification::SearchResultsPage(
                "/en/Pokemon/Products/Singles/Pokemon-Card-151/Charizard-ex-V1-sv2a182".to_string()
            )
        );
    }

    #[test]
    fn test_classify_ignores_links_outside_listing() {
        let html = r#"<html><body>
            <nav><a href="/en/Pokemon/Products/Singles/A/B">B</a></nav>
            <h1>Charizard ex</h1>
        </body></html>"#;
        assert_eq!(classify(html, "Charizard ex | Cardmarket"), PageClassification::ProductPage);
    }

    #[test]
    fn test_classify_skips_search_links_in_listing() {
        let html = r#"<html><body>
            <div class="table-body">
                <a href="/en/Pokemon/Products/Search?searchString=/Products/Singles/">More</a>
            </div>
        </body></html>"#;
        assert_eq!(classify(html, "Search | Cardmarket"), PageClassification::UnknownPage);
    }

    #[test]
    fn test_classify_ambiguous_title() {
        let html = "<html><body><div class=\"table-body\"></div></body></html>";
        assert_eq!(classify(html, "Search | Cardmarket"), PageClassification::UnknownPage);
        assert_eq!(classify(html, "SEARCH"), PageClassification::UnknownPage);
    }

    #[test]
    fn test_classify_product_page() {
        let html = r#"<html><body>
            <h1>Charizard ex</h1>
            <dl><dt>From</dt><dd>3,00 €</dd></dl>
        </body></html>"#;
        assert_eq!(classify(html, "Charizard ex | Cardmarket"), PageClassification::ProductPage);
    }
}
