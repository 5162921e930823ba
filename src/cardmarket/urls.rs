//! Cardmarket URL construction and normalization.

use url::Url;

/// Marketplace origin.
pub const BASE_URL: &str = "https://www.cardmarket.com";

/// Search endpoint path, relative to the origin.
pub const SEARCH_PATH: &str = "/en/Pokemon/Products/Search";

/// Builds the product search URL for a tag against the live marketplace.
pub fn build_search_url(tag: &str) -> String {
    search_url_for(BASE_URL, tag)
}

/// Builds the product search URL for a tag against an arbitrary origin.
pub fn search_url_for(base_url: &str, tag: &str) -> String {
    format!(
        "{}{}?category=-1&searchString={}&searchMode=v1",
        base_url.trim_end_matches('/'),
        SEARCH_PATH,
        urlencoding::encode(tag)
    )
}

/// Resolves an href found on `page_url` into an absolute URL.
pub fn absolutize_link(page_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }

    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}{}", BASE_URL, href),
    }
}

/// Normalizes an image reference into an absolute URL.
///
/// Protocol-relative URLs get `https:`, root-relative URLs get `origin`,
/// anything else passes through unchanged.
pub fn normalize_image_url(origin: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("//") {
        format!("https:{}", raw)
    } else if raw.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), raw)
    } else {
        raw.to_string()
    }
}

/// Returns true if the URL points at a search page rather than a product.
pub fn is_search_url(href: &str) -> bool {
    href.contains("/Products/Search")
}
