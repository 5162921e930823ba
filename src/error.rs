//! Classified failures of a single tag resolution.

use std::time::Duration;
use thiserror::Error;

/// Terminal outcome of a failed `resolve` call.
///
/// Every variant carries a human-readable message; none of them are retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Tag was blank or whitespace-only.
    #[error("Please enter a tag first.")]
    InvalidInput,

    /// Transport-level failure (DNS, TLS, connection reset, WebDriver session).
    #[error("Network error: {0}")]
    Network(String),

    /// The fetch exceeded its deadline.
    #[error("Page load timed out ({secs}s).")]
    Timeout { secs: u64 },

    /// Non-2xx response.
    #[error("Request failed with status: {status}")]
    Http { status: u16 },

    /// The page came back without any markup.
    #[error("Empty response body")]
    EmptyBody,

    /// Tag too broad: landed on a search page with no product to follow.
    #[error("Tag was not specific. Landed on a search results page.")]
    AmbiguousTag,

    /// The marketplace explicitly reported no results.
    #[error("No product found for tag.")]
    NotFound,

    /// Selectors matched nothing usable; the page layout has likely changed.
    #[error("Price not found on page: {0}. CSS selectors might be outdated.")]
    Extraction(String),
}

impl ResolutionError {
    /// Timeout for a deadline, rounded up to whole seconds.
    pub fn timeout(deadline: Duration) -> Self {
        let secs = deadline.as_millis().div_ceil(1000);
        ResolutionError::Timeout { secs: u64::try_from(secs).unwrap_or(u64::MAX) }
    }

    /// Stable machine-readable name for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::InvalidInput => "invalid_input",
            ResolutionError::Network(_) => "network",
            ResolutionError::Timeout { .. } => "timeout",
            ResolutionError::Http { .. } => "http",
            ResolutionError::EmptyBody => "empty_body",
            ResolutionError::AmbiguousTag => "ambiguous_tag",
            ResolutionError::NotFound => "not_found",
            ResolutionError::Extraction(_) => "extraction",
        }
    }
}
