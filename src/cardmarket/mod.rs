//! Cardmarket-specific modules for fetching, classification, and extraction.

pub mod classifier;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod render;
pub mod resolver;
pub mod selectors;
pub mod urls;

pub use classifier::{classify, title_of};
pub use fetcher::{DirectFetcher, PageFetcher};
pub use models::{CardData, CardPrice, FetchResult, PageClassification};
pub use parser::Parser;
pub use render::{RenderContext, RenderedFetcher, WebDriverContext};
pub use resolver::Resolver;
pub use urls::build_search_url;
