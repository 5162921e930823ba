//! cm-price - Resolve Pokemon card tags into Cardmarket price data
//!
//! A tag such as `sv2a182` is searched on Cardmarket, the first matching
//! product page is followed, and its price summary is extracted.

pub mod cardmarket;
pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod session;

pub use cardmarket::models::{CardData, CardPrice};
pub use cardmarket::Resolver;
pub use config::Config;
pub use error::ResolutionError;
pub use session::{LookupSession, LookupState};
