//! CLI command implementations.

pub mod interactive;
pub mod lookup;

pub use interactive::InteractiveCommand;
pub use lookup::{LookupCommand, Report};
