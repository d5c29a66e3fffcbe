//! CLI command handlers.

pub mod compile;
pub mod inspect;
pub mod results;
