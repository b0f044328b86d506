//! API request handlers

mod analytics;
mod health;
mod ingest;

pub use analytics::*;
pub use health::*;
pub use ingest::*;
