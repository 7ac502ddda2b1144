//! Crawl orchestration
//!
//! Walks a metadata source level by level, fetching independent scopes of a
//! level concurrently and feeding the results to a single graph builder in
//! key order.

mod cancel;
mod crawler;
mod options;
mod staging;

pub use cancel::CrawlCancelHandle;
pub use crawler::Crawler;
pub use options::{CrawlOptions, InfoLevel};
