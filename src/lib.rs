//! # fanout-image-search
//!
//! A concurrent image meta search library.
//!
//! A query is fanned out to several independent image sources at once.
//! Each source streams its results back as soon as it has them, and the
//! whole search is bounded by one caller-supplied timeout:
//!
//! - One worker task per source, results merged in arrival order
//! - Per-source result counts
//! - First source failure or the deadline ends the search, keeping
//!   whatever already arrived
//! - Workers are cancelled as soon as the search returns
//! - Declarative regex adapters, three built in (Unsplash, Pixabay, Pexels)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use fanout_image_search::Search;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let search = Search::with_builtin_adapters()?;
//!
//!     let outcome = search.search("cats", Duration::from_secs(2)).await;
//!     for result in outcome.items() {
//!         println!("{result}");
//!     }
//!     for (source, count) in outcome.stats.iter() {
//!         println!("{source}: {count}");
//!     }
//!     if let Some(err) = outcome.error {
//!         eprintln!("{err}");
//!     }
//!     Ok(())
//! }
//! ```

mod adapter;
mod config;
mod error;
mod result;
mod search;

pub mod adapters;
pub mod fetcher;
pub mod fetcher_http;

pub use adapter::{AdapterConfig, RegexAdapter, SourceAdapter, Substitution, QUERY_PLACEHOLDER};
pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use fetcher::PageFetcher;
pub use fetcher_http::HttpFetcher;
pub use result::{AggregationOutcome, SearchResult, Stats};
pub use search::Search;
