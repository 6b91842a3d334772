//! Page fetcher abstraction for retrieving response bodies.

use async_trait::async_trait;

use crate::Result;

/// Trait for fetching the body of a URL.
///
/// One call is one attempt: implementations must not retry. Any
/// non-success outcome (connection failure, non-2xx status, unreadable
/// body) is returned as an error. All configuration (user agent, client
/// options) is set at construction time; `fetch` is a simple URL-in,
/// body-out interface.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the body of the given URL.
    async fn fetch(&self, url: &str) -> Result<String>;
}
