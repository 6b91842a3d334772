//! Search result types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SearchError;

/// A single item found by one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    /// Locator of the item, usually an image URL.
    pub location: String,
    /// Name of the adapter that produced this item.
    pub source: String,
}

impl SearchResult {
    /// Creates a new search result.
    pub fn new(location: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>15}: {}", self.source, self.location)
    }
}

/// Number of results each source delivered during one search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stats {
    counts: BTreeMap<String, usize>,
}

impl Stats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more result for `source`.
    pub fn increment(&mut self, source: &str) {
        match self.counts.get_mut(source) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(source.to_string(), 1);
            }
        }
    }

    /// Returns the count for `source`, zero if it delivered nothing.
    pub fn get(&self, source: &str) -> usize {
        self.counts.get(source).copied().unwrap_or(0)
    }

    /// Sum over all sources.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Number of sources that delivered at least one result.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns `true` if no result was counted.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates over `(source, count)` pairs in source-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(source, count)| (source.as_str(), *count))
    }
}

/// Everything one call to [`Search::search`](crate::Search::search) produced.
///
/// `results` and `stats` are kept even when `error` is set: on a timeout
/// they hold what arrived before the deadline, on a source failure what
/// arrived before the failure was observed.
#[derive(Debug, Default)]
pub struct AggregationOutcome {
    /// Results in the order the control loop received them.
    pub results: Vec<SearchResult>,
    /// Per-source counts of `results`.
    pub stats: Stats,
    /// Terminal error, if the search did not complete normally.
    pub error: Option<SearchError>,
    /// Wall time of the search in milliseconds.
    pub duration_ms: u64,
}

impl AggregationOutcome {
    pub(crate) fn failed(error: SearchError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Returns `true` if every source finished without error or timeout.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the results.
    pub fn items(&self) -> &[SearchResult] {
        &self.results
    }

    /// Converts into a `Result`, discarding partial results on failure.
    pub fn into_result(self) -> crate::Result<(Vec<SearchResult>, Stats)> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.results, self.stats)),
        }
    }
}
