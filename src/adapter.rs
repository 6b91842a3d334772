//! Source adapter trait and the declarative regex adapter.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, SearchError, SearchResult};

/// Placeholder replaced by the percent-encoded query in URL templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Binds one external source: how to ask it, and how to read its answer.
///
/// Both operations are pure. The engine calls them from worker tasks, so
/// implementations must be `Send + Sync` but never need interior state.
pub trait SourceAdapter: Send + Sync {
    /// Source tag attached to every result of this adapter.
    fn name(&self) -> &str;

    /// Builds the request URL for `query`, percent-encoding it.
    fn build_query_url(&self, query: &str) -> String;

    /// Extracts results from a response body.
    ///
    /// Never fails: a body that cannot be understood yields no results.
    /// Locations are unique within the returned vector, first occurrence
    /// first.
    fn parse(&self, body: &str) -> Vec<SearchResult>;
}

/// Regex rewrite applied to the whole body before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    /// Pattern to replace.
    pub pattern: String,
    /// Replacement text (`$1` style group references allowed).
    pub replacement: String,
}

/// Declarative description of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Source name, used as the result tag and in stats.
    pub name: String,
    /// Request URL containing a `{query}` placeholder.
    pub url_template: String,
    /// Pattern whose first capture group is a result location.
    pub location_pattern: String,
    /// Optional rewrite run before `location_pattern`.
    #[serde(default)]
    pub substitution: Option<Substitution>,
}

impl AdapterConfig {
    /// Creates a config without a substitution step.
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        location_pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            location_pattern: location_pattern.into(),
            substitution: None,
        }
    }

    /// Adds a substitution step.
    pub fn with_substitution(
        mut self,
        pattern: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        self.substitution = Some(Substitution {
            pattern: pattern.into(),
            replacement: replacement.into(),
        });
        self
    }
}

/// A [`SourceAdapter`] driven by an [`AdapterConfig`].
#[derive(Debug, Clone)]
pub struct RegexAdapter {
    config: AdapterConfig,
    location: Regex,
    substitution: Option<(Regex, String)>,
}

impl RegexAdapter {
    /// Compiles and validates `config`.
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let invalid = |reason: &str| SearchError::InvalidAdapter {
            name: config.name.clone(),
            reason: reason.to_string(),
        };

        if config.name.trim().is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if !config.url_template.contains(QUERY_PLACEHOLDER) {
            return Err(invalid("url_template has no {query} placeholder"));
        }

        let sample = Url::parse(&config.url_template.replace(QUERY_PLACEHOLDER, "query"))?;
        if !matches!(sample.scheme(), "http" | "https") {
            return Err(invalid("url_template must be an http(s) URL"));
        }

        let location = Regex::new(&config.location_pattern)?;
        if location.captures_len() < 2 {
            return Err(invalid("location_pattern needs a capture group"));
        }

        let substitution = match &config.substitution {
            Some(sub) => Some((Regex::new(&sub.pattern)?, sub.replacement.clone())),
            None => None,
        };

        Ok(Self {
            config,
            location,
            substitution,
        })
    }

    /// Returns the adapter configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }
}

impl SourceAdapter for RegexAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn build_query_url(&self, query: &str) -> String {
        self.config
            .url_template
            .replace(QUERY_PLACEHOLDER, &urlencoding::encode(query))
    }

    fn parse(&self, body: &str) -> Vec<SearchResult> {
        let body = match &self.substitution {
            Some((pattern, replacement)) => pattern.replace_all(body, replacement.as_str()),
            None => body.into(),
        };

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for captures in self.location.captures_iter(&body) {
            let Some(location) = captures.get(1) else {
                continue;
            };
            let location = location.as_str();
            if location.is_empty() || !seen.insert(location) {
                continue;
            }
            results.push(SearchResult::new(location, self.name()));
        }
        results
    }
}
