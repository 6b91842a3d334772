//! Unsplash image search.

use crate::AdapterConfig;

/// Unsplash search page.
///
/// Image URLs live in an embedded JSON blob with escaped slashes
/// (`\u002F`), so the body is unescaped before extraction.
pub fn config() -> AdapterConfig {
    AdapterConfig::new(
        "unsplash",
        "https://unsplash.com/search/photos/{query}/",
        r#""small":['"](https://images.unsplash.com/photo.*?)/?['"]"#,
    )
    .with_substitution(r"\\u002F", "/")
}
