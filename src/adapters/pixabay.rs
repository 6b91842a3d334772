//! Pixabay image search.

use crate::AdapterConfig;

/// Pixabay search page, images served from the pixabay CDN.
pub fn config() -> AdapterConfig {
    AdapterConfig::new(
        "pixabay",
        "https://pixabay.com/images/search/{query}/",
        r#" src=['"](https://cdn.pixabay.com/photo/.*?)/?['"]"#,
    )
}
