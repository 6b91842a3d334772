//! Pexels image search.

use crate::AdapterConfig;

/// Pexels (German locale) search page, images referenced by `src` attributes.
pub fn config() -> AdapterConfig {
    AdapterConfig::new(
        "pexels",
        "https://www.pexels.com/de-de/suche/{query}/",
        r#" src=['"](https://images.pexels.com/photos.*?)/?['"]"#,
    )
}
