//! Built-in image source adapters.

mod pexels;
mod pixabay;
mod unsplash;

use crate::{AdapterConfig, RegexAdapter, Result};

pub use pexels::config as pexels;
pub use pixabay::config as pixabay;
pub use unsplash::config as unsplash;

/// Configurations of all built-in sources, in fan-out order.
pub fn builtin_configs() -> Vec<AdapterConfig> {
    vec![unsplash(), pixabay(), pexels()]
}

/// Compiles all built-in sources.
pub fn builtin() -> Result<Vec<RegexAdapter>> {
    builtin_configs().into_iter().map(RegexAdapter::new).collect()
}
