// Process-wide default lifecycle for adapters that cannot pass one around

use super::AllureLifecycle;
use crate::config::Config;
use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

static DEFAULT: Lazy<RwLock<Option<Arc<AllureLifecycle>>>> = Lazy::new(|| RwLock::new(None));

/// The default lifecycle, built from the discovered configuration on first use
pub fn get() -> Arc<AllureLifecycle> {
    if let Some(lifecycle) = DEFAULT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
    {
        return lifecycle.clone();
    }

    let mut slot = DEFAULT.write().unwrap_or_else(PoisonError::into_inner);
    slot.get_or_insert_with(|| {
        let config = Config::load_or_default();
        debug!(
            "Creating default lifecycle writing to {}",
            config.results.directory.display()
        );
        Arc::new(AllureLifecycle::from_config(config))
    })
    .clone()
}

/// Replace the default lifecycle, returning the previous one
pub fn set(lifecycle: Arc<AllureLifecycle>) -> Option<Arc<AllureLifecycle>> {
    DEFAULT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(lifecycle)
}
