//! Configuration source seam.
//!
//! One property is recognized, process-wide:
//! `MP_Fault_Tolerance_NonFallback_Enabled`. When it reads `false`, every
//! strategy except fallback and thread offload is elided from pipelines
//! at build time. The property is read exactly once, at the first
//! pipeline construction; installing a custom [`ConfigSource`] after
//! that has no effect.

use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;

/// Provides configuration values to the pipeline builders.
pub trait ConfigSource: Send + Sync {
    /// The raw value of the named property, if present.
    fn value_of(&self, key: &str) -> Option<String>;
}

/// Reads configuration from process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn value_of(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// The property controlling whether non-fallback strategies are built.
pub const NON_FALLBACK_ENABLED_PROPERTY: &str = "MP_Fault_Tolerance_NonFallback_Enabled";

lazy_static! {
    static ref CONFIG_SOURCE: Mutex<Arc<dyn ConfigSource>> = Mutex::new(Arc::new(EnvConfigSource));
    static ref NON_FALLBACK_ENABLED: bool = {
        let source = CONFIG_SOURCE
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        !source
            .value_of(NON_FALLBACK_ENABLED_PROPERTY)
            .map(|value| value.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(false)
    };
}

/// Replaces the configuration source. Only effective before the first
/// pipeline is built in this process.
pub fn install_config_source(source: Arc<dyn ConfigSource>) {
    *CONFIG_SOURCE.lock().unwrap_or_else(|e| e.into_inner()) = source;
}

pub(crate) fn non_fallback_enabled() -> bool {
    *NON_FALLBACK_ENABLED
}
