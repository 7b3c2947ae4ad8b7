//! Sharing built pipelines between call sites.
//!
//! Stateful strategies only do their job when every invocation of a
//! guarded target goes through the same strategy instances. The
//! [`StrategyCache`] maps a stable [`InterceptionPoint`] identity to the
//! pipeline built for it, creating it lazily on first use.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use faultguard_core::DefinitionError;

/// Stable identity of a guarded target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterceptionPoint {
    type_name: String,
    method: String,
}

impl InterceptionPoint {
    /// Identifies a method of a type (or any other stable pair of
    /// container and member names).
    pub fn new(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method: method.into(),
        }
    }
}

impl std::fmt::Display for InterceptionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}", self.type_name, self.method)
    }
}

/// Lazily built, shared pipelines keyed by interception point.
///
/// Entries live as long as the cache; dropping the cache releases them.
#[derive(Default)]
pub struct StrategyCache {
    entries: Mutex<HashMap<InterceptionPoint, Arc<dyn Any + Send + Sync>>>,
}

impl StrategyCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pipeline for `point`, building it with `factory` on
    /// the first call. Later calls with a different pipeline type for the
    /// same point are definition errors.
    pub fn get_or_create<G, F>(
        &self,
        point: InterceptionPoint,
        factory: F,
    ) -> Result<Arc<G>, DefinitionError>
    where
        G: Send + Sync + 'static,
        F: FnOnce() -> Result<G, DefinitionError>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = entries.get(&point) {
            return Arc::clone(existing).downcast::<G>().map_err(|_| {
                DefinitionError::InvalidConfiguration {
                    strategy: "strategy cache",
                    message: format!("{} is already guarded by a different pipeline type", point),
                }
            });
        }
        let guard = Arc::new(factory()?);
        entries.insert(point, Arc::clone(&guard) as Arc<dyn Any + Send + Sync>);
        Ok(guard)
    }

    /// The number of cached pipelines.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
