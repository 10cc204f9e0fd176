use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::FunctionHandler;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("function {0} registered twice")]
    Duplicate(String),

    #[error("invalid function name {0:?}")]
    InvalidName(String),
}

/// Immutable name → handler table, built once at startup.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn FunctionHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

impl HandlerRegistry {
    /// Build from an enumerated list of (name, handler) pairs.
    ///
    /// Names are single path segments: non-empty, no `/`.
    pub fn new<I, S>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (S, Arc<dyn FunctionHandler>)>,
        S: Into<String>,
    {
        let mut handlers = HashMap::new();
        for (name, handler) in entries {
            let name = name.into();
            if name.is_empty() || name.contains('/') {
                return Err(RegistryError::InvalidName(name));
            }
            if handlers.contains_key(&name) {
                return Err(RegistryError::Duplicate(name));
            }
            handlers.insert(name, handler);
        }
        Ok(Self { handlers })
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FunctionHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
