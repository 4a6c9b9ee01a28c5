//! Search — pluggable named methods over the record store.

mod methods;

pub use methods::{snippet, PreparedQuery, SearchMethod, SimpleSearch, TokenSearch, SNIPPET_CHARS};

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Error, RecordId, Result};
use crate::validation::normalize_method_name;

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub id: RecordId,
    pub snippet: String,
}

/// Name → search method. Comes with `simple` and `tokens` registered.
#[derive(Debug, Clone)]
pub struct SearchRegistry {
    methods: HashMap<String, Arc<dyn SearchMethod>>,
}

impl SearchRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            methods: HashMap::new(),
        };
        registry.methods.insert("simple".to_string(), Arc::new(SimpleSearch));
        registry.methods.insert("tokens".to_string(), Arc::new(TokenSearch));
        registry
    }

    /// Register (or replace) a method under a normalised name.
    pub fn register(&mut self, name: &str, method: Arc<dyn SearchMethod>) -> Result<()> {
        let name = normalize_method_name(Some(name))?
            .ok_or_else(|| Error::validation("search method name cannot be empty"))?;
        tracing::debug!(event = "search_method_registered", method = %name);
        self.methods.insert(name, method);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SearchMethod>> {
        self.methods.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for SearchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
