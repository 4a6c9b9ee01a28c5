//! Research base — validated search and fetch over one record store.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::records::{Record, RecordStore};
use crate::search::{PreparedQuery, SearchHit, SearchMethod, SearchRegistry};
use crate::types::{Error, RecordId, ResearchConfig, Result};
use crate::validation::{normalize_method_name, sanitize_query, validate_id_list};

/// Search and fetch primitives shared by every server flavour.
#[derive(Debug, Clone)]
pub struct ResearchBase {
    config: ResearchConfig,
    store: Arc<RecordStore>,
    methods: SearchRegistry,
    default_method: String,
}

impl ResearchBase {
    /// Load the store described by `config`. Never fails: a bad source is an empty store.
    pub fn new(config: ResearchConfig) -> Self {
        let store = Arc::new(RecordStore::load(&config));
        Self::with_store(config, store)
    }

    pub fn with_store(config: ResearchConfig, store: Arc<RecordStore>) -> Self {
        let default_method = match normalize_method_name(Some(&config.default_search)) {
            Ok(Some(name)) => name,
            Ok(None) => "simple".to_string(),
            Err(err) => {
                tracing::warn!(
                    event = "default_search_invalid",
                    method = %config.default_search,
                    error = %err,
                );
                "simple".to_string()
            }
        };
        Self {
            config,
            store,
            methods: SearchRegistry::new(),
            default_method,
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn default_method(&self) -> &str {
        &self.default_method
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.names()
    }

    pub fn register_search(&mut self, name: &str, method: Arc<dyn SearchMethod>) -> Result<()> {
        self.methods.register(name, method)
    }

    /// Sanitise the query and resolve the method, then return a lazy hit iterator.
    ///
    /// The iterator borrows the immutable store, so calling this again with
    /// the same arguments yields the same sequence.
    pub fn search_iter(
        &self,
        query: &str,
        method: Option<&str>,
    ) -> Result<impl Iterator<Item = SearchHit> + '_> {
        let sanitized = sanitize_query(query, self.config.max_query_length)?;
        let method_name =
            normalize_method_name(method)?.unwrap_or_else(|| self.default_method.clone());
        let matcher = self.methods.get(&method_name).ok_or_else(|| {
            tracing::warn!(event = "unknown_search_method", method = %method_name);
            Error::validation(format!("unknown search method: {}", method_name))
        })?;
        let prepared = PreparedQuery::new(&sanitized);

        Ok(self.store.records().iter().filter_map(move |record| {
            matcher
                .match_record(record, &prepared)
                .map(|snippet| SearchHit {
                    id: record.id.clone(),
                    snippet,
                })
        }))
    }

    /// Eager form of [`ResearchBase::search_iter`].
    pub fn search(&self, query: &str, method: Option<&str>) -> Result<Vec<SearchHit>> {
        Ok(self.search_iter(query, method)?.collect())
    }

    /// Fetch the records for `ids`. Unknown ids are omitted, never an error.
    pub fn fetch<S: AsRef<str>>(&self, ids: &[S]) -> Result<BTreeMap<RecordId, Record>> {
        let ids = validate_id_list(ids, self.config.max_fetch_ids)?;
        let found: BTreeMap<RecordId, Record> = ids
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(|record| (record.id.clone(), Record::clone(record)))
            .collect();
        if found.len() < ids.len() {
            tracing::debug!(
                event = "fetch_ids_missing",
                requested = ids.len(),
                found = found.len(),
            );
        }
        Ok(found)
    }

    /// Fetch one record; an unknown id is `Error::NotFound`.
    pub fn fetch_one(&self, id: &str) -> Result<Record> {
        let id = RecordId::parse(id)?;
        match self.store.get(id.as_str()) {
            Some(record) => Ok(Record::clone(record)),
            None => {
                tracing::warn!(event = "record_not_found", id = %id);
                Err(Error::not_found(format!("unknown id: {}", id)))
            }
        }
    }
}
