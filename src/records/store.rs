//! Read-only record store.
//!
//! Loading never fails the caller: a missing file, unreadable file or
//! malformed JSON degrades to an empty store plus a log line.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::record::Record;
use crate::types::{Error, RecordId, ResearchConfig, Result};

/// Where the records came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    Memory,
    File(PathBuf),
    None,
}

/// Immutable id → record mapping, iterated in source order.
#[derive(Debug)]
pub struct RecordStore {
    records: Vec<Arc<Record>>,
    index: HashMap<RecordId, usize>,
    source: RecordSource,
    loaded_at: DateTime<Utc>,
}

impl RecordStore {
    pub fn empty() -> Self {
        Self::build(Vec::new(), RecordSource::None)
    }

    /// Build from typed records. Later duplicates of an id are dropped.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self::build(records, RecordSource::Memory)
    }

    /// Build from raw JSON values; invalid entries are skipped with a warning.
    pub fn from_values(values: Vec<Value>) -> Self {
        let records = values
            .into_iter()
            .enumerate()
            .filter_map(|(position, value)| parse_entry(value, None, position))
            .collect();
        Self::build(records, RecordSource::Memory)
    }

    /// Load from a JSON file holding either an array of records or an
    /// object mapping id → record.
    ///
    /// A missing file is an empty store. Unreadable or malformed content is
    /// an `Error::DataSource`.
    pub fn load_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(event = "records_file_missing", path = %path.display());
            return Ok(Self::build(Vec::new(), RecordSource::File(path.to_path_buf())));
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::data_source(format!("cannot read {}: {}", path.display(), e))
        })?;
        let value: Value = serde_json::from_str(&raw).map_err(|e| {
            Error::data_source(format!("cannot parse {}: {}", path.display(), e))
        })?;
        let records = parse_document(value)?;

        let store = Self::build(records, RecordSource::File(path.to_path_buf()));
        tracing::info!(
            event = "records_loaded_from_file",
            path = %path.display(),
            count = store.len(),
        );
        Ok(store)
    }

    /// Load according to config, degrading every failure to an empty store.
    pub fn load(config: &ResearchConfig) -> Self {
        if let Some(values) = &config.records_data {
            let store = Self::from_values(values.clone());
            tracing::info!(event = "records_loaded_from_memory", count = store.len());
            return store;
        }

        let Some(path) = &config.records_path else {
            tracing::warn!(event = "records_missing_source");
            return Self::empty();
        };

        match Self::load_path(path) {
            Ok(store) => store,
            Err(err) => {
                tracing::error!(
                    event = "records_load_failed",
                    path = %path.display(),
                    kind = err.kind(),
                    error = %err,
                );
                Self::build(Vec::new(), RecordSource::File(path.clone()))
            }
        }
    }

    fn build(records: Vec<Record>, source: RecordSource) -> Self {
        let mut kept: Vec<Arc<Record>> = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());
        for record in records {
            if index.contains_key(&record.id) {
                tracing::warn!(event = "record_duplicate_id_skipped", id = %record.id);
                continue;
            }
            index.insert(record.id.clone(), kept.len());
            kept.push(Arc::new(record));
        }
        Self {
            records: kept,
            index,
            source,
            loaded_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Record>> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Records in source order.
    pub fn records(&self) -> &[Arc<Record>] {
        &self.records
    }

    pub fn source(&self) -> &RecordSource {
        &self.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::empty()
    }
}

fn parse_document(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(position, item)| parse_entry(item, None, position))
            .collect()),
        Value::Object(map) => Ok(map
            .into_iter()
            .enumerate()
            .filter_map(|(position, (key, item))| parse_entry(item, Some(key), position))
            .collect()),
        other => Err(Error::data_source(format!(
            "records must be a JSON array or object, got {}",
            json_type(&other)
        ))),
    }
}

/// Parse one entry. A mapping key, when present, is authoritative for the id.
fn parse_entry(value: Value, key: Option<String>, position: usize) -> Option<Record> {
    let Value::Object(mut object) = value else {
        tracing::warn!(event = "record_invalid_format", position);
        return None;
    };
    if let Some(key) = key {
        object.insert("id".to_string(), Value::String(key));
    }
    match serde_json::from_value::<Record>(Value::Object(object)) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::warn!(event = "record_skipped", position, error = %err);
            None
        }
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
