//! Record type and its text views.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Error, RecordId};

/// One unit of domain data (a cupcake order, a funder entry, ...).
///
/// `title`, `text` and `metadata` are the documented fields; anything else is
/// kept verbatim in `extra` and is still searchable. A documented field of an
/// unexpected JSON type (a numeric `title`, a string `metadata`) is kept in
/// `extra` under its own name, so only a bad `id` rejects a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Record {
    pub id: RecordId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A searchable piece of a record: dotted field path plus its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldText {
    pub field: String,
    pub text: String,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            title: None,
            text: None,
            metadata: Map::new(),
            extra: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Every scalar value of the record except the id, in field order:
    /// title, text, metadata, then extra fields.
    pub fn field_texts(&self) -> Vec<FieldText> {
        let mut out = Vec::new();
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            out.push(FieldText {
                field: "title".to_string(),
                text: title.to_string(),
            });
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            out.push(FieldText {
                field: "text".to_string(),
                text: text.to_string(),
            });
        }
        for (key, value) in &self.metadata {
            flatten_value(&format!("metadata.{key}"), value, &mut out);
        }
        for (key, value) in &self.extra {
            flatten_value(key, value, &mut out);
        }
        out
    }

    /// Fraction of title, text and metadata that are present and non-empty.
    pub fn quality(&self) -> f64 {
        let present = [
            self.title.as_deref().is_some_and(|t| !t.is_empty()),
            self.text.as_deref().is_some_and(|t| !t.is_empty()),
            !self.metadata.is_empty(),
        ];
        present.iter().filter(|p| **p).count() as f64 / present.len() as f64
    }
}

impl TryFrom<Map<String, Value>> for Record {
    type Error = Error;

    fn try_from(mut object: Map<String, Value>) -> Result<Self, Self::Error> {
        let id = match object.remove("id") {
            Some(Value::String(raw)) => RecordId::parse(&raw)?,
            Some(other) => {
                return Err(Error::validation(format!(
                    "id must be a string, got {}",
                    other
                )))
            }
            None => return Err(Error::validation("record has no id")),
        };

        let mut record = Record::new(id);
        match object.remove("title") {
            Some(Value::String(title)) => record.title = Some(title),
            Some(Value::Null) | None => {}
            Some(other) => {
                object.insert("title".to_string(), other);
            }
        }
        match object.remove("text") {
            Some(Value::String(text)) => record.text = Some(text),
            Some(Value::Null) | None => {}
            Some(other) => {
                object.insert("text".to_string(), other);
            }
        }
        match object.remove("metadata") {
            Some(Value::Object(metadata)) => record.metadata = metadata,
            Some(Value::Null) | None => {}
            Some(other) => {
                object.insert("metadata".to_string(), other);
            }
        }
        record.extra = object;
        Ok(record)
    }
}

fn flatten_value(path: &str, value: &Value, out: &mut Vec<FieldText>) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            if !s.is_empty() {
                out.push(FieldText {
                    field: path.to_string(),
                    text: s.clone(),
                });
            }
        }
        Value::Bool(_) | Value::Number(_) => out.push(FieldText {
            field: path.to_string(),
            text: value.to_string(),
        }),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(&format!("{path}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten_value(&format!("{path}.{key}"), item, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(s: &str) -> RecordId {
        RecordId::parse(s).unwrap()
    }

    #[test]
    fn test_deserialize_keeps_extra_fields() {
        let record: Record = serde_json::from_value(json!({
            "id": "1",
            "name": "Alice",
            "metadata": {"owner": "team-a"},
        }))
        .unwrap();
        assert_eq!(record.id.as_str(), "1");
        assert_eq!(record.extra["name"], "Alice");
        assert_eq!(record.metadata["owner"], "team-a");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["name"], "Alice");
        assert!(back.get("title").is_none());
    }

    #[test]
    fn test_mistyped_documented_fields_move_to_extra() {
        let record: Record = serde_json::from_value(json!({
            "id": "1",
            "title": 2024,
            "text": ["a", "b"],
            "metadata": "funder-x",
        }))
        .unwrap();
        assert_eq!(record.title, None);
        assert_eq!(record.text, None);
        assert!(record.metadata.is_empty());
        assert_eq!(record.extra["title"], 2024);
        assert_eq!(record.extra["metadata"], "funder-x");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["title"], 2024);
        assert_eq!(back["text"], json!(["a", "b"]));
        assert_eq!(back["metadata"], "funder-x");
    }

    #[test]
    fn test_id_is_still_required() {
        assert!(serde_json::from_value::<Record>(json!({"name": "x"})).is_err());
        assert!(serde_json::from_value::<Record>(json!({"id": 7})).is_err());
        assert!(serde_json::from_value::<Record>(json!({"id": "bad id"})).is_err());
    }

    #[test]
    fn test_field_texts_flatten_nested_values() {
        let record = Record::new(id("r"))
            .with_title("Alpha")
            .with_metadata("tags", json!(["x", 2]))
            .with_metadata("nested", json!({"k": true, "n": null}));
        let fields: Vec<(String, String)> = record
            .field_texts()
            .into_iter()
            .map(|f| (f.field, f.text))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("title".to_string(), "Alpha".to_string()),
                ("metadata.nested.k".to_string(), "true".to_string()),
                ("metadata.tags[0]".to_string(), "x".to_string()),
                ("metadata.tags[1]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_quality() {
        let record = Record::new(id("r"))
            .with_title("Record 5")
            .with_text("")
            .with_metadata("lead", "Lead-5");
        assert!((record.quality() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(Record::new(id("empty")).quality(), 0.0);
    }
}
