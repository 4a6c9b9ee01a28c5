//! Tool catalog — typed metadata, parameter validation, input schemas.
//!
//! Owns tool *metadata* only. Handlers live with each server flavour.

use crate::types::Error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Int,
    Bool,
    StringList,
    Enum(Vec<String>),
    Optional(Box<ParamType>),
}

impl ParamType {
    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match self {
            ParamType::String => expect(value.is_string(), "string", value),
            ParamType::Int => expect(value.is_i64() || value.is_u64(), "integer", value),
            ParamType::Bool => expect(value.is_boolean(), "boolean", value),
            ParamType::StringList => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| format!("expected array, got {}", value_type_name(value)))?;
                for (i, item) in arr.iter().enumerate() {
                    if !item.is_string() {
                        return Err(format!(
                            "expected string at index {}, got {}",
                            i,
                            value_type_name(item)
                        ));
                    }
                }
                Ok(())
            }
            ParamType::Enum(variants) => {
                let s = value.as_str().ok_or_else(|| {
                    format!("expected string for enum, got {}", value_type_name(value))
                })?;
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(format!(
                        "invalid enum value '{}', expected one of: {}",
                        s,
                        variants.join(", ")
                    ))
                }
            }
            ParamType::Optional(inner) => {
                if value.is_null() {
                    Ok(())
                } else {
                    inner.validate(value)
                }
            }
        }
    }

    /// JSON schema fragment for this type.
    pub fn schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Int => json!({"type": "integer"}),
            ParamType::Bool => json!({"type": "boolean"}),
            ParamType::StringList => json!({"type": "array", "items": {"type": "string"}}),
            ParamType::Enum(variants) => json!({"type": "string", "enum": variants}),
            ParamType::Optional(inner) => inner.schema(),
        }
    }
}

fn expect(ok: bool, expected: &str, value: &Value) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(format!("expected {}, got {}", expected, value_type_name(value)))
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self::required(name, ParamType::Optional(Box::new(param_type)), description)
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }
}

// =============================================================================
// Tool entry
// =============================================================================

/// Complete tool metadata entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamDef>,
}

impl ToolEntry {
    /// JSON schema advertised in `tools/list`.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            let mut schema = param.param_type.schema();
            if let Some(obj) = schema.as_object_mut() {
                obj.insert("description".to_string(), json!(param.description));
                if let Some(default) = &param.default {
                    obj.insert("default".to_string(), default.clone());
                }
            }
            properties.insert(param.name.clone(), schema);
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// In-memory tool catalog. Owns metadata, not implementations.
#[derive(Debug, Default, Clone)]
pub struct ToolCatalog {
    entries: HashMap<String, ToolEntry>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a tool entry.
    pub fn register(&mut self, entry: ToolEntry) -> crate::types::Result<()> {
        if entry.name.trim().is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        self.entries.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Get a tool entry by name.
    pub fn get(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.get(name)
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// List all tool entries, sorted by name.
    pub fn list_entries(&self) -> Vec<&ToolEntry> {
        let mut entries: Vec<&ToolEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Validate parameters against a tool's parameter definitions.
    ///
    /// Returns a list of validation errors (empty = valid).
    pub fn validate_params(&self, name: &str, params: &Value) -> crate::types::Result<Vec<String>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;

        let empty = Map::new();
        let param_map = match params {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(Error::validation("Parameters must be a JSON object")),
        };

        let mut errors = Vec::new();

        for param_def in &entry.parameters {
            if param_def.is_required() && !param_map.contains_key(&param_def.name) {
                errors.push(format!("Missing required parameter: {}", param_def.name));
            }
        }

        let known: HashMap<&str, &ParamDef> = entry
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        for (key, value) in param_map {
            match known.get(key.as_str()) {
                Some(param_def) => {
                    if let Err(e) = param_def.param_type.validate(value) {
                        errors.push(format!("Parameter '{}': {}", key, e));
                    }
                }
                None => errors.push(format!("Unknown parameter: {}", key)),
            }
        }

        errors.sort();
        Ok(errors)
    }

    /// Fill in default values for missing optional parameters.
    pub fn fill_defaults(&self, name: &str, params: &mut Value) -> crate::types::Result<()> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {}", name)))?;

        if params.is_null() {
            *params = Value::Object(Map::new());
        }
        if let Some(map) = params.as_object_mut() {
            for param_def in &entry.parameters {
                if !map.contains_key(&param_def.name) {
                    if let Some(default) = &param_def.default {
                        map.insert(param_def.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
