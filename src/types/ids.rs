//! Strongly-typed identifiers.
//!
//! All IDs are validated at construction time and implement common traits.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::Error;

/// Unique id of a single tool invocation, attached to every log line it emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(String);

impl InvocationId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record identifier.
///
/// Trimmed, non-empty, and restricted to ASCII alphanumerics, `_`, `.` and `-`.
/// Deserialization runs the same check, so a `Record` can never hold a bad id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        crate::validation::validate_identifier(raw, "id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl std::borrow::Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_trims() {
        let id = RecordId::parse("  rec-1 ").unwrap();
        assert_eq!(id.as_str(), "rec-1");
    }

    #[test]
    fn test_record_id_rejects_spaces() {
        assert!(RecordId::parse("bad id").is_err());
        assert!(RecordId::parse("   ").is_err());
    }

    #[test]
    fn test_record_id_deserialize_validates() {
        let ok: RecordId = serde_json::from_str("\"alpha\"").unwrap();
        assert_eq!(ok.to_string(), "alpha");
        assert!(serde_json::from_str::<RecordId>("\"a/b\"").is_err());
    }

    #[test]
    fn test_invocation_ids_unique() {
        assert_ne!(InvocationId::new(), InvocationId::new());
    }
}
