//! Tool input validation.
//!
//! Every helper either returns the fully normalised value or an
//! `Error::Validation`; nothing is partially applied.

use std::collections::HashSet;

use crate::types::{Error, Result};

/// Validate that a string is not empty.
pub fn validate_non_empty(s: &str, field: &str) -> Result<()> {
    if s.trim().is_empty() {
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Validate that a value is positive.
pub fn validate_positive(n: usize, field: &str) -> Result<usize> {
    if n == 0 {
        return Err(Error::validation(format!("{} must be positive", field)));
    }
    Ok(n)
}

fn is_control(c: char) -> bool {
    // Tab, LF and CR are whitespace, not control noise.
    matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Validate and normalise a search query string.
///
/// Control characters become spaces, whitespace runs collapse to one space,
/// and the result is trimmed. Empty or longer than `max_len` characters fails.
pub fn sanitize_query(raw: &str, max_len: usize) -> Result<String> {
    let replaced: String = raw
        .chars()
        .map(|c| if is_control(c) { ' ' } else { c })
        .collect();
    let cleaned = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() {
        tracing::warn!(event = "empty_query_rejected");
        return Err(Error::validation("query cannot be empty"));
    }
    let length = cleaned.chars().count();
    if length > max_len {
        tracing::warn!(event = "query_too_long", length, max_len);
        return Err(Error::validation(format!(
            "query exceeds {} characters",
            max_len
        )));
    }
    Ok(cleaned)
}

/// Ensure an identifier is non-empty and uses only alphanumerics, `_`, `.`, `-`.
pub fn validate_identifier(raw: &str, field: &str) -> Result<String> {
    let identifier = raw.trim();
    if identifier.is_empty() {
        tracing::warn!(event = "empty_identifier_rejected", field);
        return Err(Error::validation(format!("{} cannot be empty", field)));
    }
    if !identifier.chars().all(is_identifier_char) {
        tracing::warn!(event = "identifier_pattern_mismatch", field);
        return Err(Error::validation(format!(
            "{} may only contain alphanumerics, '_', '.', or '-'",
            field
        )));
    }
    Ok(identifier.to_string())
}

/// Validate a list of ids: each must be a valid identifier, duplicates are
/// dropped (first occurrence kept), and at most `max_ids` are accepted.
pub fn validate_id_list<S: AsRef<str>>(raw: &[S], max_ids: usize) -> Result<Vec<String>> {
    let mut ids: Vec<String> = Vec::with_capacity(raw.len().min(max_ids));
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len().min(max_ids));
    for (index, value) in raw.iter().enumerate() {
        let id = validate_identifier(value.as_ref(), &format!("ids[{}]", index))?;
        if seen.insert(id.clone()) {
            ids.push(id);
            if ids.len() > max_ids {
                break;
            }
        }
    }

    if ids.len() > max_ids {
        tracing::warn!(event = "id_list_too_long", count = ids.len(), max_ids);
        return Err(Error::validation(format!(
            "at most {} ids may be requested at once",
            max_ids
        )));
    }
    Ok(ids)
}

/// Sanitise a search method name if provided.
///
/// `None` and blank names mean "use the default" and return `Ok(None)`.
pub fn normalize_method_name(method: Option<&str>) -> Result<Option<String>> {
    let Some(method) = method else {
        return Ok(None);
    };
    let candidate = method.trim().to_lowercase();
    if candidate.is_empty() {
        return Ok(None);
    }
    if !candidate.chars().all(is_identifier_char) {
        tracing::warn!(event = "method_pattern_mismatch", method);
        return Err(Error::validation(
            "method names may only contain alphanumerics, '_', '.', or '-'",
        ));
    }
    Ok(Some(candidate))
}
