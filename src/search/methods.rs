//! Search methods — how a query is matched against one record.

use std::fmt;

use crate::records::Record;

/// Longest snippet returned with a hit, in characters.
pub const SNIPPET_CHARS: usize = 80;
const SNIPPET_LEAD_CHARS: usize = 20;

/// A sanitised query, lower-cased and tokenized once per search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    pub raw: String,
    pub lower: String,
    pub tokens: Vec<String>,
}

impl PreparedQuery {
    pub fn new(sanitized: &str) -> Self {
        let lower = sanitized.to_lowercase();
        let tokens = lower.split_whitespace().map(str::to_string).collect();
        Self {
            raw: sanitized.to_string(),
            lower,
            tokens,
        }
    }
}

/// A named matching strategy.
///
/// Returns the snippet of the first match, or `None` when the record does not
/// match. Implementations must be pure: same record and query, same answer.
pub trait SearchMethod: Send + Sync + fmt::Debug {
    fn match_record(&self, record: &Record, query: &PreparedQuery) -> Option<String>;
}

/// Case-insensitive substring match of the whole query against any non-id
/// field value.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleSearch;

impl SearchMethod for SimpleSearch {
    fn match_record(&self, record: &Record, query: &PreparedQuery) -> Option<String> {
        first_match(record, std::slice::from_ref(&query.lower))
    }
}

/// Matches when any whitespace-separated query token appears in any field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokenSearch;

impl SearchMethod for TokenSearch {
    fn match_record(&self, record: &Record, query: &PreparedQuery) -> Option<String> {
        first_match(record, &query.tokens)
    }
}

fn first_match(record: &Record, needles: &[String]) -> Option<String> {
    if needles.iter().all(|n| n.is_empty()) {
        return None;
    }
    record.field_texts().into_iter().find_map(|field| {
        let lowered = field.text.to_lowercase();
        needles
            .iter()
            .filter(|n| !n.is_empty())
            .find_map(|needle| lowered.find(needle.as_str()))
            .map(|byte_idx| {
                let char_idx = lowered[..byte_idx].chars().count();
                snippet(&field.text, char_idx)
            })
    })
}

/// Window of at most [`SNIPPET_CHARS`] characters around `match_char`,
/// with `…` marking truncation on either side.
pub fn snippet(text: &str, match_char: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total <= SNIPPET_CHARS {
        return text.to_string();
    }

    let start = match_char
        .saturating_sub(SNIPPET_LEAD_CHARS)
        .min(total - SNIPPET_CHARS);
    let end = start + SNIPPET_CHARS;

    let mut out = String::with_capacity(SNIPPET_CHARS + 6);
    if start > 0 {
        out.push('…');
    }
    out.extend(&chars[start..end]);
    if end < total {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;

    fn record(title: &str) -> Record {
        Record::new(RecordId::parse("r1").unwrap()).with_title(title)
    }

    #[test]
    fn test_simple_is_case_insensitive_substring() {
        let q = PreparedQuery::new("ALI");
        assert_eq!(
            SimpleSearch.match_record(&record("Alice"), &q),
            Some("Alice".to_string())
        );
        assert!(SimpleSearch
            .match_record(&record("Bob"), &q)
            .is_none());
    }

    #[test]
    fn test_simple_needs_whole_query() {
        let q = PreparedQuery::new("alpha omega");
        assert!(SimpleSearch.match_record(&record("Alpha project"), &q).is_none());
        assert!(TokenSearch.match_record(&record("Alpha project"), &q).is_some());
    }

    #[test]
    fn test_id_is_not_searched() {
        let q = PreparedQuery::new("r1");
        assert!(SimpleSearch.match_record(&record("nothing"), &q).is_none());
    }

    #[test]
    fn test_snippet_windows_long_text() {
        let text = format!("{}needle{}", "a".repeat(100), "b".repeat(100));
        let snip = snippet(&text, 100);
        assert!(snip.starts_with('…'));
        assert!(snip.ends_with('…'));
        assert!(snip.contains("needle"));
        assert_eq!(snip.chars().filter(|c| *c != '…').count(), SNIPPET_CHARS);
    }

    #[test]
    fn test_snippet_short_text_untouched() {
        assert_eq!(snippet("short", 0), "short");
    }

    #[test]
    fn test_snippet_clamps_near_end() {
        let text = "x".repeat(200);
        let snip = snippet(&text, 199);
        assert!(snip.starts_with('…'));
        assert!(!snip.ends_with('…'));
    }
}
