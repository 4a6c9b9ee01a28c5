//! Packet partitioning and query filtering.

use std::sync::Arc;

use crate::records::Record;
use crate::search::{PreparedQuery, SearchMethod, SimpleSearch, TokenSearch};

/// A contiguous, non-overlapping slice of the record set.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Position of this packet in source order.
    pub index: usize,
    pub records: Vec<Arc<Record>>,
}

impl Packet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Split `records` into packets of `packet_size` (clamped to at least 1),
/// keeping source order. Only the last packet may be shorter.
pub fn partition(records: &[Arc<Record>], packet_size: usize) -> Vec<Packet> {
    records
        .chunks(packet_size.max(1))
        .enumerate()
        .map(|(index, chunk)| Packet {
            index,
            records: chunk.to_vec(),
        })
        .collect()
}

/// How a [`QueryFilter`] decides a record matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole query as a case-insensitive substring.
    Whole,
    /// Any query token as a substring. Used when no record matches the whole query.
    AnyToken,
}

/// Decides which records proceed to evaluation.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    query: PreparedQuery,
    mode: MatchMode,
}

impl QueryFilter {
    /// Pick the match mode for this record set: whole-query when at least one
    /// record matches it, otherwise any-token.
    pub fn for_records(query: PreparedQuery, records: &[Arc<Record>]) -> Self {
        let whole = records
            .iter()
            .any(|r| SimpleSearch.match_record(r, &query).is_some());
        let mode = if whole {
            MatchMode::Whole
        } else {
            MatchMode::AnyToken
        };
        Self { query, mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query.raw
    }

    pub fn accepts(&self, record: &Record) -> bool {
        match self.mode {
            MatchMode::Whole => SimpleSearch.match_record(record, &self.query).is_some(),
            MatchMode::AnyToken => TokenSearch.match_record(record, &self.query).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordId;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn records(n: usize) -> Vec<Arc<Record>> {
        (0..n)
            .map(|i| {
                Arc::new(
                    Record::new(RecordId::parse(&format!("rec-{i}")).unwrap())
                        .with_title(format!("Record {i}")),
                )
            })
            .collect()
    }

    #[test]
    fn test_partition_sizes() {
        let packets = partition(&records(7), 3);
        let sizes: Vec<usize> = packets.iter().map(Packet::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(packets[2].index, 2);
        assert_eq!(packets[2].records[0].id.as_str(), "rec-6");
    }

    #[test]
    fn test_partition_zero_size_clamps() {
        assert_eq!(partition(&records(2), 0).len(), 2);
        assert!(partition(&[], 4).is_empty());
    }

    #[test]
    fn test_filter_prefers_whole_query() {
        let set = records(10);
        let filter = QueryFilter::for_records(PreparedQuery::new("Record 5"), &set);
        assert_eq!(filter.mode(), MatchMode::Whole);
        let accepted: Vec<&str> = set
            .iter()
            .filter(|r| filter.accepts(r))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(accepted, vec!["rec-5"]);
    }

    #[test]
    fn test_filter_falls_back_to_tokens() {
        let set = records(3);
        let filter = QueryFilter::for_records(PreparedQuery::new("record zzz"), &set);
        assert_eq!(filter.mode(), MatchMode::AnyToken);
        assert!(set.iter().all(|r| filter.accepts(r)));
    }

    #[test]
    fn test_filter_reads_every_non_id_field() {
        let set: Vec<Arc<Record>> = [
            serde_json::json!({"id": "1", "name": "Alice"}),
            serde_json::json!({"id": "2", "name": "Bob", "metadata": {"team": "grants"}}),
        ]
        .into_iter()
        .map(|v| Arc::new(serde_json::from_value::<Record>(v).unwrap()))
        .collect();

        let by_name = QueryFilter::for_records(PreparedQuery::new("bob"), &set);
        assert_eq!(by_name.mode(), MatchMode::Whole);
        assert!(!by_name.accepts(&set[0]));
        assert!(by_name.accepts(&set[1]));

        let by_metadata = QueryFilter::for_records(PreparedQuery::new("GRANTS"), &set);
        assert!(by_metadata.accepts(&set[1]));
        let by_id = QueryFilter::for_records(PreparedQuery::new("1"), &set);
        assert!(!by_id.accepts(&set[0]));
    }

    proptest! {
        #[test]
        fn partition_is_complete_and_disjoint(n in 0usize..60, size in 0usize..12) {
            let set = records(n);
            let packets = partition(&set, size);

            let mut seen = HashSet::new();
            let mut flattened = Vec::new();
            for packet in &packets {
                prop_assert!(!packet.is_empty());
                prop_assert!(packet.len() <= size.max(1));
                for record in &packet.records {
                    prop_assert!(seen.insert(record.id.clone()));
                    flattened.push(record.id.clone());
                }
            }
            let original: Vec<RecordId> = set.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(flattened, original);
        }
    }
}
