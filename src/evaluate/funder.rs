//! Funder evaluation — extracts configured variables from record metadata
//! through the packet pipeline and resolves them against their defaults.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::packets::QueryFilter;
use super::pipeline::{EvaluationReport, Evaluator, PacketPipeline};
use crate::observability::query_preview;
use crate::records::Record;
use crate::research::ResearchBase;
use crate::search::PreparedQuery;
use crate::types::{FunderConfig, RecordId, ResearchConfig, Result};
use crate::validation::sanitize_query;

/// Outcome per record: `{"quality": <0..=1>, "vars": {key: value}}`.
#[derive(Debug, Clone)]
pub struct FunderEvaluator {
    keys: Vec<String>,
}

impl FunderEvaluator {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn outcome(&self, record: &Record) -> Value {
        let vars: Map<String, Value> = self
            .keys
            .iter()
            .filter_map(|key| match record.metadata.get(key) {
                Some(Value::Null) | None => None,
                Some(value) => Some((key.clone(), value.clone())),
            })
            .collect();
        json!({
            "quality": record.quality(),
            "vars": vars,
        })
    }
}

#[async_trait]
impl Evaluator for FunderEvaluator {
    async fn evaluate(&self, record: &Record) -> Result<Option<Value>> {
        Ok(Some(self.outcome(record)))
    }
}

/// Assign each configured variable the value from the first record, in source
/// order, whose outcome holds it; unassigned variables take their default.
pub fn resolve_vars(
    records: &[Arc<Record>],
    results: &BTreeMap<RecordId, Value>,
    defaults: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut resolved: BTreeMap<String, Value> = BTreeMap::new();
    for record in records {
        if resolved.len() == defaults.len() {
            break;
        }
        let Some(vars) = results
            .get(&record.id)
            .and_then(|outcome| outcome.get("vars"))
            .and_then(Value::as_object)
        else {
            continue;
        };
        for key in defaults.keys() {
            if resolved.contains_key(key) {
                continue;
            }
            if let Some(value) = vars.get(key) {
                resolved.insert(key.clone(), value.clone());
            }
        }
    }
    for (key, default) in defaults {
        resolved
            .entry(key.clone())
            .or_insert_with(|| default.clone());
    }
    resolved
}

/// Result of one funder evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct FunderEvaluation {
    #[serde(flatten)]
    pub report: EvaluationReport,
    pub vars: BTreeMap<String, Value>,
}

/// Research base plus the packet pipeline for funder records.
pub struct FunderResearch {
    base: ResearchBase,
    config: FunderConfig,
    pipeline: PacketPipeline,
    evaluator: Arc<dyn Evaluator>,
}

impl std::fmt::Debug for FunderResearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunderResearch")
            .field("base", &self.base)
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl FunderResearch {
    pub fn new(research: ResearchConfig, funder: FunderConfig) -> Self {
        Self::with_base(ResearchBase::new(research), funder)
    }

    pub fn with_base(base: ResearchBase, funder: FunderConfig) -> Self {
        let evaluator = Arc::new(FunderEvaluator::new(funder.funder_vars.keys().cloned()));
        Self {
            base,
            pipeline: PacketPipeline::from_config(&funder),
            config: funder,
            evaluator,
        }
    }

    /// Swap the per-record evaluator (e.g. for an I/O bound lookup).
    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Override the concurrency bound for this instance.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.pipeline = PacketPipeline::new(max_concurrency, self.pipeline.packet_size())
            .with_timeout(self.pipeline.timeout());
        self
    }

    pub fn base(&self) -> &ResearchBase {
        &self.base
    }

    pub fn config(&self) -> &FunderConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &PacketPipeline {
        &self.pipeline
    }

    /// Run the pipeline over the whole store, optionally filtered by `query`.
    ///
    /// Only query validation can fail; evaluation failures degrade to
    /// missing entries in the report.
    pub async fn evaluate(&self, query: Option<&str>) -> Result<FunderEvaluation> {
        let records = self.base.store().records();
        let filter = match query {
            Some(raw) => {
                let sanitized = sanitize_query(raw, self.base.config().max_query_length)?;
                Some(QueryFilter::for_records(
                    PreparedQuery::new(&sanitized),
                    records,
                ))
            }
            None => None,
        };

        let preview = query.map(query_preview).unwrap_or_default();
        tracing::info!(
            event = "funder_evaluation_started",
            query_preview = %preview,
            max_concurrency = self.pipeline.max_concurrency(),
            packet_size = self.pipeline.packet_size(),
        );

        let report = self
            .pipeline
            .run(records, self.evaluator.clone(), filter)
            .await;
        let vars = resolve_vars(records, &report.results, &self.config.funder_vars);

        tracing::info!(
            event = "funder_evaluation_completed",
            results = report.results.len(),
            assigned_vars = vars.len(),
            failed = report.failed,
            timed_out = report.timed_out,
        );

        Ok(FunderEvaluation { report, vars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn research_with(values: Vec<Value>) -> ResearchConfig {
        ResearchConfig {
            records_data: Some(values),
            ..ResearchConfig::default()
        }
    }

    fn funder_with(vars: &[(&str, Value)], max_concurrency: usize) -> FunderConfig {
        FunderConfig {
            funder_vars: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            max_packet_concurrency: max_concurrency,
            ..FunderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_filters_records_by_query() {
        let funder = FunderResearch::new(
            research_with(vec![
                json!({"id": "alpha-1", "title": "Alpha", "metadata": {"owner": "alice"}}),
                json!({"id": "beta-2", "title": "Beta", "metadata": {"owner": "bob"}}),
            ]),
            funder_with(&[("owner", json!("unknown"))], 2),
        );
        let evaluation = funder.evaluate(Some("Alpha")).await.unwrap();
        assert_eq!(evaluation.vars["owner"], json!("alice"));
        assert_eq!(evaluation.report.results.len(), 1);
    }

    #[tokio::test]
    async fn test_first_record_in_source_order_wins() {
        let records: Vec<Value> = (0..8)
            .map(|i| {
                json!({
                    "id": format!("rec-{i}"),
                    "title": format!("Record {i}"),
                    "text": "",
                    "metadata": {"lead": format!("lead-{i}")},
                })
            })
            .collect();
        let funder = FunderResearch::new(research_with(records), funder_with(&[("lead", Value::Null)], 3));

        let all = funder.evaluate(None).await.unwrap();
        assert_eq!(all.vars["lead"], json!("lead-0"));
        assert_eq!(all.report.results.len(), 8);

        let one = funder.evaluate(Some("Record 5")).await.unwrap();
        assert_eq!(one.vars["lead"], json!("lead-5"));
    }

    #[tokio::test]
    async fn test_defaults_fill_unassigned_vars() {
        let funder = FunderResearch::new(
            research_with(vec![json!({"id": "a", "title": "A", "metadata": {"owner": "x"}})]),
            funder_with(&[("owner", json!("nobody")), ("region", json!("global"))], 1),
        );
        let evaluation = funder.evaluate(None).await.unwrap();
        assert_eq!(evaluation.vars["owner"], json!("x"));
        assert_eq!(evaluation.vars["region"], json!("global"));
    }

    #[tokio::test]
    async fn test_query_matches_unnamed_field() {
        let funder = FunderResearch::new(
            research_with(vec![json!({"id": "1", "name": "Alice"}), json!({"id": "2", "name": "Bob"})]),
            funder_with(&[], 1),
        );
        let evaluation = funder.evaluate(Some("bob")).await.unwrap();
        let ids: Vec<&str> = evaluation.report.results.keys().map(RecordId::as_str).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let funder = FunderResearch::new(
            research_with(vec![json!({"id": "1", "title": "Alice"})]),
            funder_with(&[("owner", Value::Null)], 2),
        );
        let evaluation = funder.evaluate(Some("zzz")).await.unwrap();
        assert!(evaluation.report.results.is_empty());
        assert_eq!(evaluation.vars["owner"], Value::Null);
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let funder = FunderResearch::new(research_with(vec![]), FunderConfig::default());
        assert!(funder.evaluate(Some("   ")).await.is_err());
    }

    #[test]
    fn test_outcome_shape() {
        let evaluator = FunderEvaluator::new(["owner", "missing"]);
        let record = Record::new(RecordId::parse("r").unwrap())
            .with_title("T")
            .with_metadata("owner", "team-a");
        assert_eq!(
            evaluator.outcome(&record),
            json!({"quality": 2.0 / 3.0, "vars": {"owner": "team-a"}})
        );
    }
}
