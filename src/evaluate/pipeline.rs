//! Bounded-concurrency packet evaluation.
//!
//! Records are partitioned into packets; each packet runs as one task that
//! must hold a semaphore permit, so at most `max_concurrency` packets are
//! evaluating at any instant. The joining task merges each completed
//! packet's partial map into the report. Aborted or unfinished packets never
//! merge.

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::packets::{partition, Packet, QueryFilter};
use crate::records::Record;
use crate::types::{FunderConfig, RecordId, Result};

/// Per-record evaluation function.
///
/// `Ok(None)` is a no-match. `Err` and panics are treated as a no-match too,
/// but are logged and counted as failures.
#[async_trait]
pub trait Evaluator: Send + Sync + 'static {
    async fn evaluate(&self, record: &Record) -> Result<Option<Value>>;
}

/// Merged outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Record id → outcome, for every record that produced one.
    pub results: BTreeMap<RecordId, Value>,
    /// Packets the record set was split into.
    pub packets: usize,
    /// Packets whose results were merged.
    pub packets_completed: usize,
    /// Records handed to the evaluator that returned normally.
    pub evaluated: usize,
    /// Records excluded by the query filter.
    pub skipped: usize,
    /// Records whose evaluation errored or panicked.
    pub failed: usize,
    /// True when the run hit its timeout and returned partial results.
    pub timed_out: bool,
}

impl EvaluationReport {
    fn merge(&mut self, partial: PacketResult) {
        self.results.extend(partial.results);
        self.packets_completed += 1;
        self.evaluated += partial.evaluated;
        self.skipped += partial.skipped;
        self.failed += partial.failed;
    }
}

#[derive(Debug, Default)]
struct PacketResult {
    results: BTreeMap<RecordId, Value>,
    evaluated: usize,
    skipped: usize,
    failed: usize,
}

/// Packet pipeline settings.
#[derive(Debug, Clone)]
pub struct PacketPipeline {
    max_concurrency: usize,
    packet_size: usize,
    timeout: Option<Duration>,
}

impl PacketPipeline {
    /// Both bounds are clamped to at least 1; concurrency is also capped at
    /// the largest permit count a tokio semaphore accepts.
    pub fn new(max_concurrency: usize, packet_size: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            packet_size: packet_size.max(1),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &FunderConfig) -> Self {
        Self::new(config.max_packet_concurrency, config.packet_size)
            .with_timeout(config.evaluation_timeout)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Evaluate `records` and return the merged report.
    ///
    /// Dropping the returned future aborts every outstanding packet task.
    pub async fn run<E>(
        &self,
        records: &[Arc<Record>],
        evaluator: Arc<E>,
        filter: Option<QueryFilter>,
    ) -> EvaluationReport
    where
        E: Evaluator + ?Sized,
    {
        let packets = partition(records, self.packet_size);
        let mut report = EvaluationReport {
            packets: packets.len(),
            ..EvaluationReport::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let filter = filter.map(Arc::new);
        let mut tasks = JoinSet::new();
        for packet in packets {
            let semaphore = semaphore.clone();
            let evaluator = evaluator.clone();
            let filter = filter.clone();
            tasks.spawn(async move {
                // Held until the packet finishes.
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(evaluate_packet(packet, evaluator, filter).await)
            });
        }

        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Some(partial)) => report.merge(partial),
                    Ok(None) => tracing::error!(event = "packet_permit_unavailable"),
                    Err(err) => tracing::error!(event = "packet_task_failed", error = %err),
                }
            }
        };

        let timed_out = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, drain).await.is_err(),
            None => {
                drain.await;
                false
            }
        };

        if timed_out {
            tasks.abort_all();
            report.timed_out = true;
            tracing::warn!(
                event = "packet_evaluation_timed_out",
                timeout_ms = self.timeout.map(|t| t.as_millis() as u64),
                packets = report.packets,
                completed = report.packets_completed,
            );
        }

        report
    }
}

async fn evaluate_packet<E>(
    packet: Packet,
    evaluator: Arc<E>,
    filter: Option<Arc<QueryFilter>>,
) -> PacketResult
where
    E: Evaluator + ?Sized,
{
    let mut partial = PacketResult::default();
    for record in &packet.records {
        if let Some(filter) = &filter {
            if !filter.accepts(record) {
                partial.skipped += 1;
                continue;
            }
        }

        let outcome = AssertUnwindSafe(evaluator.evaluate(record.as_ref()))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(Some(value))) => {
                partial.evaluated += 1;
                partial.results.insert(record.id.clone(), value);
            }
            Ok(Ok(None)) => partial.evaluated += 1,
            Ok(Err(err)) => {
                partial.failed += 1;
                tracing::warn!(
                    event = "record_evaluation_failed",
                    id = %record.id,
                    packet = packet.index,
                    kind = err.kind(),
                    error = %err,
                );
            }
            Err(_panic) => {
                partial.failed += 1;
                tracing::error!(
                    event = "record_evaluation_panicked",
                    id = %record.id,
                    packet = packet.index,
                );
            }
        }
    }
    partial
}
