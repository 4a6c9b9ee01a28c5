//! Packet pipeline and search throughput benchmark.
//!
//! Measures funder evaluation across concurrency bounds and keyword search
//! over an in-memory store using Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use research_mcp::evaluate::{FunderEvaluator, PacketPipeline};
use research_mcp::records::{Record, RecordStore};
use research_mcp::research::ResearchBase;
use research_mcp::types::{RecordId, ResearchConfig};
use std::sync::Arc;

const RECORDS: usize = 2_000;

fn sample_records() -> Vec<Record> {
    (0..RECORDS)
        .map(|i| {
            Record::new(RecordId::parse(&format!("rec-{i}")).unwrap())
                .with_title(format!("Grant application {i}"))
                .with_text("Community garden expansion with volunteer outreach")
                .with_metadata("lead", format!("lead-{i}"))
        })
        .collect()
}

fn bench_pipeline(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = RecordStore::from_records(sample_records());
    let evaluator = Arc::new(FunderEvaluator::new(["lead"]));

    let mut group = c.benchmark_group("pipeline_run");
    for &concurrency in &[1usize, 4, 16] {
        let pipeline = PacketPipeline::new(concurrency, 50);
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &pipeline,
            |b, p| {
                b.iter(|| {
                    rt.block_on(async {
                        p.run(black_box(store.records()), evaluator.clone(), None)
                            .await
                    })
                });
            },
        );
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let base = ResearchBase::with_store(
        ResearchConfig::default(),
        Arc::new(RecordStore::from_records(sample_records())),
    );

    let mut group = c.benchmark_group("search");
    for method in ["simple", "tokens"] {
        group.bench_with_input(BenchmarkId::from_parameter(method), &method, |b, m| {
            b.iter(|| base.search(black_box("garden 1999"), Some(m)).unwrap().len());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline, bench_search);
criterion_main!(benches);
