use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use biomind::access::InMemoryUsageLedger;
use biomind::analysis::{Organism, ParsedFileContext, SequenceAnalyzer};
use biomind::classifier::classify;
use biomind::config::Config;
use biomind::orchestrator::{Query, QueryOrchestrator};
use biomind::providers::ProviderRouter;
use biomind::session::{ConversationStore, Turn};

/// Deterministic pseudo-random DNA of the given length
fn synthetic_dna(len: usize) -> String {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            bases[(state % 4) as usize] as char
        })
        .collect()
}

fn benchmark_sequence_analysis(c: &mut Criterion) {
    let analyzer = SequenceAnalyzer::default();
    let seq = synthetic_dna(10_000);

    c.bench_function("gc_content_10kb", |b| {
        b.iter(|| analyzer.gc_content(black_box(&seq)));
    });

    c.bench_function("guide_scan_10kb", |b| {
        b.iter(|| analyzer.scan_guide_candidates(black_box(&seq)));
    });

    c.bench_function("codon_optimize_3kb", |b| {
        let coding = &seq[..3_000];
        b.iter(|| analyzer.optimize_codons(black_box(coding), Some(Organism::HomoSapiens)));
    });

    c.bench_function("pcr_feasibility_10kb", |b| {
        let forward = &seq[100..120];
        let reverse = biomind::analysis::reverse_complement(&seq[2_000..2_020]);
        b.iter(|| analyzer.pcr_feasibility(black_box(forward), black_box(&reverse), black_box(&seq)));
    });
}

fn benchmark_classifier(c: &mut Criterion) {
    c.bench_function("classify_query", |b| {
        b.iter(|| {
            classify(black_box(
                "Could you please design CRISPR guide RNAs targeting exon 2 of BRCA1?",
            ))
        });
    });
}

fn benchmark_session_operations(c: &mut Criterion) {
    c.bench_function("session_append", |b| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = Arc::new(ConversationStore::default());

        b.to_async(&rt).iter(|| async {
            store
                .append("benchmark", Turn::user("PCR primers for TP53 in Homo sapiens"))
                .await;
        });
    });
}

fn benchmark_deterministic_query(c: &mut Criterion) {
    c.bench_function("orchestrator_crispr_with_file", |b| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let config = Config::default();
        let orchestrator = QueryOrchestrator::new(
            ProviderRouter::default(),
            Arc::new(ConversationStore::default()),
            Arc::new(InMemoryUsageLedger::new()),
        )
        .with_analyzer(config.analyzer());
        let ctx = config.request_context("bench", Some("enterprise")).unwrap();
        let query = Query::new("Design CRISPR guides for this gene")
            .with_file(ParsedFileContext::from_text(&synthetic_dna(2_000)));
        let cancel = CancellationToken::new();

        b.to_async(&rt).iter(|| async {
            let _ = orchestrator.handle(&query, &ctx, &cancel).await;
        });
    });
}

criterion_group!(
    benches,
    benchmark_sequence_analysis,
    benchmark_classifier,
    benchmark_session_operations,
    benchmark_deterministic_query
);
criterion_main!(benches);
