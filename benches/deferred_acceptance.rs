use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use stablematch::{
    BatchRunner, BipartitePartitioner, ComparisonPolicy, InstanceSampler, MatchingConfig,
    NamedInstance, PreferenceGraph, SampleConfig, Side, StabilityChecker, StableMatcher,
};

fn sample(agents: usize, density: f64, seed: u64) -> PreferenceGraph {
    let config = SampleConfig {
        proposers: agents,
        reviewers: agents,
        density,
        reciprocal: true,
        seed: Some(seed),
    };
    InstanceSampler::sample(&config).expect("sample instance")
}

fn partition(graph: &PreferenceGraph) -> Vec<Option<Side>> {
    let mut sides = Vec::new();
    BipartitePartitioner::partition(&graph.graph, &mut sides).expect("bipartite");
    sides
}

fn bench_deferred_acceptance(c: &mut Criterion) {
    let mut group = c.benchmark_group("deferred_acceptance");

    for &(agents, density) in &[(32, 1.0), (128, 1.0), (256, 0.2)] {
        let graph = sample(agents, density, 42);
        let sides = partition(&graph);
        let label = format!("{agents}x{agents}@{density}");

        group.bench_with_input(BenchmarkId::new("partition", &label), &graph, |b, graph| {
            b.iter(|| {
                let mut sides = Vec::with_capacity(graph.node_count());
                BipartitePartitioner::partition(&graph.graph, &mut sides).expect("bipartite");
                black_box(sides);
            });
        });

        group.bench_with_input(BenchmarkId::new("match", &label), &graph, |b, graph| {
            let mut engagement = vec![false; graph.relation_count()];
            b.iter(|| {
                let stats = StableMatcher::run(
                    &graph.graph,
                    &mut engagement,
                    &graph.graph,
                    &ComparisonPolicy::Greater,
                    &sides,
                );
                black_box(stats);
            });
        });

        let mut engagement = vec![false; graph.relation_count()];
        StableMatcher::run(
            &graph.graph,
            &mut engagement,
            &graph.graph,
            &ComparisonPolicy::Greater,
            &sides,
        );
        group.bench_with_input(BenchmarkId::new("verify", &label), &graph, |b, graph| {
            b.iter(|| {
                let report = StabilityChecker::assess(
                    &graph.graph,
                    &engagement,
                    &graph.graph,
                    &ComparisonPolicy::Greater,
                    &sides,
                );
                black_box(report.is_stable);
            });
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let config = SampleConfig {
        proposers: 64,
        reviewers: 64,
        density: 0.5,
        reciprocal: false,
        seed: Some(7),
    };
    let graphs = InstanceSampler::sample_batch(&config, 16).expect("sample batch");
    let runner = BatchRunner::new(MatchingConfig {
        verify: false,
        ..MatchingConfig::default()
    });

    c.bench_function("batch_16x64", |b| {
        b.iter(|| {
            let instances: Vec<NamedInstance> = graphs
                .iter()
                .enumerate()
                .map(|(k, graph)| NamedInstance::new(format!("bench_{k}"), graph.clone()))
                .collect();
            let (_, stats) = runner.run(instances);
            black_box(stats.pairs);
        });
    });
}

criterion_group!(benches, bench_deferred_acceptance, bench_batch);
criterion_main!(benches);
