//! Criterion benchmarks for flag resolution and bundle generation
//!
//! Resolution runs once per provisioning request per component; generation
//! adds template rendering and gzip encoding of every enabled entry.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use clustergen::{generate, ClusterSpec, ComponentKind, EmbeddedAssets};
use clustergen_common::spec::IdentityProfile;
use clustergen_resolver::resolve;

// =============================================================================
// Fixtures
// =============================================================================

const VERSIONS: &[&str] = &["1.9.11", "1.13.12", "1.16.9", "1.24.3"];

fn identity_cluster(version: &str) -> ClusterSpec {
    let mut spec = ClusterSpec::new(version, "chinaeast2");
    spec.identity = Some(IdentityProfile::new("tenant", "server"));
    spec.overrides
        .entry(ComponentKind::ApiServer)
        .insert("--admission-control".to_string(), "NamespaceLifecycle,ServiceAccount".to_string());
    spec
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_resolve_apiserver(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_apiserver");
    for version in VERSIONS {
        let spec = identity_cluster(version);
        let overrides = spec.overrides_for(ComponentKind::ApiServer).clone();
        group.bench_with_input(BenchmarkId::from_parameter(version), &spec, |b, spec| {
            b.iter(|| resolve(black_box(spec), ComponentKind::ApiServer, &overrides))
        });
    }
    group.finish();
}

fn bench_resolve_all(c: &mut Criterion) {
    let spec = identity_cluster("1.16.9");
    c.bench_function("resolve_all", |b| {
        b.iter(|| clustergen_resolver::resolve_all(black_box(&spec)))
    });
}

fn bench_generate(c: &mut Criterion) {
    let spec = identity_cluster("1.16.9");
    c.bench_function("generate", |b| {
        b.iter(|| generate(black_box(&spec), &EmbeddedAssets))
    });
}

criterion_group!(benches, bench_resolve_apiserver, bench_resolve_all, bench_generate);
criterion_main!(benches);
