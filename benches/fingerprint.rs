//! Fingerprint computation benchmark.
#[macro_use]
extern crate criterion;

use cc_compile_action::context::DeclaredIncludeDir;
use cc_compile_action::fingerprint::{compute_key, FingerprintInputs};
use cc_compile_action::path::PathFragment;
use cc_compile_action::Artifact;
use criterion::Criterion;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

fn fingerprint_benchmark(c: &mut Criterion) {
    let env = BTreeMap::new();
    let argv: Vec<String> =
        (0..50).map(|i| format!("-Ipath/to/include{i}")).chain(["a.cc".to_string()]).collect();
    let srcs: BTreeSet<Artifact> = (0..200).map(|i| Artifact::source(format!("h/header{i}.h"))).collect();
    let mandatory: BTreeSet<Artifact> = BTreeSet::new();
    let prunable: BTreeSet<Artifact> = (0..50).map(|i| Artifact::source(format!("h/maybe{i}.h"))).collect();
    let dirs: Vec<DeclaredIncludeDir> =
        (0..20).map(|i| DeclaredIncludeDir::Recursive(PathFragment::new(format!("vendor/lib{i}")))).collect();
    let built_in = vec![PathFragment::new("usr/include")];
    let invalidation: BTreeSet<Artifact> = BTreeSet::new();

    let inputs = FingerprintInputs {
        action_class_id: Uuid::nil(),
        action_environment: &env,
        compile_command_line_environment: &env,
        execution_info: &env,
        argv: &argv,
        declared_include_srcs: &srcs,
        mandatory_inputs: &mandatory,
        additional_prunable_headers: &prunable,
        declared_include_dirs: &dirs,
        built_in_include_directories: &built_in,
        inputs_for_invalidation: &invalidation,
    };

    c.bench_function("compute_key on a 200-header action", |b| {
        b.iter(|| compute_key(&inputs));
    });
}

criterion_group!(benches, fingerprint_benchmark);
criterion_main!(benches);
