//! Dispatch and update benchmarks for tirea-reducer.
//!
//! Run with: cargo bench --package tirea-reducer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Map, Value};
use tirea_reducer::{path, set_at, Action, Branch, CompiledTree, Node, StateValue};

// ============================================================================
// Helper functions to generate test data
// ============================================================================

/// Flat tree of `num_nodes` counters, each with an `add` action.
fn generate_flat_tree(num_nodes: usize) -> CompiledTree {
    let mut branch = Branch::new();
    for i in 0..num_nodes {
        branch = branch.with(
            format!("node_{}", i),
            Node::new(0i64).action("add", |n: &mut i64, by: i64| *n += by),
        );
    }
    branch.compile().unwrap()
}

/// Tree with one counter `depth` levels down.
fn generate_nested_tree(depth: usize) -> CompiledTree {
    let mut tree = Branch::new().with(
        "leaf",
        Node::new(0i64).action("add", |n: &mut i64, by: i64| *n += by),
    );
    for i in (0..depth).rev() {
        tree = Branch::new().with(format!("level_{}", i), tree);
    }
    tree.compile().unwrap()
}

/// Flat object with `num_fields` small objects.
fn generate_flat_doc(num_fields: usize) -> Value {
    let mut obj = Map::new();
    for i in 0..num_fields {
        obj.insert(format!("field_{}", i), json!({"value": i}));
    }
    Value::Object(obj)
}

// ============================================================================
// Benchmark: own action dispatch
// ============================================================================

fn bench_dispatch_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_flat_tree");

    for num_nodes in [10, 100, 1000] {
        group.throughput(Throughput::Elements(1));

        let compiled = generate_flat_tree(num_nodes);
        let add = compiled.creator::<i64>(&path!("node_0"), "add").unwrap();
        let action = add.create(1);
        let state = compiled.initial_state().clone();

        group.bench_with_input(
            BenchmarkId::from_parameter(num_nodes),
            &num_nodes,
            |b, _| {
                b.iter(|| {
                    let result = compiled.reduce(black_box(Some(&state)), black_box(&action));
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

fn bench_dispatch_nested(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_nested_tree");

    for depth in [1, 5, 10, 20] {
        let compiled = generate_nested_tree(depth);
        let at = (0..depth)
            .map(|i| format!("level_{}", i))
            .chain(std::iter::once("leaf".to_string()))
            .map(tirea_reducer::Seg::from)
            .collect::<tirea_reducer::Path>();
        let action = compiled.creator::<i64>(&at, "add").unwrap().create(1);
        let state = compiled.initial_state().clone();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let result = compiled.reduce(black_box(Some(&state)), black_box(&action));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_external_noop(c: &mut Criterion) {
    let compiled = generate_flat_tree(100);
    let action = Action::external("app/ping", ());
    let state = compiled.initial_state().clone();

    c.bench_function("dispatch_external_noop", |b| {
        b.iter(|| {
            let result = compiled.reduce(black_box(Some(&state)), black_box(&action));
            black_box(result)
        });
    });
}

// ============================================================================
// Benchmark: structural updates
// ============================================================================

fn bench_set_at(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_at_flat_doc");

    for num_fields in [10, 100, 1000, 10000] {
        let state = StateValue::from(generate_flat_doc(num_fields));
        let target = path!("field_0", "value");
        let value = StateValue::from(json!(-1));

        group.bench_with_input(
            BenchmarkId::from_parameter(num_fields),
            &num_fields,
            |b, _| {
                b.iter(|| {
                    let result = set_at(black_box(&state), black_box(&target), value.clone());
                    black_box(result)
                });
            },
        );
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile_flat_tree");

    for num_nodes in [10, 100, 1000] {
        group.throughput(Throughput::Elements(num_nodes as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_nodes),
            &num_nodes,
            |b, &n| {
                b.iter(|| black_box(generate_flat_tree(n)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_dispatch_flat,
    bench_dispatch_nested,
    bench_external_noop,
    bench_set_at,
    bench_compile,
);
criterion_main!(benches);
