//! Route table benchmarks.
//!
//! Run with: `cargo bench -p gantry-router`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gantry_router::RouteTable;

fn build_table(num_routes: usize) -> RouteTable<String> {
    let mut table = RouteTable::new();

    for i in 0..num_routes / 3 {
        table
            .register(&format!("/api/v1/resource{i}"), format!("list{i}"))
            .unwrap();
    }
    for i in 0..num_routes / 3 {
        table
            .register(&format!("/api/v1/resource{i}/{{id}}"), format!("show{i}"))
            .unwrap();
    }
    for i in 0..num_routes / 3 {
        table
            .register(
                &format!("/api/v1/org/{{orgId}}/resource{i}/{{id}}"),
                format!("orgShow{i}"),
            )
            .unwrap();
    }

    table
}

fn bench_exact(c: &mut Criterion) {
    let table = build_table(99);
    c.bench_function("exact_lookup", |b| {
        b.iter(|| black_box(table.find("/api/v1/resource20")));
    });
}

fn bench_templated(c: &mut Criterion) {
    let table = build_table(99);
    c.bench_function("templated_scan", |b| {
        b.iter(|| black_box(table.find("/api/v1/resource25/12345")));
    });
}

fn bench_miss(c: &mut Criterion) {
    let table = build_table(99);
    c.bench_function("miss", |b| {
        b.iter(|| black_box(table.find("/api/v1/nonexistent/path/x")));
    });
}

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("templated_scaling");
    for size in [30, 90, 300] {
        let table = build_table(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &table, |b, table| {
            b.iter(|| black_box(table.find("/api/v1/org/acme/resource5/1")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_exact, bench_templated, bench_miss, bench_scaling);
criterion_main!(benches);
