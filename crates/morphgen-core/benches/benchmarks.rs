//! Criterion benchmarks for the morphgen-core generation pipeline.
//!
//! Snapshots are loaded outside the benchmark loop to measure only
//! resolution, matching and synthesis, not JSON parsing or file I/O.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use std::path::Path;

use morphgen_core::matching::match_records;
use morphgen_core::{generate, Diagnostics, GenerateRequest, Resolver, SchemaRef, Universe};

/// Load a snapshot from the shared test fixtures directory.
fn load_fixture(name: &str) -> Universe {
    let fixtures_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/snapshots");
    let path = Path::new(fixtures_dir).join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    Universe::from_json(&content)
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", path.display(), e))
}

fn shop_request() -> GenerateRequest {
    GenerateRequest::new(
        SchemaRef::new("example.com/shop/domain", "User"),
        SchemaRef::new("example.com/shop/pb", "User"),
    )
}

fn bench_generate_shop(c: &mut Criterion) {
    let universe = load_fixture("shop.json");
    let request = shop_request();

    c.bench_function("generate/shop", |b| {
        b.iter(|| generate(black_box(&universe), black_box(&request)).unwrap())
    });
}

fn bench_generate_identity(c: &mut Criterion) {
    let universe = load_fixture("identity.json");
    let request = GenerateRequest::new(
        SchemaRef::new("example.com/notes/model", "Note"),
        SchemaRef::new("example.com/notes/storage", "NoteRow"),
    );

    c.bench_function("generate/identity", |b| {
        b.iter(|| generate(black_box(&universe), black_box(&request)).unwrap())
    });
}

fn bench_match_only(c: &mut Criterion) {
    let universe = load_fixture("shop.json");
    let request = shop_request();
    let primary = universe.record(&request.primary).unwrap();
    let secondary = universe.record(&request.secondary).unwrap();

    // A fresh resolver per iteration so memoization does not hide the work
    c.bench_function("match/shop", |b| {
        b.iter(|| {
            let mut resolver = Resolver::new(&universe);
            let mut diagnostics = Diagnostics::new();
            match_records(
                &mut resolver,
                black_box(&primary),
                black_box(&secondary),
                &request,
                &mut diagnostics,
            )
            .unwrap()
        })
    });
}

fn bench_load_snapshot(c: &mut Criterion) {
    let fixtures_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/snapshots");
    let content = fs::read_to_string(Path::new(fixtures_dir).join("shop.json")).unwrap();

    c.bench_function("snapshot/shop", |b| {
        b.iter(|| Universe::from_json(black_box(&content)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_generate_shop,
    bench_generate_identity,
    bench_match_only,
    bench_load_snapshot,
);
criterion_main!(benches);
