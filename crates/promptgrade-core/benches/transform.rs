use criterion::{black_box, criterion_group, criterion_main, Criterion};

use promptgrade_core::schema::{to_grading_schema, to_test_input_schema, Schema};
use serde_json::{json, Value};

fn bench_schema_transforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("schema_transform");

    let flat = json!({
        "type": "object",
        "properties": {
            "Answer": {"type": "string", "metrics": ["Correctness"]},
        },
    });

    let nested = generate_nested_schema(4, 4);
    let wide = generate_wide_schema(50);

    let flat_parsed = Schema::parse(&flat).unwrap();
    let nested_parsed = Schema::parse(&nested).unwrap();
    let wide_parsed = Schema::parse(&wide).unwrap();

    group.bench_function("parse_flat", |b| {
        b.iter(|| Schema::parse(black_box(&flat)).unwrap())
    });

    group.bench_function("parse_nested_4x4", |b| {
        b.iter(|| Schema::parse(black_box(&nested)).unwrap())
    });

    group.bench_function("grading_flat", |b| {
        b.iter(|| to_grading_schema(black_box(&flat_parsed)))
    });

    group.bench_function("grading_nested_4x4", |b| {
        b.iter(|| to_grading_schema(black_box(&nested_parsed)))
    });

    group.bench_function("grading_wide_50", |b| {
        b.iter(|| to_grading_schema(black_box(&wide_parsed)))
    });

    group.bench_function("test_input_10_slots", |b| {
        b.iter(|| to_test_input_schema(black_box(&nested_parsed), 10))
    });

    group.finish();
}

/// A schema `depth` levels deep with `width` properties per level, metrics
/// on every leaf.
fn generate_nested_schema(depth: usize, width: usize) -> Value {
    fn level(depth: usize, width: usize) -> Value {
        if depth == 0 {
            return json!({
                "type": "string",
                "metrics": ["Accurate", "Concise"],
            });
        }
        let mut props = serde_json::Map::new();
        for i in 0..width {
            props.insert(format!("field_{i}"), level(depth - 1, width));
        }
        json!({"type": "object", "properties": props})
    }
    level(depth, width)
}

/// A flat schema with `n` metric-bearing string properties.
fn generate_wide_schema(n: usize) -> Value {
    let mut props = serde_json::Map::new();
    for i in 0..n {
        props.insert(
            format!("item_{i}"),
            json!({"type": "string", "metrics": [format!("Metric{i}")]}),
        );
    }
    json!({"type": "object", "properties": props})
}

criterion_group!(benches, bench_schema_transforms);
criterion_main!(benches);
