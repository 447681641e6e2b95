//! Selector Operations Benchmarks
//!
//! Benchmarks for selector parsing, whole-map resolution and locator
//! chaining over in-memory maps.
//!
//! Run with: `cargo bench --bench selector_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mapgrab::prelude::*;
use serde_json::json;

fn bench_selector_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_parsing");

    let selectors = vec![
        ("map_only", "map[id=main]"),
        ("layer_id", "layer[id=roads]"),
        ("layer_list", "layer[id=[roads,rails,paths]]"),
        ("layer_type", "layer[id*=road][type=line]"),
        ("filter", r#"filter["==", ["get", "kind"], "cafe"]"#),
        (
            "full",
            r#"map[id=123] layer[id=layer1] filter["all", ["==", ["get", "id"], 123], ["has", "name"]]"#,
        ),
    ];

    for (name, selector) in selectors {
        group.bench_with_input(BenchmarkId::from_parameter(name), &selector, |bench, sel| {
            bench.iter(|| {
                let parsed = Selector::parse(black_box(sel));
                black_box(parsed)
            });
        });
    }

    group.finish();
}

fn grid_map(side: usize) -> SceneMap {
    let mut scene = SceneMap::new(Camera::new(0.0, 0.0, 4.0, 1024.0, 768.0))
        .with_layer(
            SceneLayer::new("dots", LayerType::Circle, "points").with_paint("circle-radius", json!(3)),
        )
        .with_layer(SceneLayer::new("labels", LayerType::Symbol, "points"));
    for i in 0..side {
        for j in 0..side {
            let lng = -20.0 + 40.0 * i as f64 / side as f64;
            let lat = -15.0 + 30.0 * j as f64 / side as f64;
            let id = (i * side + j) as i64;
            scene = scene.with_feature(
                "points",
                SceneFeature::point(id, [lng, lat]).with_property("kind", json!(id % 3)),
            );
        }
    }
    scene
}

fn bench_map_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_resolution");
    group.sample_size(20);

    for side in [5usize, 10, 20] {
        let mut grab = MapGrab::new();
        grab.register("grid", Box::new(grid_map(side)));

        group.bench_with_input(
            BenchmarkId::new("circles", side * side),
            &grab,
            |bench, grab| {
                bench.iter(|| black_box(grab.query("layer[type=circle]").unwrap()));
            },
        );
        group.bench_with_input(
            BenchmarkId::new("filtered", side * side),
            &grab,
            |bench, grab| {
                bench.iter(|| {
                    black_box(
                        grab.query(r#"layer[id=dots] filter["==", ["get", "kind"], 0]"#)
                            .unwrap(),
                    )
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("symbols", side * side),
            &grab,
            |bench, grab| {
                bench.iter(|| black_box(grab.query("layer[type=symbol]").unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_locator_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("locator_merge");
    group.sample_size(20);

    let mut grab = MapGrab::new();
    grab.register("grid", Box::new(grid_map(10)));

    group.bench_function("merge_all", |bench| {
        bench.iter(|| black_box(grab.locator("layer[id=dots]").merge_all().element().unwrap()));
    });
    group.bench_function("merge_by_property", |bench| {
        bench.iter(|| {
            black_box(
                grab.locator("layer[id=dots]")
                    .merge_by_property("kind")
                    .count()
                    .unwrap(),
            )
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_selector_parsing,
    bench_map_resolution,
    bench_locator_merge
);
criterion_main!(benches);
