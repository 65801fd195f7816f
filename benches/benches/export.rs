//! Benchmarks for canvas export and import
//!
//! Performance-critical paths:
//! - `Canvas::to_json`: snapshot plus serialization
//! - `Canvas::from_json`: parse plus structural validation

use canvas_kernel::{Canvas, CheckoutOptions, Message};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Canvas with `branches` forks of `depth` turns each off one root.
fn branched_canvas(branches: usize, depth: usize) -> Canvas {
    let canvas = Canvas::new(None, Some("bench".into()), None);
    let root = canvas
        .commit_message("main", Message::user("root"), None)
        .expect("commit");
    for b in 0..branches {
        let branch = canvas
            .checkout(
                CheckoutOptions::branch(format!("b{b}"))
                    .create_if_not_exists(true)
                    .start_from(root.id.clone()),
            )
            .expect("checkout");
        for d in 0..depth {
            branch
                .commit_message(Message::assistant(format!("{b}/{d}")), None)
                .expect("commit");
        }
    }
    canvas
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    for branches in [1usize, 10, 50] {
        let canvas = branched_canvas(branches, 20);
        group.bench_with_input(BenchmarkId::new("to_json", branches), &canvas, |b, canvas| {
            b.iter(|| black_box(canvas.to_json().expect("export")));
        });

        let json = canvas.to_json().expect("export");
        group.bench_with_input(BenchmarkId::new("from_json", branches), &json, |b, json| {
            b.iter(|| black_box(Canvas::from_json(json).expect("import")));
        });
    }

    group.finish();
}

fn bench_summary(c: &mut Criterion) {
    let canvas = branched_canvas(10, 20);
    c.bench_function("summary", |b| {
        b.iter(|| black_box(serde_json::to_string(&canvas.summary()).expect("serialize")));
    });
}

criterion_group!(benches, bench_export, bench_summary);
criterion_main!(benches);
