//! Benchmarks for branch operations on a canvas
//!
//! Performance-critical paths:
//! - `Branch::commit_message`: node creation, parent link and HEAD move
//! - `Canvas::merge`: donor HEAD resolution and back-links
//! - `Branch::history`: ancestry walk from HEAD
//! - Event fan-out to several subscribers

use canvas_kernel::{Canvas, CheckoutOptions, Message};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn linear_canvas(depth: usize) -> Canvas {
    let canvas = Canvas::new(None, None, None);
    for i in 0..depth {
        canvas
            .commit_message("main", Message::user(format!("turn {i}")), None)
            .expect("commit");
    }
    canvas
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit_message");

    for subscribers in [0usize, 1, 8] {
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let canvas = Canvas::new(None, None, None);
                for _ in 0..subscribers {
                    canvas.subscribe(|event| {
                        black_box(event.kind());
                    });
                }
                let main = canvas.checkout(CheckoutOptions::new()).expect("checkout");
                b.iter(|| {
                    main.commit_message(black_box(Message::user("hello")), None)
                        .expect("commit")
                });
            },
        );
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for sources in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::new("sources", sources), &sources, |b, &sources| {
            let canvas = linear_canvas(1);
            let names: Vec<String> = (0..sources).map(|i| format!("f{i}")).collect();
            for name in &names {
                let branch = canvas
                    .checkout(CheckoutOptions::branch(name.clone()).create_if_not_exists(true))
                    .expect("checkout");
                branch
                    .commit_message(Message::assistant("alt"), None)
                    .expect("commit");
            }
            canvas.checkout(CheckoutOptions::branch("main")).expect("checkout");
            b.iter(|| {
                canvas
                    .merge(black_box(names.as_slice()), Message::system("merge"), "main")
                    .expect("merge")
            });
        });
    }

    group.finish();
}

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");

    for depth in [10usize, 100, 1000] {
        let canvas = linear_canvas(depth);
        let main = canvas.branch("main").expect("main");
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| black_box(main.history().expect("history")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_commit, bench_merge, bench_history);
criterion_main!(benches);
