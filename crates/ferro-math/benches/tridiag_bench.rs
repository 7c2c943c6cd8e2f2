use criterion::{criterion_group, criterion_main, Criterion};
use ferro_math::interp::parametric_point;
use ferro_math::tridiag::RightSweep;
use ferro_types::state::Point2;
use std::hint::black_box;

fn laplacian(n: usize) -> RightSweep {
    let mut sweep = RightSweep::new(n, false);
    for i in 0..n {
        sweep.set_row(i, 1.0, -2.5, 1.0, (i as f64).cos());
    }
    sweep
}

fn bench_right_sweep_101(c: &mut Criterion) {
    let mut sweep = laplacian(101);
    let mut x = vec![0.0; 101];
    c.bench_function("right_sweep_101", |b| {
        b.iter(|| {
            sweep.solve(&mut x);
            black_box(x[50]);
        })
    });
}

fn bench_right_sweep_1001(c: &mut Criterion) {
    let mut sweep = laplacian(1001);
    let mut x = vec![0.0; 1001];
    c.bench_function("right_sweep_1001", |b| {
        b.iter(|| {
            sweep.solve(&mut x);
            black_box(x[500]);
        })
    });
}

fn bench_parametric_point(c: &mut Criterion) {
    let pts: Vec<Point2> = (0..101)
        .map(|i| {
            let a = std::f64::consts::FRAC_PI_2 * i as f64 / 100.0;
            Point2::new(a.sin(), a.cos())
        })
        .collect();
    c.bench_function("parametric_point_101", |b| {
        b.iter(|| {
            let mut acc = Point2::ZERO;
            for k in 0..=50 {
                acc += parametric_point(&pts, black_box(k as f64 / 50.0));
            }
            black_box(acc)
        })
    });
}

criterion_group!(
    benches,
    bench_right_sweep_101,
    bench_right_sweep_1001,
    bench_parametric_point
);
criterion_main!(benches);
