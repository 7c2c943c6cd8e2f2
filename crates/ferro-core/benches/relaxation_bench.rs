// -------------------------------------------------------------------------
// Ferrodrop -- Relaxation Benchmark
// Field relaxation around the seed sphere at two grid resolutions, and
// one fluid relaxation against a fixed field.
// -------------------------------------------------------------------------

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ferro_core::field::{FieldParams, MagneticField};
use ferro_core::fluid::{seed_surface, FluidParams, MagneticFluid};
use ferro_types::config::{FieldConfig, FluidConfig};
use std::hint::black_box;

fn field_config(surface: usize, internal: usize, external: usize) -> FieldConfig {
    FieldConfig {
        surface_splits_num: surface,
        internal_splits_num: internal,
        external_splits_num: external,
        accuracy: 1e-6,
        iterations_max: 20_000,
        ..FieldConfig::default()
    }
}

fn run_field(cfg: &FieldConfig) {
    let mut field = MagneticField::new(FieldParams::from_config(cfg, 1.0));
    field.update_grid(&seed_surface(40));
    field.calc_initial_approximation();
    let code = field.calc_relaxation();
    black_box((code, field.iterations_counter()));
}

fn bench_field_relaxation(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_relaxation");
    // Full relaxations; keep wall time reasonable.
    group.sample_size(10);

    for &(s, i, e) in &[(10usize, 5usize, 5usize), (20, 10, 10)] {
        let cfg = field_config(s, i, e);
        group.bench_with_input(
            BenchmarkId::new("seed_sphere", format!("{s}/{i}/{e}")),
            &cfg,
            |b, cfg| b.iter(|| run_field(cfg)),
        );
    }

    group.finish();
}

fn bench_fluid_relaxation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fluid_relaxation");
    group.sample_size(10);

    let mut field = MagneticField::new(FieldParams::from_config(&field_config(10, 5, 5), 1.0));
    field.update_grid(&seed_surface(100));
    field.calc_initial_approximation();
    field.calc_relaxation();
    let derivatives: Vec<_> = (0..=100)
        .map(|i| field.inner_derivative(1.0 - i as f64 / 100.0))
        .collect();

    for &splits in &[40usize, 100usize] {
        let cfg = FluidConfig {
            splits_num: splits,
            accuracy: 1e-6,
            iterations_max: 5000,
            ..FluidConfig::default()
        };
        let sampled: Vec<_> = (0..=splits)
            .map(|i| ferro_math::interp::parametric_point(&derivatives, i as f64 / splits as f64))
            .collect();

        group.bench_with_input(BenchmarkId::new("w_0.5", splits), &cfg, |b, cfg| {
            b.iter(|| {
                let mut fluid = MagneticFluid::new(FluidParams::from_config(cfg, 1.0));
                fluid.set_w(0.5);
                fluid.calc_initial_approximation();
                fluid.set_derivatives(sampled.clone());
                black_box(fluid.calc_relaxation())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_field_relaxation, bench_fluid_relaxation);
criterion_main!(benches);
