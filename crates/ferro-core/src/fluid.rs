// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Magnetic Fluid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Free surface of the magnetic fluid droplet.
//!
//! The meridian is parametrized by arc length `s ∈ [0, 1]` from the apex
//! (index 0) to the equator (last index). Each relaxation step solves two
//! tridiagonal systems, one for `r(s)` with `z` frozen and one for `z(s)`
//! with the fresh `r`, and relaxes both toward the previous iterate.

use ferro_math::interp::{norm_inf, relaxation};
use ferro_math::tridiag::RightSweep;
use ferro_types::config::FluidConfig;
use ferro_types::constants::{SEED_SPHERE_RADIUS, VALIDITY_TOLERANCE};
use ferro_types::state::{Point2, ResultCode};
use log::{debug, trace};
use std::f64::consts::{FRAC_PI_2, PI};

/// Fluid solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidParams {
    /// Magnetic Bond number.
    pub w: f64,
    /// Magnetic susceptibility.
    pub chi: f64,
    pub accuracy: f64,
    pub iterations_max: usize,
    pub relax_param_initial: f64,
    pub relax_param_min: f64,
    pub splits_num: usize,
    pub pedantic_right_sweep: bool,
}

impl FluidParams {
    pub fn from_config(cfg: &FluidConfig, chi: f64) -> Self {
        FluidParams {
            w: 0.0,
            chi,
            accuracy: cfg.accuracy,
            iterations_max: cfg.iterations_max,
            relax_param_initial: cfg.relax_param_initial,
            relax_param_min: cfg.relax_param_min,
            splits_num: cfg.splits_num,
            pedantic_right_sweep: cfg.pedantic_right_sweep,
        }
    }
}

/// `2π Σ r_i z_i (r_{i+1} - r_{i-1})` over interior points.
///
/// Central-difference quadrature of `4π ∫ r z dr`, the volume of the
/// whole (mirror-symmetric) droplet.
pub fn volume_integral(r: &[f64], z: &[f64]) -> f64 {
    let n = r.len();
    let sum: f64 = (1..n - 1).map(|i| r[i] * z[i] * (r[i + 1] - r[i - 1])).sum();
    2.0 * PI * sum
}

/// Scale that maps a droplet with meridian `surface` to unit volume.
pub fn volume_nondim_mul(surface: &[Point2]) -> f64 {
    let (r, z): (Vec<f64>, Vec<f64>) = surface.iter().map(|p| (p.r, p.z)).unzip();
    1.0 / volume_integral(&r, &z).cbrt()
}

/// Quarter circle of unit arc length (a sphere of radius 2/π) sampled at
/// `splits_num + 1` equidistant arc points, apex first.
pub fn seed_surface(splits_num: usize) -> Vec<Point2> {
    let h = 1.0 / splits_num as f64;
    (0..=splits_num)
        .map(|i| {
            let angle = FRAC_PI_2 * i as f64 * h;
            Point2::new(
                SEED_SPHERE_RADIUS * angle.sin(),
                SEED_SPHERE_RADIUS * angle.cos(),
            )
        })
        .collect()
}

/// Magnetic pressure on the surface for a fixed set of potential
/// derivatives.
struct Forcing<'a> {
    derivatives: &'a [Point2],
    w: f64,
    chi: f64,
    step: f64,
}

impl Forcing<'_> {
    /// `½ W (n² + |∇φ|²/χ) / ∛V` at point `index`, `n` the normal derivative.
    fn magnetic_f(&self, r: &[f64], z: &[f64], index: usize, volume_cbrt: f64) -> f64 {
        // A non-magnetic fluid feels no field.
        if self.chi <= 0.0 {
            return 0.0;
        }

        let last = r.len() - 1;
        let d = self.derivatives[index];
        let normal = if index == 0 {
            d.z
        } else if index == last {
            d.r
        } else {
            0.5 * (-(z[index + 1] - z[index - 1]) * d.r + (r[index + 1] - r[index - 1]) * d.z)
                / self.step
        };

        0.5 * self.w * (normal * normal + d.norm_sq() / self.chi) / volume_cbrt
    }

    fn magnetic_integral(&self, r: &[f64], z: &[f64], volume_cbrt: f64) -> f64 {
        let n = r.len();
        let sum: f64 = (1..n - 1)
            .map(|i| r[i] * (r[i + 1] - r[i - 1]) * self.magnetic_f(r, z, i, volume_cbrt))
            .sum();
        0.5 * sum
    }

    /// Pressure constant fixed by the force balance at the equator.
    fn q(&self, r: &[f64], z: &[f64], volume_cbrt: f64) -> f64 {
        let inv_r = 1.0 / r[r.len() - 1];
        -2.0 * inv_r * (1.0 - self.magnetic_integral(r, z, volume_cbrt) * inv_r)
    }
}

pub struct MagneticFluid {
    params: FluidParams,
    points_num: usize,
    step: f64,
    right_sweep: RightSweep,
    last_valid_result: Vec<Point2>,
    derivatives: Vec<Point2>,
    next_r: Vec<f64>,
    next_z: Vec<f64>,
    cur_r: Vec<f64>,
    cur_z: Vec<f64>,
    relaxation_param: f64,
    iterations_counter: usize,
}

impl MagneticFluid {
    pub fn new(params: FluidParams) -> Self {
        assert!(
            params.splits_num >= 3,
            "Fluid surface needs at least 3 splits, got {}",
            params.splits_num
        );
        let n = params.splits_num + 1;
        MagneticFluid {
            params,
            points_num: n,
            step: 1.0 / params.splits_num as f64,
            right_sweep: RightSweep::new(n, params.pedantic_right_sweep),
            last_valid_result: vec![Point2::ZERO; n],
            derivatives: vec![Point2::ZERO; n],
            next_r: vec![0.0; n],
            next_z: vec![0.0; n],
            cur_r: vec![0.0; n],
            cur_z: vec![0.0; n],
            relaxation_param: params.relax_param_initial,
            iterations_counter: 0,
        }
    }

    // ── Parameters ───────────────────────────────────────────────────

    pub fn params(&self) -> FluidParams {
        self.params
    }

    pub fn set_w(&mut self, w: f64) {
        self.params.w = w;
    }

    pub fn w(&self) -> f64 {
        self.params.w
    }

    pub fn set_chi(&mut self, chi: f64) {
        self.params.chi = chi;
    }

    pub fn chi(&self) -> f64 {
        self.params.chi
    }

    pub fn set_accuracy(&mut self, accuracy: f64) {
        self.params.accuracy = accuracy;
    }

    pub fn set_relaxation_param(&mut self, param: f64) {
        self.relaxation_param = param;
    }

    pub fn relaxation_param(&self) -> f64 {
        self.relaxation_param
    }

    pub fn points_num(&self) -> usize {
        self.points_num
    }

    pub fn set_last_valid_result(&mut self, values: Vec<Point2>) {
        assert_eq!(
            values.len(),
            self.points_num,
            "Surface has a different number of points than the fluid solver"
        );
        self.last_valid_result = values;
    }

    /// Last accepted surface, apex first.
    pub fn last_valid_result(&self) -> &[Point2] {
        &self.last_valid_result
    }

    /// Potential gradient at every surface point.
    pub fn set_derivatives(&mut self, values: Vec<Point2>) {
        assert_eq!(
            values.len(),
            self.points_num,
            "Derivatives have a different number of points than the fluid solver"
        );
        self.derivatives = values;
    }

    pub fn derivatives(&self) -> &[Point2] {
        &self.derivatives
    }

    pub fn iterations_counter(&self) -> usize {
        self.iterations_counter
    }

    pub fn reset_iterations_counter(&mut self) {
        self.iterations_counter = 0;
    }

    // ── Surface characteristics ──────────────────────────────────────

    /// Apex height over equatorial radius. 1 for a sphere.
    pub fn height_coef(&self) -> f64 {
        self.last_valid_result[0].z / self.last_valid_result[self.points_num - 1].r
    }

    /// Scale that maps the droplet to unit volume.
    pub fn volume_nondim_mul(&self) -> f64 {
        volume_nondim_mul(&self.last_valid_result)
    }

    // ── Relaxation ───────────────────────────────────────────────────

    /// Seed the surface with [`seed_surface`].
    pub fn calc_initial_approximation(&mut self) {
        self.last_valid_result = seed_surface(self.params.splits_num);
    }

    /// One relaxation attempt starting from the last valid surface.
    ///
    /// Only `FluidSuccess` replaces the last valid surface.
    pub fn calc_relaxation(&mut self) -> ResultCode {
        let omega = self.relaxation_param;
        let epsilon = self.params.accuracy * omega;

        for (i, p) in self.last_valid_result.iter().enumerate() {
            self.next_r[i] = p.r;
            self.next_z[i] = p.z;
        }

        let mut counter = 0;
        let mut delta;

        loop {
            std::mem::swap(&mut self.next_r, &mut self.cur_r);
            std::mem::swap(&mut self.next_z, &mut self.cur_z);

            self.calc_next_approximation_r();
            relaxation(&mut self.next_r, &self.cur_r, omega);

            self.calc_next_approximation_z();
            relaxation(&mut self.next_z, &self.cur_z, omega);

            counter += 1;
            delta = norm_inf(&self.next_r, &self.cur_r).max(norm_inf(&self.next_z, &self.cur_z));
            trace!("fluid iteration {counter}: delta = {delta:e}");

            if delta <= epsilon || !delta.is_finite() || counter >= self.params.iterations_max {
                break;
            }
        }

        self.iterations_counter += counter;

        let code = if delta.is_finite() && delta > epsilon {
            ResultCode::FluidIterationsLimitExceeded
        } else if !is_approximation_valid(&self.next_r) || !is_approximation_valid(&self.next_z) {
            ResultCode::FluidInvalidResult
        } else {
            for (p, (&r, &z)) in self
                .last_valid_result
                .iter_mut()
                .zip(self.next_r.iter().zip(&self.next_z))
            {
                *p = Point2::new(r, z);
            }
            ResultCode::FluidSuccess
        };

        debug!(
            "fluid relaxation (W = {}, omega = {omega}): {code} after {counter} iterations, delta = {delta:e}",
            self.params.w
        );
        code
    }

    /// Solve for `next_r` with `cur_r`, `cur_z` frozen.
    fn calc_next_approximation_r(&mut self) {
        let n = self.points_num;
        let h = self.step;
        let (r, z) = (&self.cur_r, &self.cur_z);
        let forcing = Forcing {
            derivatives: &self.derivatives,
            w: self.params.w,
            chi: self.params.chi,
            step: h,
        };
        let volume_cbrt = volume_integral(r, z).cbrt();
        let q = forcing.q(r, z, volume_cbrt);
        let sweep = &mut self.right_sweep;

        // r(0) = 0 on the axis, r(h) = h since |dr/ds| = 1 at the apex.
        sweep.set_row(0, 0.0, 1.0, 0.0, 0.0);
        sweep.set_row(1, 0.0, 1.0, 0.0, h);

        for i in 2..n - 1 {
            let t = 0.5 * (z[i + 1] - z[i - 1]);
            let f = forcing.magnetic_f(r, z, i, volume_cbrt);
            sweep.set_row(i, 1.0, -2.0, 1.0, -h * t * (q - t / (h * r[i]) - f));
        }

        let f_last = forcing.magnetic_f(r, z, n - 1, volume_cbrt);
        sweep.set_row(
            n - 1,
            -1.0,
            1.0,
            0.0,
            0.5 * h * h * (q - f_last + 1.0 / r[n - 1]),
        );

        sweep.solve(&mut self.next_r);
    }

    /// Solve for `next_z` with the fresh `next_r`; the pressure terms use
    /// the previous iterate.
    fn calc_next_approximation_z(&mut self) {
        let n = self.points_num;
        let h = self.step;
        let (r, prev_r, z) = (&self.next_r, &self.cur_r, &self.cur_z);
        let forcing = Forcing {
            derivatives: &self.derivatives,
            w: self.params.w,
            chi: self.params.chi,
            step: h,
        };
        let volume_cbrt = volume_integral(prev_r, z).cbrt();
        let q = forcing.q(prev_r, z, volume_cbrt);
        let sweep = &mut self.right_sweep;

        let f_first = forcing.magnetic_f(prev_r, z, 0, volume_cbrt);
        sweep.set_row(0, 0.0, -1.0, 1.0, 0.25 * h * h * (q - f_first));

        for i in 1..n - 2 {
            let f = forcing.magnetic_f(prev_r, z, i, volume_cbrt);
            sweep.set_row(
                i,
                1.0 + r[i - 1] / r[i],
                -(2.0 + (r[i + 1] + r[i - 1]) / r[i]),
                1.0 + r[i + 1] / r[i],
                h * (r[i + 1] - r[i - 1]) * (q - f),
            );
        }

        let f_last = forcing.magnetic_f(prev_r, z, n - 1, volume_cbrt);
        sweep.set_row(
            n - 2,
            0.0,
            1.0,
            0.0,
            h * (1.0 - 0.5 * h * (q - f_last + 1.0 / prev_r[n - 1])),
        );
        // z = 0 on the equatorial plane.
        sweep.set_row(n - 1, 0.0, 1.0, 0.0, 0.0);

        sweep.solve(&mut self.next_z);
    }
}

fn is_approximation_valid(values: &[f64]) -> bool {
    values
        .iter()
        .all(|&v| v.is_finite() && v >= -VALIDITY_TOLERANCE)
}
