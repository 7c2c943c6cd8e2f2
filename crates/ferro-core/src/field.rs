// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Magnetic Field
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Magnetic scalar potential around and inside the droplet.
//!
//! Axisymmetric Laplace problem `div((1 + χ) r grad φ) = 0` discretized
//! with linear elements on [`TriangleGrid`] and relaxed by Gauss-Seidel
//! sweeps. Boundary conditions: `φ = 0` on the equatorial plane (row 0)
//! and the uniform applied field `φ = z` on the infinity column.

use crate::grid::{GridParams, TriangleGrid};
use ferro_math::geometry::{double_triangle_area, linear_gradient};
use ferro_math::interp::{norm_inf_2d, parametric_point, relaxation_2d};
use ferro_types::config::FieldConfig;
use ferro_types::constants::{RELAXATION_BACKOFF, VALIDITY_TOLERANCE};
use ferro_types::state::{Point2, ResultCode};
use log::{debug, trace};
use ndarray::Array2;

/// Neighbour offsets `(row, column)` counter-clockwise around a node.
/// Entries 0 and 7 repeat 6 and 1 so that wedge `k` is always
/// `(OFFSETS[k], OFFSETS[k + 1])`.
const OFFSETS: [(isize, isize); 8] = [
    (-1, 1),
    (0, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
];

/// Stencil weights: index 0 is the node itself, 1..=6 follow [`OFFSETS`].
type Stencil = [f64; 7];

/// Field solver settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldParams {
    pub grid: GridParams,
    pub relax_param_initial: f64,
    pub relax_param_min: f64,
    pub chi: f64,
    pub accuracy: f64,
    pub iterations_max: usize,
}

impl FieldParams {
    pub fn from_config(cfg: &FieldConfig, chi: f64) -> Self {
        FieldParams {
            grid: GridParams::from(cfg),
            relax_param_initial: cfg.relax_param_initial,
            relax_param_min: cfg.relax_param_min,
            chi,
            accuracy: cfg.accuracy,
            iterations_max: cfg.iterations_max,
        }
    }
}

/// Per-sweep hook into [`MagneticField::calc_relaxation_observed`].
pub trait FieldObserver {
    /// Called after every relaxed sweep with the 1-based sweep index,
    /// the L∞ change against the previous sweep and the new potential.
    fn on_sweep(&mut self, sweep: usize, delta: f64, values: &Array2<f64>);
}

/// No-op observer.
impl FieldObserver for () {
    fn on_sweep(&mut self, _sweep: usize, _delta: f64, _values: &Array2<f64>) {}
}

/// Records the convergence history of a relaxation.
#[derive(Debug, Default, Clone)]
pub struct DeltaHistory {
    pub deltas: Vec<f64>,
}

impl FieldObserver for DeltaHistory {
    fn on_sweep(&mut self, _sweep: usize, delta: f64, _values: &Array2<f64>) {
        self.deltas.push(delta);
    }
}

pub struct MagneticField {
    params: FieldParams,
    grid: TriangleGrid,
    last_valid_values: Array2<f64>,
    cur_approx: Array2<f64>,
    next_approx: Array2<f64>,
    inner_derivatives: Vec<Point2>,
    outer_derivatives: Vec<Point2>,
    relaxation_param: f64,
    iterations_counter: usize,
}

impl MagneticField {
    pub fn new(params: FieldParams) -> Self {
        let grid = TriangleGrid::new(params.grid);
        let shape = (grid.rows(), grid.columns());
        let rows = grid.rows();
        MagneticField {
            params,
            grid,
            last_valid_values: Array2::zeros(shape),
            cur_approx: Array2::zeros(shape),
            next_approx: Array2::zeros(shape),
            inner_derivatives: vec![Point2::ZERO; rows],
            outer_derivatives: vec![Point2::ZERO; rows],
            relaxation_param: params.relax_param_initial,
            iterations_counter: 0,
        }
    }

    // ── Parameters ───────────────────────────────────────────────────

    pub fn params(&self) -> FieldParams {
        self.params
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

    pub fn set_iterations_max(&mut self, iterations_max: usize) {
        self.params.iterations_max = iterations_max;
    }

    pub fn set_relaxation_param(&mut self, param: f64) {
        self.relaxation_param = param;
    }

    pub fn relaxation_param(&self) -> f64 {
        self.relaxation_param
    }

    pub fn grid(&self) -> &TriangleGrid {
        &self.grid
    }

    pub fn set_grid(&mut self, grid: TriangleGrid) {
        assert_eq!(
            grid.params(),
            self.params.grid,
            "Grid parameters differ from the field solver's"
        );
        self.grid = grid;
    }

    pub fn last_valid_result(&self) -> &Array2<f64> {
        &self.last_valid_values
    }

    pub fn set_last_valid_result(&mut self, values: Array2<f64>) {
        assert_eq!(
            values.dim(),
            self.last_valid_values.dim(),
            "Potential matrix has a different shape than the grid"
        );
        self.last_valid_values = values;
    }

    /// Potential gradient just inside the surface, one entry per grid row.
    pub fn inner_derivatives(&self) -> &[Point2] {
        &self.inner_derivatives
    }

    /// Potential gradient just outside the surface, one entry per grid row.
    pub fn outer_derivatives(&self) -> &[Point2] {
        &self.outer_derivatives
    }

    pub fn iterations_counter(&self) -> usize {
        self.iterations_counter
    }

    pub fn reset_iterations_counter(&mut self) {
        self.iterations_counter = 0;
    }

    // ── Surface sampling ─────────────────────────────────────────────

    /// Inner gradient at surface parameter `t` (0 = equator, 1 = apex).
    pub fn inner_derivative(&self, t: f64) -> Point2 {
        parametric_point(&self.inner_derivatives, t)
    }

    /// Outer gradient at surface parameter `t` (0 = equator, 1 = apex).
    pub fn outer_derivative(&self, t: f64) -> Point2 {
        parametric_point(&self.outer_derivatives, t)
    }

    // ── Relaxation ───────────────────────────────────────────────────

    /// Zero potential, initial relaxation parameter, cleared counter.
    pub fn calc_initial_approximation(&mut self) {
        self.relaxation_param = self.params.relax_param_initial;
        self.iterations_counter = 0;
        self.last_valid_values.fill(0.0);
    }

    /// Regenerate the grid from a surface ordered apex → equator.
    pub fn update_grid(&mut self, surface: &[Point2]) {
        self.grid.generate(surface);
    }

    pub fn calc_relaxation(&mut self) -> ResultCode {
        self.calc_relaxation_observed(&mut ())
    }

    /// One relaxation attempt starting from the last valid potential.
    ///
    /// On `FieldSuccess` the result is promoted to the last valid potential
    /// and the surface derivatives are recomputed; on any other code the
    /// last valid state is left untouched.
    pub fn calc_relaxation_observed(&mut self, observer: &mut dyn FieldObserver) -> ResultCode {
        let omega = self.relaxation_param;
        let epsilon = self.params.accuracy * omega;

        self.cur_approx.assign(&self.last_valid_values);
        self.apply_boundary_conditions();
        self.next_approx.assign(&self.cur_approx);

        let stencils = self.assemble_stencils();
        let mut counter = 0;
        let mut delta;

        loop {
            std::mem::swap(&mut self.cur_approx, &mut self.next_approx);

            self.sweep(&stencils);
            relaxation_2d(&mut self.next_approx, &self.cur_approx, omega);

            counter += 1;
            delta = norm_inf_2d(&self.next_approx, &self.cur_approx);
            trace!("field sweep {counter}: delta = {delta:e}");
            observer.on_sweep(counter, delta, &self.next_approx);

            if delta <= epsilon || !delta.is_finite() || counter >= self.params.iterations_max {
                break;
            }
        }

        self.iterations_counter += counter;

        let code = if delta.is_finite() && delta > epsilon {
            ResultCode::FieldIterationsLimitExceeded
        } else if !self.is_approximation_valid(&self.next_approx) {
            ResultCode::FieldInvalidResult
        } else {
            std::mem::swap(&mut self.last_valid_values, &mut self.next_approx);
            self.calc_derivatives();
            ResultCode::FieldSuccess
        };

        debug!("field relaxation (omega = {omega}): {code} after {counter} sweeps, delta = {delta:e}");
        code
    }

    /// Repeat [`MagneticField::calc_relaxation_observed`], halving the
    /// relaxation parameter after every failure, until success or until
    /// the parameter drops below its floor.
    pub fn calc_relaxation_with_backoff(&mut self, observer: &mut dyn FieldObserver) -> ResultCode {
        let mut code = ResultCode::FieldInvalidResult;

        while self.relaxation_param >= self.params.relax_param_min
            && code != ResultCode::FieldSuccess
        {
            code = self.calc_relaxation_observed(observer);

            if code != ResultCode::FieldSuccess {
                self.relaxation_param *= RELAXATION_BACKOFF;
                debug!("field relaxation parameter halved to {}", self.relaxation_param);
            }
        }

        code
    }

    fn apply_boundary_conditions(&mut self) {
        let last_column = self.grid.columns() - 1;
        for i in 0..self.grid.rows() {
            self.cur_approx[[i, last_column]] = self.grid.zz()[[i, last_column]];
        }
        self.cur_approx.row_mut(0).fill(0.0);
    }

    #[inline]
    fn neighbour(&self, i: usize, j: usize, k: usize) -> Option<(usize, usize)> {
        let (di, dj) = OFFSETS[k];
        let row = i.checked_add_signed(di)?;
        let column = j.checked_add_signed(dj)?;
        (row < self.grid.rows() && column < self.grid.columns()).then_some((row, column))
    }

    /// Linear-element weights of every node for the current grid and χ.
    fn assemble_stencils(&self) -> Array2<Stencil> {
        let rows = self.grid.rows();
        let columns = self.grid.columns();
        let s = self.grid.surface_column();
        let mut stencils = Array2::from_elem((rows, columns), [0.0; 7]);

        for i in 0..rows {
            for j in 0..columns {
                let a = &mut stencils[[i, j]];
                let v1 = self.grid.point(i, j);

                for k in 1..7 {
                    let (Some(n2), Some(n3)) = (self.neighbour(i, j, k), self.neighbour(i, j, k + 1))
                    else {
                        continue;
                    };
                    let v2 = self.grid.point(n2.0, n2.1);
                    let v3 = self.grid.point(n3.0, n3.1);

                    let inside = j <= s && n2.1 <= s && n3.1 <= s;
                    let chi = if inside { self.params.chi } else { 0.0 };

                    // I / (2A)², with I = 2A (1 + χ) (r1 + r2 + r3) / 6.
                    let area = double_triangle_area(v1, v2, v3);
                    let weight = (1.0 + chi) * (v1.r + v2.r + v3.r) / (6.0 * area);

                    let edge = v3 - v2;
                    a[0] += edge.norm_sq() * weight;
                    a[k] += edge.dot(v1 - v3) * weight;
                    a[k % 6 + 1] += edge.dot(v2 - v1) * weight;
                }
            }
        }

        stencils
    }

    /// Gauss-Seidel sweep into `next_approx`: rows upward from the first
    /// free row, columns from the infinity side toward the axis.
    fn sweep(&mut self, stencils: &Array2<Stencil>) {
        let rows = self.grid.rows();
        let columns = self.grid.columns();

        for i in 1..rows {
            for j in (0..columns - 1).rev() {
                let a = &stencils[[i, j]];
                let mut sum = 0.0;

                for k in 1..7 {
                    if let Some(n) = self.neighbour(i, j, k) {
                        // Offsets 1, 5 and 6 are already updated in this sweep.
                        let value = match k {
                            2..=4 => self.cur_approx[n],
                            _ => self.next_approx[n],
                        };
                        sum += a[k] * value;
                    }
                }

                self.next_approx[[i, j]] = -sum / a[0];
            }
        }
    }

    fn is_approximation_valid(&self, approx: &Array2<f64>) -> bool {
        approx
            .iter()
            .all(|&v| v.is_finite() && v >= -VALIDITY_TOLERANCE)
    }

    /// Surface gradients from the last valid potential (Cramer's rule on
    /// the surface triangles).
    fn calc_derivatives(&mut self) {
        let rows = self.grid.rows();
        let last = rows - 1;
        let s = self.grid.surface_column();
        let phi = &self.last_valid_values;
        let grid = &self.grid;

        let gradient = |a: (usize, usize), b: (usize, usize), c: (usize, usize)| {
            linear_gradient(
                grid.point(a.0, a.1),
                grid.point(b.0, b.1),
                grid.point(c.0, c.1),
                phi[a],
                phi[b],
                phi[c],
            )
        };

        for i in 0..last {
            self.inner_derivatives[i] = gradient((i, s), (i + 1, s - 1), (i, s - 1));
        }
        for i in 1..rows {
            self.outer_derivatives[i] = gradient((i, s), (i - 1, s + 1), (i, s + 1));
        }

        // Apex: only the axial component survives, one-sided into the drop.
        let dz = grid.zz()[[last, s]] - grid.zz()[[last, s - 1]];
        self.inner_derivatives[last] =
            Point2::new(0.0, (phi[[last, s]] - phi[[last, s - 1]]) / dz);

        // Equator: only the radial component survives, one-sided outward.
        let dr = grid.rr()[[0, s + 1]] - grid.rr()[[0, s]];
        self.outer_derivatives[0] = Point2::new((phi[[0, s + 1]] - phi[[0, s]]) / dr, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_2_PI, FRAC_PI_2};

    fn quarter_circle(n: usize, radius: f64) -> Vec<Point2> {
        (0..=n)
            .map(|i| {
                let a = FRAC_PI_2 * i as f64 / n as f64;
                Point2::new(radius * a.sin(), radius * a.cos())
            })
            .collect()
    }

    fn field(surface: usize, internal: usize, external: usize, chi: f64) -> MagneticField {
        let params = FieldParams {
            grid: GridParams {
                surface_splits_num: surface,
                internal_splits_num: internal,
                external_splits_num: external,
                infinity_multiplier: 4.0,
            },
            relax_param_initial: 1.0,
            relax_param_min: 0.1,
            chi,
            accuracy: 1e-9,
            iterations_max: 20_000,
        };
        let mut field = MagneticField::new(params);
        field.update_grid(&quarter_circle(20, FRAC_2_PI));
        field.calc_initial_approximation();
        field
    }

    #[test]
    fn test_initial_approximation_resets_state() {
        let mut f = field(4, 2, 2, 1.0);
        f.set_relaxation_param(0.25);
        f.last_valid_values.fill(3.0);
        f.calc_initial_approximation();
        assert_eq!(f.relaxation_param(), 1.0);
        assert_eq!(f.iterations_counter(), 0);
        assert!(f.last_valid_result().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_stencil_rows_sum_to_zero() {
        // Constants are in the kernel of the operator.
        let f = field(6, 3, 3, 2.0);
        let stencils = f.assemble_stencils();
        for ((i, j), a) in stencils.indexed_iter() {
            let mut sum = a[0];
            for k in 1..7 {
                if f.neighbour(i, j, k).is_some() {
                    sum += a[k];
                }
            }
            assert!(sum.abs() < 1e-9 * a[0].abs().max(1.0), "row sum {sum} at ({i}, {j})");
        }
    }

    #[test]
    fn test_relaxation_succeeds_and_keeps_boundaries() {
        let mut f = field(10, 5, 5, 1.0);
        let code = f.calc_relaxation();
        assert_eq!(code, ResultCode::FieldSuccess);
        assert!(f.iterations_counter() > 0);

        let phi = f.last_valid_result();
        let last_column = f.grid().columns() - 1;
        for j in 0..f.grid().columns() {
            assert_eq!(phi[[0, j]], 0.0, "equatorial plane must stay at zero");
        }
        for i in 0..f.grid().rows() {
            assert_eq!(phi[[i, last_column]], f.grid().zz()[[i, last_column]]);
        }
        assert!(phi.iter().all(|&v| v >= -VALIDITY_TOLERANCE));
    }

    #[test]
    fn test_monotonic_convergence_small_grid() {
        for chi in [1.0, 5.0] {
            let mut f = field(4, 2, 2, chi);
            let mut history = DeltaHistory::default();
            let code = f.calc_relaxation_observed(&mut history);
            assert_eq!(code, ResultCode::FieldSuccess, "chi = {chi}");

            let deltas = &history.deltas;
            assert!(deltas.len() > 2, "expected several sweeps, got {}", deltas.len());
            for w in deltas.windows(2) {
                assert!(
                    w[1] < w[0],
                    "chi = {chi}: sweep delta did not decrease: {} -> {}",
                    w[0],
                    w[1]
                );
            }
            assert!(*deltas.last().unwrap_or(&f64::INFINITY) <= 1e-9);
        }
    }

    #[test]
    fn test_uniform_field_without_drop() {
        // With χ = 0 the medium is homogeneous and φ = z solves the problem
        // exactly on any triangulation.
        let mut f = field(10, 5, 5, 0.0);
        assert_eq!(f.calc_relaxation(), ResultCode::FieldSuccess);
        let phi = f.last_valid_result();
        for ((i, j), &v) in phi.indexed_iter() {
            let z = f.grid().zz()[[i, j]];
            assert!((v - z).abs() < 1e-6, "phi({i}, {j}) = {v}, z = {z}");
        }
        // The outer gradient at the equator keeps only its radial part.
        for d in f.inner_derivatives().iter().chain(&f.outer_derivatives()[1..]) {
            assert!(d.r.abs() < 1e-5 && (d.z - 1.0).abs() < 1e-5, "gradient {d:?}");
        }
    }

    #[test]
    fn test_magnetized_drop_screens_field() {
        let mut f = field(10, 5, 5, 3.0);
        assert_eq!(f.calc_relaxation(), ResultCode::FieldSuccess);
        // Inside a magnetized sphere the field is reduced to 3 / (3 + χ).
        let apex = f.inner_derivative(1.0);
        assert!(apex.z < 0.9 && apex.z > 0.3, "inner dphi/dz at apex = {}", apex.z);
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let mut f = field(10, 5, 5, 1.0);
        f.params.iterations_max = 2;
        let before = f.last_valid_result().clone();
        assert_eq!(f.calc_relaxation(), ResultCode::FieldIterationsLimitExceeded);
        assert_eq!(f.last_valid_result(), &before);
        assert_eq!(f.iterations_counter(), 2);
    }

    #[test]
    fn test_mirrored_drop_gives_invalid_result() {
        let mut f = field(10, 5, 5, 1.0);
        let mirrored: Vec<Point2> = quarter_circle(20, FRAC_2_PI)
            .into_iter()
            .map(|p| Point2::new(p.r, -p.z))
            .collect();
        f.update_grid(&mirrored);
        f.calc_initial_approximation();
        let before = f.last_valid_result().clone();
        assert_eq!(f.calc_relaxation(), ResultCode::FieldInvalidResult);
        assert_eq!(f.last_valid_result(), &before);
    }

    #[test]
    fn test_validity_tolerance() {
        let f = field(4, 2, 2, 1.0);
        let ok = Array2::from_elem((2, 2), -0.5 * VALIDITY_TOLERANCE);
        let negative = Array2::from_elem((2, 2), -2.0 * VALIDITY_TOLERANCE);
        let mut nan = Array2::zeros((2, 2));
        nan[[1, 0]] = f64::NAN;
        assert!(f.is_approximation_valid(&ok));
        assert!(!f.is_approximation_valid(&negative));
        assert!(!f.is_approximation_valid(&nan));
    }

    #[test]
    fn test_backoff_stops_at_floor() {
        let mut f = field(10, 5, 5, 1.0);
        f.params.iterations_max = 1;
        let code = f.calc_relaxation_with_backoff(&mut ());
        assert_eq!(code, ResultCode::FieldIterationsLimitExceeded);
        assert!(f.relaxation_param() < f.params().relax_param_min);
    }
}
