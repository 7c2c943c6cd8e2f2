// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Solution
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Coupled droplet/field solution.
//!
//! Alternates fluid and field relaxations until both settle, rolling back
//! to the last accepted state and halving the failing solver's relaxation
//! parameter whenever an attempt breaks down.

use crate::field::{FieldObserver, FieldParams, MagneticField};
use crate::fluid::{seed_surface, FluidParams, MagneticFluid};
use crate::grid::TriangleGrid;
use ferro_math::interp::{norm_inf_2d, norm_inf_points};
use ferro_types::config::ProblemConfig;
use ferro_types::constants::{RELAXATION_BACKOFF, SEED_SPHERE_RADIUS, TARGET_W_TOLERANCE};
use ferro_types::error::FerroResult;
use ferro_types::state::{Point2, ResultCode};
use log::{debug, info, warn};
use ndarray::Array2;

/// Last accepted surface, grid and potential.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub surface: Vec<Point2>,
    pub grid: TriangleGrid,
    pub potential: Array2<f64>,
}

/// Field around the fixed seed sphere, compared with the closed form.
#[derive(Debug, Clone)]
pub struct FieldModelResult {
    pub chi: f64,
    pub surface: Vec<Point2>,
    pub grid: TriangleGrid,
    pub potential: Array2<f64>,
    /// `φ_numeric - φ_analytic` on every node.
    pub error: Array2<f64>,
    /// Largest absolute discrepancy after every sweep of every attempt.
    pub error_history: Vec<f64>,
}

/// Potential of a sphere of radius `radius` and susceptibility `chi`
/// placed in the uniform field `φ = z`.
///
/// Inside: `b z`; outside: `z - (1 - b) R³ z / ρ³`, with `b = 3 / (3 + χ)`.
/// Nodes on the surface column count as inside.
pub fn sphere_potential(grid: &TriangleGrid, radius: f64, chi: f64) -> Array2<f64> {
    let b = 3.0 / (3.0 + chi);
    let radius_cubed = radius.powi(3);

    Array2::from_shape_fn((grid.rows(), grid.columns()), |(i, j)| {
        let p = grid.point(i, j);
        if grid.is_inside(i, j) {
            b * p.z
        } else {
            p.z - (1.0 - b) * radius_cubed * p.z / p.norm().powi(3)
        }
    })
}

/// Tracks the distance to a reference potential during relaxation.
struct ModelDiscrepancy<'a> {
    analytic: &'a Array2<f64>,
    history: Vec<f64>,
}

impl FieldObserver for ModelDiscrepancy<'_> {
    fn on_sweep(&mut self, _sweep: usize, _delta: f64, values: &Array2<f64>) {
        self.history.push(norm_inf_2d(values, self.analytic));
    }
}

pub struct Solution {
    config: ProblemConfig,
    fluid: MagneticFluid,
    field: MagneticField,
    snapshot: Snapshot,
    chi: f64,
    step_w: f64,
    cur_w: f64,
    model: Option<FieldModelResult>,
}

impl Solution {
    /// Validate `config` and size both solvers from it.
    pub fn new(config: ProblemConfig) -> FerroResult<Self> {
        config.validate()?;

        let chi = config.sweep.chi_initial;
        let fluid = MagneticFluid::new(FluidParams::from_config(&config.fluid, chi));
        let field = MagneticField::new(FieldParams::from_config(&config.field, chi));

        let (step_w, cur_w) = if config.sweep.results_num_w == 1 {
            (config.sweep.w_target, config.sweep.w_target)
        } else {
            let intervals = config.sweep.results_num_w.saturating_sub(1).max(1);
            (config.sweep.w_target / intervals as f64, 0.0)
        };

        let snapshot = Snapshot {
            surface: fluid.last_valid_result().to_vec(),
            grid: field.grid().clone(),
            potential: field.last_valid_result().clone(),
        };

        Ok(Solution {
            config,
            fluid,
            field,
            snapshot,
            chi,
            step_w,
            cur_w,
            model: None,
        })
    }

    // ── Parameters and reporting ─────────────────────────────────────

    pub fn config(&self) -> &ProblemConfig {
        &self.config
    }

    pub fn set_chi(&mut self, chi: f64) {
        self.chi = chi;
        self.fluid.set_chi(chi);
        self.field.set_chi(chi);
    }

    pub fn chi(&self) -> f64 {
        self.chi
    }

    /// Last W reached with `Success`.
    pub fn current_w(&self) -> f64 {
        self.cur_w
    }

    pub fn step_w(&self) -> f64 {
        self.step_w
    }

    pub fn height_coef(&self) -> f64 {
        self.fluid.height_coef()
    }

    pub fn volume_nondim_mul(&self) -> f64 {
        self.fluid.volume_nondim_mul()
    }

    pub fn fluid_surface(&self) -> &[Point2] {
        self.fluid.last_valid_result()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn fluid(&self) -> &MagneticFluid {
        &self.fluid
    }

    pub fn fluid_mut(&mut self) -> &mut MagneticFluid {
        &mut self.fluid
    }

    pub fn field(&self) -> &MagneticField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut MagneticField {
        &mut self.field
    }

    pub fn model_result(&self) -> Option<&FieldModelResult> {
        self.model.as_ref()
    }

    /// Discrepancy of the last successful field model problem.
    pub fn model_error(&self) -> Option<&Array2<f64>> {
        self.model.as_ref().map(|m| &m.error)
    }

    pub fn reset_iterations_counters(&mut self) {
        self.fluid.reset_iterations_counter();
        self.field.reset_iterations_counter();
    }

    // ── Main calculations ────────────────────────────────────────────

    /// Seed sphere at the current W, relaxed field, fresh snapshot.
    ///
    /// Returns the code of the field relaxation; the snapshot is taken
    /// either way so that later rollbacks have a consistent target.
    pub fn calc_initials(&mut self) -> ResultCode {
        self.fluid
            .set_relaxation_param(self.config.fluid.relax_param_initial);
        self.field
            .set_relaxation_param(self.config.field.relax_param_initial);

        self.fluid.set_w(self.cur_w);
        self.fluid.calc_initial_approximation();
        self.field.update_grid(self.fluid.last_valid_result());
        self.field.calc_initial_approximation();

        let code = self.field.calc_relaxation_with_backoff(&mut ());
        if code != ResultCode::FieldSuccess {
            warn!("initial field relaxation failed: {code}");
        }

        self.fluid.set_derivatives(self.surface_derivatives());
        self.update_snapshot();
        code
    }

    /// Alternate fluid and field relaxations at the given W.
    ///
    /// Ends with `Success` (or `TargetReached` when `w` is the target)
    /// once two consecutive accepted states agree within the configured
    /// accuracies. Any other code means a relaxation parameter fell below
    /// its floor or the outer iteration cap was hit; W then stays at the
    /// last successful value.
    pub fn calc_result(&mut self, w: f64) -> ResultCode {
        let fluid_min = self.config.fluid.relax_param_min;
        let field_min = self.config.field.relax_param_min;
        let outer_max = self.config.sweep.outer_iterations_max;

        self.fluid.set_w(w);

        let mut code = ResultCode::InvalidResult;
        let mut outer = 0;

        while code != ResultCode::Success
            && self.fluid.relaxation_param() >= fluid_min
            && self.field.relaxation_param() >= field_min
            && outer < outer_max
        {
            outer += 1;
            code = self.fluid.calc_relaxation();

            if code != ResultCode::FluidSuccess {
                self.rollback();
                let param = self.fluid.relaxation_param() * RELAXATION_BACKOFF;
                self.fluid.set_relaxation_param(param);
                warn!("fluid relaxation failed ({code}), relaxation parameter halved to {param}");
                continue;
            }

            self.field.update_grid(self.fluid.last_valid_result());
            code = self.field.calc_relaxation();

            if code != ResultCode::FieldSuccess {
                self.rollback();
                let param = self.field.relaxation_param() * RELAXATION_BACKOFF;
                self.field.set_relaxation_param(param);
                warn!("field relaxation failed ({code}), relaxation parameter halved to {param}");
                continue;
            }

            code = if self.is_accuracy_reached() {
                ResultCode::Success
            } else {
                ResultCode::AccuracyNotReached
            };

            self.update_snapshot();
            self.fluid.set_derivatives(self.surface_derivatives());
            debug!("outer iteration {outer} at W = {w}: {code}");
        }

        if code == ResultCode::Success {
            self.cur_w = w;
            let target = self.config.sweep.w_target;
            if self.cur_w >= target || (self.cur_w - target).abs() <= TARGET_W_TOLERANCE {
                code = ResultCode::TargetReached;
            }
            info!(
                "W = {w}: {code}, height coefficient {:.6} after {outer} outer iterations",
                self.fluid.height_coef()
            );
        } else {
            self.fluid.set_w(self.cur_w);
            warn!("W = {w} not reached: {code} after {outer} outer iterations");
        }

        code
    }

    /// [`Solution::calc_result`] one W step past the current value.
    pub fn calc_next_result(&mut self) -> ResultCode {
        self.calc_result(self.cur_w + self.step_w)
    }

    /// Relax the field around the fixed seed sphere with the model χ and
    /// model relaxation settings and compare it with [`sphere_potential`].
    ///
    /// Runs on its own field solver; the coupled state is left untouched.
    pub fn calc_field_model_problem(&mut self) -> ResultCode {
        let model = &self.config.model;
        let params = FieldParams {
            chi: model.chi,
            relax_param_initial: model.relax_param_initial,
            relax_param_min: model.relax_param_min,
            ..FieldParams::from_config(&self.config.field, model.chi)
        };

        let surface = seed_surface(self.config.fluid.splits_num);
        let mut field = MagneticField::new(params);
        field.update_grid(&surface);
        field.calc_initial_approximation();

        let analytic = sphere_potential(field.grid(), SEED_SPHERE_RADIUS, model.chi);
        let mut discrepancy = ModelDiscrepancy {
            analytic: &analytic,
            history: Vec::new(),
        };

        let code = field.calc_relaxation_with_backoff(&mut discrepancy);
        if code != ResultCode::FieldSuccess {
            warn!("field model problem failed: {code}");
            self.model = None;
            return code;
        }

        let error = field.last_valid_result() - &analytic;
        let error_history = discrepancy.history;
        info!(
            "field model problem (chi = {}): max error {:.3e} after {} sweeps",
            model.chi,
            norm_inf_2d(field.last_valid_result(), &analytic),
            field.iterations_counter()
        );

        self.model = Some(FieldModelResult {
            chi: model.chi,
            surface,
            grid: field.grid().clone(),
            potential: field.last_valid_result().clone(),
            error,
            error_history,
        });
        code
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Inner field gradient sampled at every fluid point. The fluid runs
    /// apex → equator while grid rows run equator → apex.
    fn surface_derivatives(&self) -> Vec<Point2> {
        let n = self.fluid.points_num();
        let limit = (n - 1) as f64;
        (0..n)
            .map(|i| self.field.inner_derivative(1.0 - i as f64 / limit))
            .collect()
    }

    fn update_snapshot(&mut self) {
        self.snapshot.surface.clear();
        self.snapshot
            .surface
            .extend_from_slice(self.fluid.last_valid_result());
        self.snapshot.grid.clone_from(self.field.grid());
        self.snapshot.potential.assign(self.field.last_valid_result());
    }

    fn rollback(&mut self) {
        self.fluid.set_last_valid_result(self.snapshot.surface.clone());
        self.field
            .set_last_valid_result(self.snapshot.potential.clone());
        self.field.set_grid(self.snapshot.grid.clone());
    }

    fn is_accuracy_reached(&self) -> bool {
        norm_inf_points(self.fluid.last_valid_result(), &self.snapshot.surface)
            <= self.config.fluid.accuracy
            && norm_inf_2d(self.field.last_valid_result(), &self.snapshot.potential)
                <= self.config.field.accuracy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProblemConfig {
        let mut cfg = ProblemConfig::default();
        cfg.fluid.splits_num = 20;
        cfg.fluid.accuracy = 1e-4;
        cfg.fluid.iterations_max = 5000;
        cfg.field.accuracy = 1e-4;
        cfg.field.iterations_max = 5000;
        cfg
    }

    #[test]
    fn test_w_step_single_result() {
        let mut cfg = config();
        cfg.sweep.w_target = 2.0;
        cfg.sweep.results_num_w = 1;
        let s = Solution::new(cfg).unwrap();
        assert_eq!(s.step_w(), 2.0);
        assert_eq!(s.current_w(), 2.0);
    }

    #[test]
    fn test_w_step_several_results() {
        let mut cfg = config();
        cfg.sweep.w_target = 2.0;
        cfg.sweep.results_num_w = 5;
        let s = Solution::new(cfg).unwrap();
        assert!((s.step_w() - 0.5).abs() < 1e-15);
        assert_eq!(s.current_w(), 0.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut cfg = config();
        cfg.fluid.splits_num = 2;
        assert!(Solution::new(cfg).is_err());
    }

    #[test]
    fn test_calc_initials_snapshots_state() {
        let mut s = Solution::new(config()).unwrap();
        assert_eq!(s.calc_initials(), ResultCode::FieldSuccess);
        assert_eq!(s.snapshot().surface.as_slice(), s.fluid_surface());
        assert_eq!(&s.snapshot().grid, s.field().grid());
        assert_eq!(&s.snapshot().potential, s.field().last_valid_result());
        assert!((s.height_coef() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_surface_derivatives_follow_fluid_order() {
        let mut s = Solution::new(config()).unwrap();
        s.calc_initials();
        let derivatives = s.fluid().derivatives();
        let rows = s.field().grid().rows();
        // Apex of the fluid is the last grid row, equator is row 0.
        assert_eq!(derivatives[0], s.field().inner_derivatives()[rows - 1]);
        assert_eq!(derivatives[20], s.field().inner_derivatives()[0]);
    }

    #[test]
    fn test_zero_w_reaches_target() {
        let mut s = Solution::new(config()).unwrap();
        s.calc_initials();
        assert_eq!(s.calc_result(0.0), ResultCode::TargetReached);
        assert_eq!(s.current_w(), 0.0);
        let k = s.height_coef();
        assert!((k - 1.0).abs() < 0.1, "height coefficient {k}");
    }

    #[test]
    fn test_sphere_potential_continuity() {
        let mut s = Solution::new(config()).unwrap();
        s.calc_initials();
        let grid = s.field().grid();
        let phi = sphere_potential(grid, SEED_SPHERE_RADIUS, 2.0);
        // On the sphere both branches agree: b z = z - (1 - b) z.
        let col = grid.surface_column();
        let b = 3.0 / 5.0;
        for i in 0..grid.rows() {
            let p = grid.point(i, col);
            let outside = p.z - (1.0 - b) * SEED_SPHERE_RADIUS.powi(3) * p.z / p.norm().powi(3);
            assert!((phi[[i, col]] - outside).abs() < 1e-12);
        }
    }

    #[test]
    fn test_field_model_problem_matches_sphere() {
        let mut cfg = config();
        cfg.field.accuracy = 1e-8;
        cfg.field.iterations_max = 50_000;
        cfg.model.chi = 1.0;
        let mut s = Solution::new(cfg).unwrap();
        assert!(s.model_error().is_none());
        assert_eq!(s.calc_field_model_problem(), ResultCode::FieldSuccess);

        let model = s.model_result().unwrap();
        let max_err = model.error.iter().fold(0.0f64, |m, e| m.max(e.abs()));
        assert!(max_err < 0.05, "max model error {max_err}");
        let first = model.error_history[0];
        let last = *model.error_history.last().unwrap();
        assert!(last < first, "discrepancy did not shrink: {first} -> {last}");
    }
}
