// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Parameter Sweep
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Continuation in the magnetic Bond number W (inner loop) and the
//! susceptibility χ (outer loop).

use crate::solution::Solution;
use ferro_types::config::SweepConfig;
use ferro_types::state::{Point2, ResultCode};
use log::{info, warn};

/// Evenly spaced χ values from `initial` to `target`.
///
/// A count of 1 yields only the target; a count of 0 yields nothing.
#[derive(Debug, Clone)]
pub struct ChiSweep {
    initial: f64,
    step: f64,
    count: usize,
    index: usize,
}

impl ChiSweep {
    pub fn new(initial: f64, target: f64, count: usize) -> Self {
        let (initial, step) = if count <= 1 {
            (target, 0.0)
        } else {
            (initial, (target - initial) / (count - 1) as f64)
        };
        ChiSweep {
            initial,
            step,
            count,
            index: 0,
        }
    }

    pub fn from_config(cfg: &SweepConfig) -> Self {
        Self::new(cfg.chi_initial, cfg.chi_target, cfg.results_num_chi)
    }
}

impl Iterator for ChiSweep {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.index >= self.count {
            return None;
        }
        let chi = self.initial + self.step * self.index as f64;
        self.index += 1;
        Some(chi)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.index;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChiSweep {}

/// Accepted droplet shape at one W.
#[derive(Debug, Clone)]
pub struct WStepRecord {
    pub w: f64,
    pub height_coef: f64,
    pub volume_nondim_mul: f64,
    pub surface: Vec<Point2>,
}

/// Everything one χ value produced.
#[derive(Debug, Clone)]
pub struct ChiRun {
    pub chi: f64,
    pub records: Vec<WStepRecord>,
    /// Code of the last W step attempted.
    pub outcome: ResultCode,
    pub fluid_iterations: usize,
    pub field_iterations: usize,
}

impl ChiRun {
    pub fn target_reached(&self) -> bool {
        self.outcome == ResultCode::TargetReached
    }
}

fn record(solution: &Solution) -> WStepRecord {
    WStepRecord {
        w: solution.current_w(),
        height_coef: solution.height_coef(),
        volume_nondim_mul: solution.volume_nondim_mul(),
        surface: solution.fluid_surface().to_vec(),
    }
}

/// Step W from zero to the configured target at susceptibility `chi`.
///
/// The W = 0 shape is recorded only when more than one W result was
/// requested or when it already is the target. The walk stops at the
/// first step that does not end in `Success`.
pub fn run_w_continuation(solution: &mut Solution, chi: f64) -> ChiRun {
    solution.reset_iterations_counters();
    solution.set_chi(chi);

    let initial = solution.calc_initials();
    if initial != ResultCode::FieldSuccess {
        warn!("chi = {chi}: initial field did not converge ({initial})");
    }

    let multiple = solution.config().sweep.results_num_w > 1;
    let mut records = Vec::new();

    let mut code = solution.calc_result(0.0);
    if (code == ResultCode::Success && multiple) || code == ResultCode::TargetReached {
        records.push(record(solution));
    }

    while code == ResultCode::Success {
        code = solution.calc_next_result();
        if code == ResultCode::Success || code == ResultCode::TargetReached {
            records.push(record(solution));
        }
    }

    let run = ChiRun {
        chi,
        records,
        outcome: code,
        fluid_iterations: solution.fluid().iterations_counter(),
        field_iterations: solution.field().iterations_counter(),
    };

    if run.target_reached() {
        info!(
            "chi = {chi}: target W reached with {} shapes ({} fluid / {} field iterations)",
            run.records.len(),
            run.fluid_iterations,
            run.field_iterations
        );
    } else {
        warn!("chi = {chi}: target W can't be reached ({code})");
    }

    run
}
