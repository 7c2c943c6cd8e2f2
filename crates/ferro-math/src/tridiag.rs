// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Tridiag
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Right sweep (Thomas algorithm) for tridiagonal systems.
//!
//! Row `i` of the system reads
//! `lower[i-1]·x[i-1] + main[i]·x[i] + upper[i]·x[i+1] = d[i]`,
//! so `lower` and `upper` both hold `n - 1` entries.
//! The solver owns its coefficient storage and is refilled by the caller
//! before every solve, which keeps the fluid relaxation loop allocation-free.

use log::warn;

/// Reusable tridiagonal system with scratch storage for the sweep.
#[derive(Debug, Clone)]
pub struct RightSweep {
    lower: Vec<f64>,
    main: Vec<f64>,
    upper: Vec<f64>,
    constants: Vec<f64>,
    alpha: Vec<f64>,
    beta: Vec<f64>,
    pedantic: bool,
}

impl RightSweep {
    /// Create a zeroed system of `size` unknowns.
    ///
    /// With `pedantic` set, a matrix that fails the diagonal dominance check
    /// aborts the solve with a panic instead of logging a warning.
    pub fn new(size: usize, pedantic: bool) -> Self {
        assert!(size >= 2, "Right sweep needs at least 2 unknowns, got {size}");
        RightSweep {
            lower: vec![0.0; size - 1],
            main: vec![0.0; size],
            upper: vec![0.0; size - 1],
            constants: vec![0.0; size],
            alpha: vec![0.0; size - 1],
            beta: vec![0.0; size],
            pedantic,
        }
    }

    pub fn size(&self) -> usize {
        self.main.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn main(&self) -> &[f64] {
        &self.main
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn constants(&self) -> &[f64] {
        &self.constants
    }

    pub fn lower_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.lower[index]
    }

    pub fn main_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.main[index]
    }

    pub fn upper_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.upper[index]
    }

    pub fn constant_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.constants[index]
    }

    /// Fill row `row` in one call. `lower` is ignored on the first row and
    /// `upper` on the last one.
    pub fn set_row(&mut self, row: usize, lower: f64, main: f64, upper: f64, constant: f64) {
        let last = self.size() - 1;
        if row > 0 {
            self.lower[row - 1] = lower;
        }
        self.main[row] = main;
        if row < last {
            self.upper[row] = upper;
        }
        self.constants[row] = constant;
    }

    /// Diagonal dominance check used as a conditioning diagnostic.
    pub fn is_diagonally_dominant(&self) -> bool {
        let n = self.size();

        if self.main[0].abs() < self.upper[0].abs() {
            return false;
        }
        if self.main[n - 1].abs() < self.lower[n - 2].abs() {
            return false;
        }

        (1..n - 1).all(|i| self.main[i].abs() >= self.lower[i - 1].abs() + self.upper[i].abs())
    }

    /// Solve into `destination`.
    ///
    /// Does not report numerical failure: an ill-conditioned matrix can
    /// yield non-finite values, which callers must detect themselves.
    pub fn solve(&mut self, destination: &mut [f64]) {
        assert_eq!(
            destination.len(),
            self.size(),
            "Right sweep destination has a different size than the system"
        );

        if !self.is_diagonally_dominant() {
            if self.pedantic {
                panic!("Right sweep matrix is not diagonally dominant");
            }
            warn!("right sweep matrix is not diagonally dominant, solving anyway");
        }

        self.calc_alpha();
        self.calc_beta();
        self.reversal(destination);
    }

    /// Solve into a freshly allocated vector.
    pub fn solve_vec(&mut self) -> Vec<f64> {
        let mut solution = vec![0.0; self.size()];
        self.solve(&mut solution);
        solution
    }

    fn calc_alpha(&mut self) {
        let n = self.size();
        self.alpha[0] = -self.upper[0] / self.main[0];

        for i in 1..n - 1 {
            let den = self.main[i] + self.lower[i - 1] * self.alpha[i - 1];
            self.alpha[i] = -self.upper[i] / den;
        }
    }

    fn calc_beta(&mut self) {
        let n = self.size();
        self.beta[0] = self.constants[0] / self.main[0];

        for i in 1..n {
            let den = self.main[i] + self.lower[i - 1] * self.alpha[i - 1];
            self.beta[i] = (self.constants[i] - self.lower[i - 1] * self.beta[i - 1]) / den;
        }
    }

    fn reversal(&self, destination: &mut [f64]) {
        let n = self.size();
        destination[n - 1] = self.beta[n - 1];

        for i in (0..n - 1).rev() {
            destination[i] = self.alpha[i] * destination[i + 1] + self.beta[i];
        }
    }
}
