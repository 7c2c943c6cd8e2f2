// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Interp
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linear interpolation, successive relaxation and sweep-to-sweep norms.

use ferro_types::state::Point2;
use ndarray::Array2;

/// Values that can be linearly blended.
pub trait Lerp: Copy {
    fn lerp(self, end: Self, param: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp(self, end: f64, param: f64) -> f64 {
        self + param * (end - self)
    }
}

impl Lerp for Point2 {
    #[inline]
    fn lerp(self, end: Point2, param: f64) -> Point2 {
        Point2::new(self.r.lerp(end.r, param), self.z.lerp(end.z, param))
    }
}

/// `start + param·(end - start)`.
#[inline]
pub fn lerp<T: Lerp>(start: T, end: T, param: f64) -> T {
    start.lerp(end, param)
}

/// Successive relaxation: `next[i] = lerp(cur[i], next[i], coef)`.
/// `coef = 1` keeps `next` as it is, `coef = 0` falls back to `cur`.
pub fn relaxation<T: Lerp>(next: &mut [T], cur: &[T], coef: f64) {
    assert_eq!(
        next.len(),
        cur.len(),
        "Relaxation cannot be calculated for arrays of different sizes"
    );
    for (n, &c) in next.iter_mut().zip(cur) {
        *n = c.lerp(*n, coef);
    }
}

/// Matrix form of [`relaxation`].
pub fn relaxation_2d(next: &mut Array2<f64>, cur: &Array2<f64>, coef: f64) {
    assert_eq!(
        next.dim(),
        cur.dim(),
        "Relaxation cannot be calculated for matrices of different dimensions"
    );
    next.zip_mut_with(cur, |n, &c| *n = c.lerp(*n, coef));
}

/// Fold |a - b| into a running maximum; a NaN difference poisons the
/// result so that a diverged sweep can never look converged.
#[inline]
fn max_abs_step(acc: f64, a: f64, b: f64) -> f64 {
    let diff = (a - b).abs();
    if diff.is_nan() {
        f64::INFINITY
    } else {
        acc.max(diff)
    }
}

/// L-infinity distance between two sweeps.
pub fn norm_inf(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "Norm of arrays with different sizes");
    a.iter()
        .zip(b)
        .fold(0.0, |acc, (&x, &y)| max_abs_step(acc, x, y))
}

/// L-infinity distance over both coordinates of two point sequences.
pub fn norm_inf_points(a: &[Point2], b: &[Point2]) -> f64 {
    assert_eq!(a.len(), b.len(), "Norm of arrays with different sizes");
    a.iter().zip(b).fold(0.0, |acc, (p, q)| {
        max_abs_step(max_abs_step(acc, p.r, q.r), p.z, q.z)
    })
}

/// L-infinity distance between two matrices.
pub fn norm_inf_2d(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    assert_eq!(a.dim(), b.dim(), "Norm of matrices with different dimensions");
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&x, &y)| max_abs_step(acc, x, y))
}

/// Sample an ordered sequence at a continuous parameter `param ∈ [0, 1]`.
///
/// The bracket is `floor(param·(N-1))` and its successor, clamped at both
/// ends, blended with the local fractional parameter. `param` outside
/// `[0, 1]` is clamped.
pub fn parametric_point<T: Lerp>(points: &[T], param: f64) -> T {
    assert!(!points.is_empty(), "Parametric point of an empty sequence");

    let max_index = points.len() - 1;
    if max_index == 0 {
        return points[0];
    }

    let scaled = param.clamp(0.0, 1.0) * max_index as f64;
    let prev = scaled.floor() as usize;
    if prev >= max_index {
        return points[max_index];
    }

    let local = scaled - prev as f64;
    points[prev].lerp(points[prev + 1], local)
}
