// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Point (or vector) in the meridian half-plane.
/// `r` is the distance from the symmetry axis, `z` the height above the
/// equatorial plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub r: f64,
    pub z: f64,
}

impl Point2 {
    pub const ZERO: Point2 = Point2 { r: 0.0, z: 0.0 };

    pub const fn new(r: f64, z: f64) -> Self {
        Point2 { r, z }
    }

    pub fn dot(self, other: Point2) -> f64 {
        self.r * other.r + self.z * other.z
    }

    pub fn norm_sq(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.norm_sq().sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.z.is_finite()
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.r + rhs.r, self.z + rhs.z)
    }
}

impl AddAssign for Point2 {
    fn add_assign(&mut self, rhs: Point2) {
        self.r += rhs.r;
        self.z += rhs.z;
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.r - rhs.r, self.z - rhs.z)
    }
}

impl Neg for Point2 {
    type Output = Point2;

    fn neg(self) -> Point2 {
        Point2::new(-self.r, -self.z)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, rhs: f64) -> Point2 {
        Point2::new(self.r * rhs, self.z * rhs)
    }
}

impl Mul<Point2> for f64 {
    type Output = Point2;

    fn mul(self, rhs: Point2) -> Point2 {
        rhs * self
    }
}

/// Outcome of a relaxation attempt or of an outer coordinator step.
///
/// Numeric trouble is never an `Err`: every branch in the solvers is driven
/// by one of these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCode {
    FluidSuccess,
    FluidIterationsLimitExceeded,
    FluidInvalidResult,
    FieldSuccess,
    FieldIterationsLimitExceeded,
    FieldInvalidResult,
    InvalidResult,
    Success,
    TargetReached,
    AccuracyNotReached,
}

impl ResultCode {
    /// True for the codes that leave a solver with a fresh valid result.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ResultCode::FluidSuccess
                | ResultCode::FieldSuccess
                | ResultCode::Success
                | ResultCode::TargetReached
        )
    }

    pub fn is_fluid(self) -> bool {
        matches!(
            self,
            ResultCode::FluidSuccess
                | ResultCode::FluidIterationsLimitExceeded
                | ResultCode::FluidInvalidResult
        )
    }

    pub fn is_field(self) -> bool {
        matches!(
            self,
            ResultCode::FieldSuccess
                | ResultCode::FieldIterationsLimitExceeded
                | ResultCode::FieldInvalidResult
        )
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResultCode::FluidSuccess => "fluid relaxation converged",
            ResultCode::FluidIterationsLimitExceeded => "fluid iterations limit exceeded",
            ResultCode::FluidInvalidResult => "fluid relaxation produced an invalid surface",
            ResultCode::FieldSuccess => "field relaxation converged",
            ResultCode::FieldIterationsLimitExceeded => "field iterations limit exceeded",
            ResultCode::FieldInvalidResult => "field relaxation produced an invalid potential",
            ResultCode::InvalidResult => "invalid result",
            ResultCode::Success => "success",
            ResultCode::TargetReached => "target parameter reached",
            ResultCode::AccuracyNotReached => "accuracy not reached",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(0.5, -1.0);
        assert_eq!(a + b, Point2::new(1.5, 1.0));
        assert_eq!(a - b, Point2::new(0.5, 3.0));
        assert_eq!(2.0 * a, Point2::new(2.0, 4.0));
        assert_eq!(a * 2.0, 2.0 * a);
        assert_eq!(-a, Point2::new(-1.0, -2.0));
        assert!((a.dot(b) - (0.5 - 2.0)).abs() < 1e-15);
        assert!((Point2::new(3.0, 4.0).norm() - 5.0).abs() < 1e-15);
    }

    #[test]
    fn test_point_add_assign() {
        let mut p = Point2::ZERO;
        p += Point2::new(1.0, 1.0);
        p += Point2::new(1.0, -3.0);
        assert_eq!(p, Point2::new(2.0, -2.0));
    }

    #[test]
    fn test_point_finiteness() {
        assert!(Point2::new(1.0, 0.0).is_finite());
        assert!(!Point2::new(f64::NAN, 0.0).is_finite());
        assert!(!Point2::new(0.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn test_result_code_classes() {
        assert!(ResultCode::FluidSuccess.is_success());
        assert!(ResultCode::TargetReached.is_success());
        assert!(!ResultCode::AccuracyNotReached.is_success());
        assert!(!ResultCode::FieldInvalidResult.is_success());
        assert!(ResultCode::FluidInvalidResult.is_fluid());
        assert!(!ResultCode::FluidInvalidResult.is_field());
        assert!(ResultCode::FieldIterationsLimitExceeded.is_field());
    }
}
