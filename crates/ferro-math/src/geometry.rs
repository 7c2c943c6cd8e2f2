//! Triangle geometry in the meridian half-plane.

use ferro_types::state::Point2;

/// Signed double area of the triangle `(v1, v2, v3)`, measured at `v2`.
///
/// Positive for counter-clockwise vertex order in the (r, z) plane.
/// Replacing one coordinate of every vertex by a nodal value turns the
/// ratio of two such areas into a component of the linear gradient
/// (Cramer's rule), which is how boundary derivatives are taken.
#[inline]
pub fn double_triangle_area(v1: Point2, v2: Point2, v3: Point2) -> f64 {
    (v1.r - v2.r) * (v3.z - v2.z) - (v3.r - v2.r) * (v1.z - v2.z)
}

/// Gradient `(∂f/∂r, ∂f/∂z)` of the linear interpolant of nodal values
/// `f1, f2, f3` over the triangle `(v1, v2, v3)`.
pub fn linear_gradient(v1: Point2, v2: Point2, v3: Point2, f1: f64, f2: f64, f3: f64) -> Point2 {
    let area = double_triangle_area(v1, v2, v3);
    let d_r = double_triangle_area(
        Point2::new(f1, v1.z),
        Point2::new(f2, v2.z),
        Point2::new(f3, v3.z),
    );
    let d_z = double_triangle_area(
        Point2::new(v1.r, f1),
        Point2::new(v2.r, f2),
        Point2::new(v3.r, f3),
    );
    Point2::new(d_r / area, d_z / area)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_triangle_area() {
        let a = Point2::new(1.0, 0.0);
        let b = Point2::new(0.0, 0.0);
        let c = Point2::new(0.0, 1.0);
        // (a - b) × (c - b) = 1
        assert!((double_triangle_area(a, b, c) - 1.0).abs() < 1e-15);
        assert!((double_triangle_area(c, b, a) + 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_degenerate_triangle_has_zero_area() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(1.0, 1.0);
        let c = Point2::new(2.0, 2.0);
        assert_eq!(double_triangle_area(a, b, c), 0.0);
    }

    #[test]
    fn test_gradient_of_linear_function_is_exact() {
        // f = 2r - 3z + 1
        let f = |p: Point2| 2.0 * p.r - 3.0 * p.z + 1.0;
        let v1 = Point2::new(0.3, 0.1);
        let v2 = Point2::new(1.2, 0.4);
        let v3 = Point2::new(0.7, 1.5);
        let g = linear_gradient(v1, v2, v3, f(v1), f(v2), f(v3));
        assert!((g.r - 2.0).abs() < 1e-12, "df/dr = {}", g.r);
        assert!((g.z + 3.0).abs() < 1e-12, "df/dz = {}", g.z);
    }
}
