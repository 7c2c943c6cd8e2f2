// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Grid
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Structured triangulated grid over the meridian half-plane.
//!
//! Rows run from the equatorial plane (row 0, `z = 0`) to the symmetry axis
//! above the apex (last row, `r = 0`). Columns run from the axis segment
//! below the apex (column 0) through the droplet surface (the surface
//! column) to the scaled "infinity" boundary (last column). Each quad cell
//! is split along its (i, j+1)–(i+1, j) diagonal, which gives every
//! interior node the six neighbours of the field stencil.

use ferro_math::interp::{lerp, parametric_point};
use ferro_types::config::FieldConfig;
use ferro_types::error::{FerroError, FerroResult};
use ferro_types::state::Point2;
use ndarray::Array2;

/// Grid resolution and far-field extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParams {
    pub surface_splits_num: usize,
    pub internal_splits_num: usize,
    pub external_splits_num: usize,
    /// Scale factor from the surface to the "infinity" boundary.
    pub infinity_multiplier: f64,
}

impl GridParams {
    pub fn rows(&self) -> usize {
        self.surface_splits_num + 1
    }

    pub fn columns(&self) -> usize {
        self.internal_splits_num + self.external_splits_num + 1
    }
}

impl From<&FieldConfig> for GridParams {
    fn from(cfg: &FieldConfig) -> Self {
        GridParams {
            surface_splits_num: cfg.surface_splits_num,
            internal_splits_num: cfg.internal_splits_num,
            external_splits_num: cfg.external_splits_num,
            infinity_multiplier: cfg.infinity_multiplier,
        }
    }
}

/// Node coordinates stored as two co-indexed `[rows, columns]` matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleGrid {
    params: GridParams,
    surface_column: usize,
    rr: Array2<f64>,
    zz: Array2<f64>,
}

impl TriangleGrid {
    /// Zeroed grid sized from `params`. Call [`TriangleGrid::generate`]
    /// before use.
    pub fn new(params: GridParams) -> Self {
        assert!(
            params.surface_splits_num > 0
                && params.internal_splits_num > 0
                && params.external_splits_num > 0,
            "Triangle grid needs positive split numbers, got {params:?}"
        );
        let shape = (params.rows(), params.columns());
        TriangleGrid {
            params,
            surface_column: params.internal_splits_num,
            rr: Array2::zeros(shape),
            zz: Array2::zeros(shape),
        }
    }

    pub fn rows(&self) -> usize {
        self.rr.nrows()
    }

    pub fn columns(&self) -> usize {
        self.rr.ncols()
    }

    pub fn points_num(&self) -> usize {
        self.rr.len()
    }

    pub fn surface_column(&self) -> usize {
        self.surface_column
    }

    pub fn params(&self) -> GridParams {
        self.params
    }

    pub fn rr(&self) -> &Array2<f64> {
        &self.rr
    }

    pub fn zz(&self) -> &Array2<f64> {
        &self.zz
    }

    /// Node `(row, column)`. Panics outside the grid.
    #[inline]
    pub fn point(&self, row: usize, column: usize) -> Point2 {
        Point2::new(self.rr[[row, column]], self.zz[[row, column]])
    }

    /// Checked variant of [`TriangleGrid::point`].
    pub fn get(&self, row: usize, column: usize) -> FerroResult<Point2> {
        if row >= self.rows() || column >= self.columns() {
            return Err(FerroError::GridOutOfBounds { row, col: column });
        }
        Ok(self.point(row, column))
    }

    /// True for nodes on or inside the droplet surface.
    #[inline]
    pub fn is_inside(&self, _row: usize, column: usize) -> bool {
        column <= self.surface_column
    }

    #[inline]
    fn set(&mut self, row: usize, column: usize, p: Point2) {
        self.rr[[row, column]] = p.r;
        self.zz[[row, column]] = p.z;
    }

    /// Regenerate every node from a surface ordered apex → equator.
    ///
    /// The result depends only on `surface` and the grid parameters.
    pub fn generate(&mut self, surface: &[Point2]) {
        assert!(
            surface.len() >= 2,
            "Triangle grid needs at least 2 surface points, got {}",
            surface.len()
        );

        let rows = self.rows();
        let columns = self.columns();
        let max_row = rows - 1;
        let max_column = columns - 1;
        let s = self.surface_column;
        let external = (max_column - s) as f64;
        let inf = self.params.infinity_multiplier;

        let top_z = surface[0].z;
        let equator_r = surface[surface.len() - 1].r;
        let special_z = top_z * self.params.surface_splits_num as f64
            / (self.params.surface_splits_num + self.params.internal_splits_num) as f64;

        // Anchor columns: axis, surface and infinity.
        for i in 0..rows {
            let t = i as f64 / max_row as f64;
            let p = parametric_point(surface, 1.0 - t);
            self.set(i, 0, Point2::new(0.0, special_z * t));
            self.set(i, s, p);
            self.set(i, max_column, inf * p);
        }

        // Equatorial plane and the axis above the apex.
        for j in 1..s {
            let t = j as f64 / s as f64;
            self.set(0, j, Point2::new(equator_r * t, 0.0));
            self.set(max_row, j, Point2::new(0.0, lerp(special_z, top_z, t)));
        }
        for j in s + 1..columns {
            let t = (j - s) as f64 / external;
            self.set(0, j, Point2::new(lerp(equator_r, inf * equator_r, t), 0.0));
            self.set(max_row, j, Point2::new(0.0, lerp(top_z, inf * top_z, t)));
        }

        for i in 1..max_row {
            let axis = self.point(i, 0);
            let surf = self.point(i, s);
            let far = self.point(i, max_column);

            for j in 1..s {
                self.set(i, j, lerp(axis, surf, j as f64 / s as f64));
            }
            for j in s + 1..max_column {
                self.set(i, j, lerp(surf, far, (j - s) as f64 / external));
            }
        }
    }

    /// [`TriangleGrid::generate`] from separate coordinate arrays.
    pub fn generate_from_coords(&mut self, surface_r: &[f64], surface_z: &[f64]) {
        assert_eq!(
            surface_r.len(),
            surface_z.len(),
            "Surface coordinate arrays have different sizes"
        );
        let surface: Vec<Point2> = surface_r
            .iter()
            .zip(surface_z)
            .map(|(&r, &z)| Point2::new(r, z))
            .collect();
        self.generate(&surface);
    }
}
