// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Result Tables
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Plain-text result tables.
//!
//! Every table starts with `#` comment lines (parameter names, values, a
//! separator, column labels) followed by data rows. Cells are
//! left-aligned in [`COLUMN_WIDTH`] characters, floats in fixed notation
//! with 8 decimals.

use crate::grid::TriangleGrid;
use ferro_types::error::FerroResult;
use ferro_types::state::Point2;
use ndarray::Array2;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const COLUMN_WIDTH: usize = 15;
pub const COMMENT_CHARACTER: char = '#';

const SEPARATOR: &str = "########";

enum Cell<'a> {
    Text(&'a str),
    Float(f64),
    Count(usize),
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s:<COLUMN_WIDTH$}"),
            Cell::Float(v) => write!(f, "{v:<COLUMN_WIDTH$.8}"),
            Cell::Count(n) => write!(f, "{n:<COLUMN_WIDTH$}"),
        }
    }
}

fn data_line(out: &mut dyn Write, cells: &[Cell<'_>]) -> FerroResult<()> {
    for cell in cells {
        write!(out, "{cell}")?;
    }
    writeln!(out)?;
    Ok(())
}

fn comment_line(out: &mut dyn Write, cells: &[Cell<'_>]) -> FerroResult<()> {
    write!(out, "{COMMENT_CHARACTER}")?;
    data_line(out, cells)
}

fn point_line(out: &mut dyn Write, p: Point2, scale: f64) -> FerroResult<()> {
    data_line(out, &[Cell::Float(p.r * scale), Cell::Float(p.z * scale)])
}

/// A table that can be written to any byte sink.
pub trait Table {
    fn write_to(&self, out: &mut dyn Write) -> FerroResult<()>;

    /// Create (or truncate) `path` and write the table into it.
    fn write_file(&self, path: &Path) -> FerroResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

/// Droplet meridian, apex first.
pub struct FluidTable<'a> {
    pub chi: f64,
    pub w: f64,
    /// Coordinate multiplier (1, or the unit-volume multiplier).
    pub scale: f64,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub points: &'a [Point2],
}

impl Table for FluidTable<'_> {
    fn write_to(&self, out: &mut dyn Write) -> FerroResult<()> {
        comment_line(out, &[Cell::Text("Chi"), Cell::Text("W"), Cell::Text("Scale")])?;
        comment_line(
            out,
            &[Cell::Float(self.chi), Cell::Float(self.w), Cell::Float(self.scale)],
        )?;
        comment_line(out, &[Cell::Text(SEPARATOR)])?;
        comment_line(out, &[Cell::Text(self.x_label), Cell::Text(self.y_label)])?;

        for &p in self.points {
            point_line(out, p, self.scale)?;
        }
        Ok(())
    }
}

/// Node values on the whole grid, row-major.
pub struct FieldTable<'a> {
    pub chi: f64,
    pub scale: f64,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub value_label: &'a str,
    pub grid: &'a TriangleGrid,
    pub values: &'a Array2<f64>,
}

impl FieldTable<'_> {
    /// Value at the apex of the droplet (last row, surface column).
    pub fn fluid_top_value(&self) -> f64 {
        self.values[[self.grid.rows() - 1, self.grid.surface_column()]]
    }
}

impl Table for FieldTable<'_> {
    fn write_to(&self, out: &mut dyn Write) -> FerroResult<()> {
        let params = self.grid.params();
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        comment_line(
            out,
            &[
                Cell::Text("Chi"),
                Cell::Text("Surface"),
                Cell::Text("Internal"),
                Cell::Text("External"),
                Cell::Text("Min"),
                Cell::Text("Max"),
                Cell::Text("Top"),
            ],
        )?;
        comment_line(
            out,
            &[
                Cell::Float(self.chi),
                Cell::Count(params.surface_splits_num),
                Cell::Count(params.internal_splits_num),
                Cell::Count(params.external_splits_num),
                Cell::Float(min),
                Cell::Float(max),
                Cell::Float(self.fluid_top_value()),
            ],
        )?;
        comment_line(out, &[Cell::Text(SEPARATOR)])?;
        comment_line(
            out,
            &[
                Cell::Text(self.x_label),
                Cell::Text(self.y_label),
                Cell::Text(self.value_label),
            ],
        )?;

        for ((i, j), &v) in self.values.indexed_iter() {
            let p = self.grid.point(i, j);
            data_line(
                out,
                &[
                    Cell::Float(p.r * self.scale),
                    Cell::Float(p.z * self.scale),
                    Cell::Float(v),
                ],
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRegion {
    /// Columns `0..=surface_column`.
    Internal,
    /// Columns `surface_column..columns`.
    External,
}

/// Triangle outlines of one grid region, as a single polyline: every node
/// is followed by its upper and right neighbours and itself again, and
/// the last column of a row walks back along the next row.
pub struct GridTable<'a> {
    pub chi: f64,
    pub scale: f64,
    pub region: GridRegion,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub grid: &'a TriangleGrid,
}

impl GridTable<'_> {
    /// Node sequence of the outline.
    pub fn outline(&self) -> Vec<(usize, usize)> {
        let rows = self.grid.rows();
        let s = self.grid.surface_column();
        let (first, last) = match self.region {
            GridRegion::Internal => (0, s),
            GridRegion::External => (s, self.grid.columns() - 1),
        };

        let mut nodes = Vec::new();
        for i in 0..rows {
            for j in first..=last {
                nodes.push((i, j));
                if i + 1 == rows {
                    continue;
                }
                if j != last {
                    nodes.extend([(i + 1, j), (i, j + 1), (i, j)]);
                } else {
                    nodes.extend((first..=last).rev().map(|k| (i + 1, k)));
                }
            }
        }
        nodes
    }
}

impl Table for GridTable<'_> {
    fn write_to(&self, out: &mut dyn Write) -> FerroResult<()> {
        comment_line(out, &[Cell::Text("Chi")])?;
        comment_line(out, &[Cell::Float(self.chi)])?;
        comment_line(out, &[Cell::Text(SEPARATOR)])?;
        comment_line(out, &[Cell::Text(self.x_label), Cell::Text(self.y_label)])?;

        for (i, j) in self.outline() {
            point_line(out, self.grid.point(i, j), self.scale)?;
        }
        Ok(())
    }
}

/// Height coefficient against W for one χ.
pub struct HeightCoefTable<'a> {
    pub chi: f64,
    /// `(W, height coefficient)` pairs.
    pub rows: &'a [(f64, f64)],
}

impl Table for HeightCoefTable<'_> {
    fn write_to(&self, out: &mut dyn Write) -> FerroResult<()> {
        comment_line(out, &[Cell::Text("Chi")])?;
        comment_line(out, &[Cell::Float(self.chi)])?;
        comment_line(out, &[Cell::Text(SEPARATOR)])?;
        comment_line(out, &[Cell::Text("W"), Cell::Text("k")])?;

        for &(w, k) in self.rows {
            data_line(out, &[Cell::Float(w), Cell::Float(k)])?;
        }
        Ok(())
    }
}

/// `<prefix>-<part>-<part>.<extension>`.
pub fn file_name(prefix: &str, extension: &str, parts: &[String]) -> String {
    let mut name = prefix.to_string();
    for part in parts {
        name.push('-');
        name.push_str(part);
    }
    name.push('.');
    name.push_str(extension);
    name
}

/// Numeric file name part, 6 decimals.
pub fn param(value: f64) -> String {
    format!("{value:.6}")
}
