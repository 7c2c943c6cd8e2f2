//! Mathematical primitives for the Ferrodrop solver.

pub mod geometry;
pub mod interp;
pub mod tridiag;
