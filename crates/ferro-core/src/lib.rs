//! Ferrofluid droplet equilibrium solver.
//!
//! Grid and the two relaxation solvers, their coupling, the W/χ
//! continuation and the result tables.

pub mod field;
pub mod fluid;
pub mod grid;
pub mod output;
pub mod solution;
pub mod sweep;
