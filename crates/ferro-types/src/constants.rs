// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Lowest value a potential or surface coordinate may take and still be
/// accepted as physical. Empirical, inherited from the reference runs.
pub const VALIDITY_TOLERANCE: f64 = 1e-5;

/// Distance to the W target under which the target counts as reached.
pub const TARGET_W_TOLERANCE: f64 = 1e-5;

/// Factor applied to a relaxation parameter after a failed attempt.
pub const RELAXATION_BACKOFF: f64 = 0.5;

/// Default distance of the "infinity" boundary, in units of the surface radius.
pub const DEFAULT_INFINITY_MULTIPLIER: f64 = 4.0;

/// Radius of the seed sphere: a quarter circle of unit arc length.
pub const SEED_SPHERE_RADIUS: f64 = std::f64::consts::FRAC_2_PI;
