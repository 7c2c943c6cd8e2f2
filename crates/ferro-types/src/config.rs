// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::DEFAULT_INFINITY_MULTIPLIER;
use crate::error::{FerroError, FerroResult};
use serde::{Deserialize, Serialize};

/// Top-level problem configuration.
/// Every field has a default, so a partial (or empty) JSON object is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProblemConfig {
    #[serde(default)]
    pub fluid: FluidConfig,
    #[serde(default)]
    pub field: FieldConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Fluid surface solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidConfig {
    /// Number of arc segments on the meridian (points = splits + 1).
    #[serde(default = "default_splits_num")]
    pub splits_num: usize,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    #[serde(default = "default_iterations_max")]
    pub iterations_max: usize,
    #[serde(default = "default_relax_initial")]
    pub relax_param_initial: f64,
    #[serde(default = "default_relax_min")]
    pub relax_param_min: f64,
    /// Panic instead of warning on a non-dominant tridiagonal matrix.
    #[serde(default)]
    pub pedantic_right_sweep: bool,
}

/// Magnetic field solver and grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default = "default_surface_splits_num")]
    pub surface_splits_num: usize,
    #[serde(default = "default_internal_splits_num")]
    pub internal_splits_num: usize,
    #[serde(default = "default_external_splits_num")]
    pub external_splits_num: usize,
    #[serde(default = "default_infinity_multiplier")]
    pub infinity_multiplier: f64,
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
    #[serde(default = "default_iterations_max")]
    pub iterations_max: usize,
    #[serde(default = "default_relax_initial")]
    pub relax_param_initial: f64,
    #[serde(default = "default_relax_min")]
    pub relax_param_min: f64,
}

/// Parameter continuation over W and chi.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default)]
    pub w_target: f64,
    #[serde(default = "default_results_num")]
    pub results_num_w: usize,
    #[serde(default = "default_chi")]
    pub chi_initial: f64,
    #[serde(default = "default_chi")]
    pub chi_target: f64,
    #[serde(default = "default_results_num")]
    pub results_num_chi: usize,
    /// Cap on fluid/field alternations inside one `calc_result` call.
    #[serde(default = "default_outer_iterations_max")]
    pub outer_iterations_max: usize,
}

/// Field model problem (fixed sphere, analytic comparison).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_chi")]
    pub chi: f64,
    #[serde(default = "default_relax_initial")]
    pub relax_param_initial: f64,
    #[serde(default = "default_relax_min")]
    pub relax_param_min: f64,
}

/// Labels and scaling for exported tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_x_label")]
    pub x_label: String,
    #[serde(default = "default_y_label")]
    pub y_label: String,
    #[serde(default = "default_potential_label")]
    pub potential_label: String,
    #[serde(default = "default_error_label")]
    pub error_label: String,
    /// Rescale exported coordinates to a unit-volume droplet.
    #[serde(default)]
    pub dimensionless: bool,
}

fn default_splits_num() -> usize {
    100
}
fn default_surface_splits_num() -> usize {
    10
}
fn default_internal_splits_num() -> usize {
    5
}
fn default_external_splits_num() -> usize {
    5
}
fn default_infinity_multiplier() -> f64 {
    DEFAULT_INFINITY_MULTIPLIER
}
fn default_accuracy() -> f64 {
    0.1
}
fn default_iterations_max() -> usize {
    1000
}
fn default_relax_initial() -> f64 {
    1.0
}
fn default_relax_min() -> f64 {
    0.1
}
fn default_results_num() -> usize {
    1
}
fn default_chi() -> f64 {
    1.0
}
fn default_outer_iterations_max() -> usize {
    1000
}
fn default_x_label() -> String {
    "x".to_string()
}
fn default_y_label() -> String {
    "y".to_string()
}
fn default_potential_label() -> String {
    "potential".to_string()
}
fn default_error_label() -> String {
    "error".to_string()
}

impl Default for FluidConfig {
    fn default() -> Self {
        FluidConfig {
            splits_num: default_splits_num(),
            accuracy: default_accuracy(),
            iterations_max: default_iterations_max(),
            relax_param_initial: default_relax_initial(),
            relax_param_min: default_relax_min(),
            pedantic_right_sweep: false,
        }
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        FieldConfig {
            surface_splits_num: default_surface_splits_num(),
            internal_splits_num: default_internal_splits_num(),
            external_splits_num: default_external_splits_num(),
            infinity_multiplier: default_infinity_multiplier(),
            accuracy: default_accuracy(),
            iterations_max: default_iterations_max(),
            relax_param_initial: default_relax_initial(),
            relax_param_min: default_relax_min(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        SweepConfig {
            w_target: 0.0,
            results_num_w: default_results_num(),
            chi_initial: default_chi(),
            chi_target: default_chi(),
            results_num_chi: default_results_num(),
            outer_iterations_max: default_outer_iterations_max(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            chi: default_chi(),
            relax_param_initial: default_relax_initial(),
            relax_param_min: default_relax_min(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            x_label: default_x_label(),
            y_label: default_y_label(),
            potential_label: default_potential_label(),
            error_label: default_error_label(),
            dimensionless: false,
        }
    }
}

fn check_relaxation(name: &str, initial: f64, min: f64) -> FerroResult<()> {
    if !(initial > 0.0 && initial <= 1.0) {
        return Err(FerroError::InvalidParameter(format!(
            "{name} initial relaxation parameter must lie in (0, 1], got {initial}"
        )));
    }
    if !(min > 0.0 && min <= initial) {
        return Err(FerroError::InvalidParameter(format!(
            "{name} minimal relaxation parameter must lie in (0, {initial}], got {min}"
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> FerroResult<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(FerroError::InvalidParameter(format!(
            "{name} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

impl ProblemConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> FerroResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Reject parameter sets the solvers cannot be sized or run with.
    pub fn validate(&self) -> FerroResult<()> {
        if self.fluid.splits_num < 3 {
            return Err(FerroError::ConfigError(format!(
                "fluid splits number must be at least 3, got {}",
                self.fluid.splits_num
            )));
        }
        if self.field.surface_splits_num < 1
            || self.field.internal_splits_num < 1
            || self.field.external_splits_num < 1
        {
            return Err(FerroError::ConfigError(
                "field grid split numbers must all be positive".to_string(),
            ));
        }
        if self.fluid.iterations_max == 0 || self.field.iterations_max == 0 {
            return Err(FerroError::ConfigError(
                "iteration limits must be positive".to_string(),
            ));
        }
        if self.sweep.outer_iterations_max == 0 {
            return Err(FerroError::ConfigError(
                "outer iteration limit must be positive".to_string(),
            ));
        }
        if !(self.field.infinity_multiplier > 1.0 && self.field.infinity_multiplier.is_finite()) {
            return Err(FerroError::InvalidParameter(format!(
                "infinity multiplier must be greater than 1, got {}",
                self.field.infinity_multiplier
            )));
        }
        check_positive("fluid accuracy", self.fluid.accuracy)?;
        check_positive("field accuracy", self.field.accuracy)?;
        check_relaxation(
            "fluid",
            self.fluid.relax_param_initial,
            self.fluid.relax_param_min,
        )?;
        check_relaxation(
            "field",
            self.field.relax_param_initial,
            self.field.relax_param_min,
        )?;
        check_relaxation(
            "field model",
            self.model.relax_param_initial,
            self.model.relax_param_min,
        )?;
        if self.sweep.w_target < 0.0 || !self.sweep.w_target.is_finite() {
            return Err(FerroError::InvalidParameter(format!(
                "W target must be non-negative, got {}",
                self.sweep.w_target
            )));
        }
        for chi in [self.sweep.chi_initial, self.sweep.chi_target, self.model.chi] {
            if chi < 0.0 || !chi.is_finite() {
                return Err(FerroError::InvalidParameter(format!(
                    "susceptibility must be non-negative, got {chi}"
                )));
            }
        }
        Ok(())
    }

    /// Collapse degenerate sweeps to a single result, as the option
    /// handler always did: no W range means one W result, no chi range
    /// means one chi result.
    pub fn normalize(&mut self) {
        if self.sweep.w_target == 0.0 {
            self.sweep.results_num_w = 1;
        }
        if self.sweep.chi_target - self.sweep.chi_initial == 0.0 {
            self.sweep.results_num_chi = 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/ferro-types/, the fixtures live
    /// two levels up.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    #[test]
    fn test_load_default_config() {
        let cfg = ProblemConfig::from_file(&config_path("configs/default_config.json")).unwrap();
        assert_eq!(cfg.fluid.splits_num, 100);
        assert_eq!(cfg.field.surface_splits_num, 10);
        assert_eq!(cfg.field.internal_splits_num, 5);
        assert_eq!(cfg.field.external_splits_num, 5);
        assert!((cfg.field.infinity_multiplier - 4.0).abs() < 1e-12);
        assert!((cfg.sweep.chi_initial - 1.0).abs() < 1e-12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_sweep_config() {
        let cfg = ProblemConfig::from_file(&config_path("configs/w_sweep_config.json")).unwrap();
        assert!((cfg.sweep.w_target - 2.0).abs() < 1e-12);
        assert_eq!(cfg.sweep.results_num_w, 5);
        assert_eq!(cfg.sweep.results_num_chi, 2);
        assert!(cfg.output.dimensionless);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_object_uses_defaults() {
        let cfg: ProblemConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ProblemConfig::default());
        assert_eq!(cfg.output.x_label, "x");
        assert_eq!(cfg.sweep.outer_iterations_max, 1000);
        assert!(!cfg.fluid.pedantic_right_sweep);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg: ProblemConfig =
            serde_json::from_str(r#"{ "fluid": { "splits_num": 20 } }"#).unwrap();
        assert_eq!(cfg.fluid.splits_num, 20);
        assert!((cfg.fluid.accuracy - 0.1).abs() < 1e-12);
        assert_eq!(cfg.field, FieldConfig::default());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let mut cfg = ProblemConfig::default();
        cfg.sweep.w_target = 3.5;
        cfg.output.y_label = "height".to_string();
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        let cfg2: ProblemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, cfg2);
    }

    #[test]
    fn test_roundtrip_keeps_every_bit() {
        let mut cfg = ProblemConfig::default();
        cfg.sweep.w_target = 11.693819911581853;
        cfg.field.accuracy = 0.1 + 0.2;
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ProblemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sweep.w_target.to_bits(), cfg.sweep.w_target.to_bits());
        assert_eq!(back.field.accuracy.to_bits(), cfg.field.accuracy.to_bits());
    }

    #[test]
    fn test_validate_rejects_bad_relaxation() {
        let mut cfg = ProblemConfig::default();
        cfg.field.relax_param_initial = 1.5;
        assert!(matches!(
            cfg.validate(),
            Err(FerroError::InvalidParameter(_))
        ));

        let mut cfg = ProblemConfig::default();
        cfg.fluid.relax_param_min = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_small_grids() {
        let mut cfg = ProblemConfig::default();
        cfg.fluid.splits_num = 2;
        assert!(matches!(cfg.validate(), Err(FerroError::ConfigError(_))));

        let mut cfg = ProblemConfig::default();
        cfg.field.external_splits_num = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = ProblemConfig::default();
        cfg.field.infinity_multiplier = 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_normalize_degenerate_sweeps() {
        let mut cfg = ProblemConfig::default();
        cfg.sweep.results_num_w = 7;
        cfg.sweep.results_num_chi = 4;
        cfg.normalize();
        assert_eq!(cfg.sweep.results_num_w, 1);
        assert_eq!(cfg.sweep.results_num_chi, 1);

        let mut cfg = ProblemConfig::default();
        cfg.sweep.w_target = 1.0;
        cfg.sweep.results_num_w = 7;
        cfg.sweep.chi_target = 2.0;
        cfg.sweep.results_num_chi = 4;
        cfg.normalize();
        assert_eq!(cfg.sweep.results_num_w, 7);
        assert_eq!(cfg.sweep.results_num_chi, 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ProblemConfig::from_file(&config_path("configs/does_not_exist.json"));
        assert!(matches!(result, Err(FerroError::Io(_))));
    }
}
