// ─────────────────────────────────────────────────────────────────────
// Ferrodrop — Command Line Driver
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `ferrodrop`: droplet shapes over a W/χ sweep and the field model
//! problem, written as text tables under the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use ferro_core::fluid::volume_nondim_mul;
use ferro_core::output::{
    file_name, param, FieldTable, FluidTable, GridRegion, GridTable, HeightCoefTable, Table,
};
use ferro_core::solution::Solution;
use ferro_core::sweep::{run_w_continuation, ChiSweep};
use ferro_types::config::ProblemConfig;
use ferro_types::error::{FerroError, FerroResult};
use ferro_types::state::ResultCode;
use log::{info, warn};
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};

const INTERMEDIATE_DIR_NAME: &str = "intermediate";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON problem configuration; options below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for result tables
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Run the coupled W/χ continuation
    #[arg(long)]
    main_problem: bool,

    /// Run the field model problem around the seed sphere
    #[arg(long)]
    field_model_problem: bool,

    // ── Continuation ─────────────────────────────────────────────────
    /// Target magnetic Bond number W
    #[arg(long, value_parser = lenient_f64)]
    w_param_target: Option<f64>,

    /// Number of W results per χ
    #[arg(long, value_parser = lenient_usize)]
    w_results_num: Option<usize>,

    /// First susceptibility of the sweep
    #[arg(long, value_parser = lenient_f64)]
    chi_param_initial: Option<f64>,

    /// Last susceptibility of the sweep
    #[arg(long, value_parser = lenient_f64)]
    chi_param_target: Option<f64>,

    /// Number of χ values
    #[arg(long, value_parser = lenient_usize)]
    chi_results_num: Option<usize>,

    // ── Fluid ────────────────────────────────────────────────────────
    /// Fluid relaxation accuracy
    #[arg(long, value_parser = lenient_f64)]
    accuracy: Option<f64>,

    /// Fluid surface splits
    #[arg(long, value_parser = lenient_usize)]
    splits_num: Option<usize>,

    /// Fluid iteration cap per relaxation attempt
    #[arg(long, value_parser = lenient_usize)]
    iterations_max_num: Option<usize>,

    #[arg(long, value_parser = lenient_f64)]
    relaxation_param_initial: Option<f64>,

    #[arg(long, value_parser = lenient_f64)]
    relaxation_param_min: Option<f64>,

    /// Panic on a non-dominant tridiagonal system instead of warning
    #[arg(long)]
    pedantic_right_sweep: bool,

    // ── Field ────────────────────────────────────────────────────────
    #[arg(long, alias = "field-surf-splits-num", value_parser = lenient_usize)]
    field_surface_splits_num: Option<usize>,

    #[arg(long, alias = "field-int-splits-num", value_parser = lenient_usize)]
    field_internal_splits_num: Option<usize>,

    #[arg(long, alias = "field-ext-splits-num", value_parser = lenient_usize)]
    field_external_splits_num: Option<usize>,

    #[arg(long, value_parser = lenient_f64)]
    field_accuracy: Option<f64>,

    #[arg(long, alias = "field-iter-max-num", value_parser = lenient_usize)]
    field_iterations_max_num: Option<usize>,

    /// Distance of the outer boundary in surface radii
    #[arg(long, alias = "field-inf-pos-multiplier", value_parser = lenient_f64)]
    field_inf_multiplier: Option<f64>,

    #[arg(long, value_parser = lenient_f64)]
    field_relax_param_initial: Option<f64>,

    #[arg(long, value_parser = lenient_f64)]
    field_relax_param_min: Option<f64>,

    // ── Field model problem ──────────────────────────────────────────
    #[arg(long, value_parser = lenient_f64)]
    field_model_relax_param_initial: Option<f64>,

    #[arg(long, value_parser = lenient_f64)]
    field_model_relax_param_min: Option<f64>,

    #[arg(long, value_parser = lenient_f64)]
    field_model_chi: Option<f64>,

    // ── Output ───────────────────────────────────────────────────────
    /// Column label, single-quoted (e.g. 'r, mm')
    #[arg(long, alias = "label-x", allow_hyphen_values = true)]
    x_label: Option<String>,

    #[arg(long, alias = "label-y", allow_hyphen_values = true)]
    y_label: Option<String>,

    #[arg(long, alias = "label-potential", allow_hyphen_values = true)]
    potential_label: Option<String>,

    #[arg(long, alias = "label-error", allow_hyphen_values = true)]
    error_label: Option<String>,

    /// Scale coordinates to a unit-volume droplet
    #[arg(long)]
    dimensionless: bool,
}

/// Numbers are read permissively: anything unparsable becomes zero.
fn lenient_f64(raw: &str) -> Result<f64, Infallible> {
    Ok(raw.trim().parse().unwrap_or(0.0))
}

fn lenient_usize(raw: &str) -> Result<usize, Infallible> {
    Ok(raw.trim().parse().unwrap_or(0))
}

/// Contents of a single-quoted option value. `\'` stands for a quote; an
/// unterminated value runs to the end of the argument.
fn parse_quoted(option: &str, raw: &str) -> FerroResult<String> {
    let Some(body) = raw.strip_prefix('\'') else {
        return Err(FerroError::MalformedOption {
            option: option.to_string(),
            message: format!("expected a single-quoted string, got {raw}"),
        });
    };

    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => break,
            '\\' if chars.peek() == Some(&'\'') => {
                result.push('\'');
                chars.next();
            }
            _ => result.push(c),
        }
    }
    Ok(result)
}

fn set<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

fn set_label(target: &mut String, option: &str, value: &Option<String>) -> FerroResult<()> {
    if let Some(raw) = value {
        *target = parse_quoted(option, raw)?;
    }
    Ok(())
}

impl Args {
    /// Overlay command-line values on `cfg`.
    fn apply(&self, cfg: &mut ProblemConfig) -> FerroResult<()> {
        set(&mut cfg.sweep.w_target, self.w_param_target);
        set(&mut cfg.sweep.results_num_w, self.w_results_num);
        set(&mut cfg.sweep.chi_initial, self.chi_param_initial);
        set(&mut cfg.sweep.chi_target, self.chi_param_target);
        set(&mut cfg.sweep.results_num_chi, self.chi_results_num);

        set(&mut cfg.fluid.accuracy, self.accuracy);
        set(&mut cfg.fluid.splits_num, self.splits_num);
        set(&mut cfg.fluid.iterations_max, self.iterations_max_num);
        set(&mut cfg.fluid.relax_param_initial, self.relaxation_param_initial);
        set(&mut cfg.fluid.relax_param_min, self.relaxation_param_min);
        cfg.fluid.pedantic_right_sweep |= self.pedantic_right_sweep;

        set(&mut cfg.field.surface_splits_num, self.field_surface_splits_num);
        set(&mut cfg.field.internal_splits_num, self.field_internal_splits_num);
        set(&mut cfg.field.external_splits_num, self.field_external_splits_num);
        set(&mut cfg.field.accuracy, self.field_accuracy);
        set(&mut cfg.field.iterations_max, self.field_iterations_max_num);
        set(&mut cfg.field.infinity_multiplier, self.field_inf_multiplier);
        set(&mut cfg.field.relax_param_initial, self.field_relax_param_initial);
        set(&mut cfg.field.relax_param_min, self.field_relax_param_min);

        set(&mut cfg.model.relax_param_initial, self.field_model_relax_param_initial);
        set(&mut cfg.model.relax_param_min, self.field_model_relax_param_min);
        set(&mut cfg.model.chi, self.field_model_chi);

        set_label(&mut cfg.output.x_label, "x-label", &self.x_label)?;
        set_label(&mut cfg.output.y_label, "y-label", &self.y_label)?;
        set_label(&mut cfg.output.potential_label, "potential-label", &self.potential_label)?;
        set_label(&mut cfg.output.error_label, "error-label", &self.error_label)?;
        cfg.output.dimensionless |= self.dimensionless;

        Ok(())
    }
}

fn write_table(table: &dyn Table, dir: &Path, name: String) -> Result<PathBuf> {
    let path = dir.join(name);
    table
        .write_file(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn run_field_model_problem(solution: &mut Solution, dir: &Path) -> Result<()> {
    info!("Calculating field model problem...");
    let code = solution.calc_field_model_problem();
    let (Some(model), ResultCode::FieldSuccess) = (solution.model_result(), code) else {
        warn!("Could not calculate field model problem ({code})");
        return Ok(());
    };

    let out = &solution.config().output;
    let scale = if out.dimensionless {
        volume_nondim_mul(&model.surface)
    } else {
        1.0
    };

    let field = FieldTable {
        chi: model.chi,
        scale,
        x_label: &out.x_label,
        y_label: &out.y_label,
        value_label: &out.potential_label,
        grid: &model.grid,
        values: &model.potential,
    };
    write_table(&field, dir, file_name("field-model", "dat", &[]))?;

    let error = FieldTable {
        value_label: &out.error_label,
        values: &model.error,
        ..field
    };
    write_table(&error, dir, file_name("field-model", "dat", &["error".to_string()]))?;

    for (region, tag) in [(GridRegion::Internal, "int"), (GridRegion::External, "ext")] {
        let grid = GridTable {
            chi: model.chi,
            scale,
            region,
            x_label: &out.x_label,
            y_label: &out.y_label,
            grid: &model.grid,
        };
        write_table(&grid, dir, file_name("field-model", "dat", &["grid".to_string(), tag.to_string()]))?;
    }

    let fluid = FluidTable {
        chi: model.chi,
        w: 0.0,
        scale,
        x_label: &out.x_label,
        y_label: &out.y_label,
        points: &model.surface,
    };
    write_table(&fluid, dir, file_name("field-model", "dat", &["fluid".to_string()]))?;

    info!("Field model problem results saved to {}", dir.display());
    Ok(())
}

fn run_main_problem(solution: &mut Solution, dir: &Path) -> Result<()> {
    let sweep_cfg = solution.config().sweep.clone();
    if sweep_cfg.results_num_w == 0 || sweep_cfg.results_num_chi == 0 {
        warn!("Number of results is zero");
        return Ok(());
    }

    info!("Calculating main problem...");
    for chi in ChiSweep::from_config(&sweep_cfg) {
        let run = run_w_continuation(solution, chi);
        let out = solution.config().output.clone();
        let scale = if out.dimensionless {
            solution.volume_nondim_mul()
        } else {
            1.0
        };

        for record in &run.records {
            let fluid = FluidTable {
                chi,
                w: record.w,
                scale: if out.dimensionless { record.volume_nondim_mul } else { 1.0 },
                x_label: &out.x_label,
                y_label: &out.y_label,
                points: &record.surface,
            };
            write_table(&fluid, dir, file_name("fluid", "dat", &[param(chi), param(record.w)]))?;
        }

        if !run.target_reached() {
            warn!("Target W parameter can't be reached");
            return Ok(());
        }

        let snapshot = solution.snapshot();
        let field = FieldTable {
            chi,
            scale,
            x_label: &out.x_label,
            y_label: &out.y_label,
            value_label: &out.potential_label,
            grid: &snapshot.grid,
            values: &snapshot.potential,
        };
        write_table(&field, dir, file_name("field", "dat", &[param(chi)]))?;

        for (region, tag) in [(GridRegion::Internal, "internal"), (GridRegion::External, "external")] {
            let grid = GridTable {
                chi,
                scale,
                region,
                x_label: &out.x_label,
                y_label: &out.y_label,
                grid: &snapshot.grid,
            };
            write_table(&grid, dir, file_name("grid", "dat", &[tag.to_string(), param(chi)]))?;
        }

        let rows: Vec<(f64, f64)> = run.records.iter().map(|r| (r.w, r.height_coef)).collect();
        let heights = HeightCoefTable { chi, rows: &rows };
        write_table(&heights, dir, file_name("height-coefs", "dat", &[param(chi)]))?;

        info!("chi = {chi}: results saved to {}", dir.display());
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ProblemConfig::from_file(&path.to_string_lossy())
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ProblemConfig::default(),
    };
    args.apply(&mut config)?;
    config.normalize();

    let intermediate = args.output_dir.join(INTERMEDIATE_DIR_NAME);
    if intermediate.exists() {
        fs::remove_dir_all(&intermediate)
            .with_context(|| format!("failed to clear {}", intermediate.display()))?;
    }
    fs::create_dir_all(&intermediate)
        .with_context(|| format!("failed to create {}", intermediate.display()))?;

    let mut solution = Solution::new(config).context("invalid problem parameters")?;

    if !args.main_problem && !args.field_model_problem {
        warn!("Nothing to do: pass --main-problem and/or --field-model-problem");
    }

    if args.field_model_problem {
        run_field_model_problem(&mut solution, &intermediate)?;
    }

    if args.main_problem {
        run_main_problem(&mut solution, &intermediate)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_plain() {
        assert_eq!(parse_quoted("x-label", "'r, mm'").unwrap(), "r, mm");
    }

    #[test]
    fn test_parse_quoted_escape() {
        assert_eq!(parse_quoted("x-label", r"'it\'s'").unwrap(), "it's");
    }

    #[test]
    fn test_parse_quoted_unterminated() {
        assert_eq!(parse_quoted("x-label", "'open").unwrap(), "open");
    }

    #[test]
    fn test_parse_quoted_rejects_bare() {
        let err = parse_quoted("y-label", "bare").unwrap_err();
        assert!(matches!(err, FerroError::MalformedOption { ref option, .. } if option == "y-label"));
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "ferrodrop",
            "--w-param-target",
            "2.5",
            "--splits-num",
            "40",
            "--field-surf-splits-num",
            "12",
            "--x-label",
            "'r'",
            "--dimensionless",
        ]);
        let mut cfg = ProblemConfig::default();
        args.apply(&mut cfg).unwrap();

        assert_eq!(cfg.sweep.w_target, 2.5);
        assert_eq!(cfg.fluid.splits_num, 40);
        assert_eq!(cfg.field.surface_splits_num, 12);
        assert_eq!(cfg.output.x_label, "r");
        assert!(cfg.output.dimensionless);
        assert_eq!(cfg.field.internal_splits_num, ProblemConfig::default().field.internal_splits_num);
    }

    #[test]
    fn test_malformed_number_falls_back_to_zero() {
        let args = Args::try_parse_from([
            "ferrodrop",
            "--accuracy",
            "fast",
            "--splits-num",
            "many",
            "--w-param-target",
            " 2.5 ",
        ])
        .unwrap();
        assert_eq!(args.accuracy, Some(0.0));
        assert_eq!(args.splits_num, Some(0));
        assert_eq!(args.w_param_target, Some(2.5));
    }

    #[test]
    fn test_malformed_label_is_rejected() {
        let args = Args::parse_from(["ferrodrop", "--y-label", "y"]);
        assert!(args.apply(&mut ProblemConfig::default()).is_err());
    }
}
