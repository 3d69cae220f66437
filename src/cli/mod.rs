//! Command-line parsing for `funcfit`.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! the orchestration and numerics. Everything here is converted into plain
//! domain configuration (`RunConfig`, `SampleConfig`) by `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelFamily;
use crate::io::DEFAULT_EXPORT_FILE;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "funcfit", version, about = "Parametric model preview and least-squares fitting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the model catalog.
    Models(ModelsArgs),
    /// Evaluate a model on a range or on loaded data, without fitting.
    Eval(EvalArgs),
    /// Fit a model to data and print parameters with standard errors.
    Fit(FitArgs),
    /// Write a synthetic noisy dataset drawn from a model.
    Generate(GenerateArgs),
    /// Print a JSON report written by `--export-json`.
    Show(ShowArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ModelsArgs {
    /// Only list one family.
    #[arg(long, value_enum)]
    pub family: Option<ModelFamily>,
}

/// Model selection and parameter overrides.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Catalog model name (see `funcfit models`).
    #[arg(short = 'm', long)]
    pub model: String,

    /// Parameter value in display units, e.g. `--param R=45`. Repeatable.
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, f64)>,
}

/// Preview grid used while no data is loaded.
#[derive(Debug, Args, Clone)]
pub struct RangeArgs {
    /// Lower end of the x range (default: the model family's range).
    #[arg(long, allow_negative_numbers = true)]
    pub x_min: Option<f64>,

    /// Upper end of the x range (default: the model family's range).
    #[arg(long, allow_negative_numbers = true)]
    pub x_max: Option<f64>,

    /// Number of grid points.
    #[arg(long)]
    pub points: Option<usize>,
}

/// Where observed data comes from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Column file (`x y [sy]`) or http(s) URL.
    #[arg(short = 'd', long, value_name = "PATH|URL", conflicts_with = "example")]
    pub data: Option<String>,

    /// Use the bundled Gaussian example dataset.
    #[arg(long)]
    pub example: bool,
}

/// Result files.
#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    /// Write the plain-text result file.
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = DEFAULT_EXPORT_FILE)]
    pub export: Option<PathBuf>,

    /// Write a JSON report readable by `funcfit show`.
    #[arg(long = "export-json", value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EvalArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub export: ExportArgs,

    /// Rows of the curve to print.
    #[arg(long, default_value_t = 11)]
    pub rows: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub data: DataArgs,

    /// Keep a parameter fixed during the fit. Repeatable.
    #[arg(long, value_name = "NAME")]
    pub fix: Vec<String>,

    /// Let a parameter vary during the fit. Repeatable.
    #[arg(long, value_name = "NAME")]
    pub vary: Vec<String>,

    #[command(flatten)]
    pub export: ExportArgs,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Relative noise: σ = noise · |y| + noise_floor.
    #[arg(long, default_value_t = 0.05)]
    pub noise: f64,

    /// Absolute noise floor added to σ.
    #[arg(long, default_value_t = 0.0)]
    pub noise_floor: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output column file.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Report JSON produced by `--export-json`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,
}

/// Parse `NAME=VALUE`.
pub fn parse_param(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in `{s}`"));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a number", value.trim()))?;
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_assignments_parse() {
        assert_eq!(parse_param("R=45"), Ok(("R".to_string(), 45.0)));
        assert_eq!(parse_param(" σ_R = 12.5 "), Ok(("σ_R".to_string(), 12.5)));
        assert_eq!(parse_param("b=-1e-3"), Ok(("b".to_string(), -1e-3)));
        assert!(parse_param("R").is_err());
        assert!(parse_param("=4").is_err());
        assert!(parse_param("R=abc").is_err());
    }

    #[test]
    fn fit_command_parses() {
        let cli = Cli::try_parse_from([
            "funcfit", "fit", "--model", "gaussian", "--example", "--param", "A=2", "--fix", "c", "--export",
        ])
        .unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model.model, "gaussian");
        assert_eq!(args.model.params, vec![("A".to_string(), 2.0)]);
        assert_eq!(args.fix, vec!["c".to_string()]);
        assert!(args.data.example);
        assert_eq!(args.export.export, Some(PathBuf::from(DEFAULT_EXPORT_FILE)));
    }

    #[test]
    fn data_and_example_conflict() {
        let err = Cli::try_parse_from(["funcfit", "fit", "-m", "linear", "--example", "--data", "a.dat"]);
        assert!(err.is_err());
    }

    #[test]
    fn negative_range_bounds_are_accepted() {
        let cli = Cli::try_parse_from(["funcfit", "eval", "-m", "linear", "--x-min", "-2", "--x-max", "2"]).unwrap();
        let Command::Eval(args) = cli.command else {
            panic!("expected eval");
        };
        assert_eq!(args.range.x_min, Some(-2.0));
        assert_eq!(args.range.x_max, Some(2.0));
    }
}
