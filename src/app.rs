//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the logger
//! - parses CLI arguments
//! - runs model evaluation, fitting or sample generation
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, DataArgs, EvalArgs, ExportArgs, FitArgs, GenerateArgs, ModelArgs, ModelsArgs, RangeArgs, ShowArgs};
use crate::domain::{LinspaceRange, RunConfig, SampleConfig};
use crate::engine::LocalEngine;
use crate::error::AppError;
use crate::io::FitReport;
use crate::models::ModelRegistry;

pub mod pipeline;

/// Entry point for the `funcfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Models(args) => handle_models(args),
        Command::Eval(args) => handle_eval(args),
        Command::Fit(args) => handle_fit(args),
        Command::Generate(args) => handle_generate(args),
        Command::Show(args) => handle_show(args),
    }
}

/// `warn` unless `RUST_LOG` says otherwise.
fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("warn");
    // A second init (e.g. from tests) is harmless.
    env_logger::Builder::from_env(env).format_timestamp(None).try_init().ok();
}

fn handle_models(args: ModelsArgs) -> Result<(), AppError> {
    let registry = ModelRegistry::global();
    let text = match args.family {
        Some(family) => crate::report::format_model_list(registry.family(family)),
        None => crate::report::format_model_list(registry.models()),
    };
    print!("{text}");
    Ok(())
}

fn handle_eval(args: EvalArgs) -> Result<(), AppError> {
    let config = run_config(&args.model, Some(&args.range), &args.data, &[], &[], &args.export);
    let run = pipeline::run_eval(&config)?;

    println!("{}", crate::report::format_parameter_table(&run.model));
    print!("{}", crate::report::format_dataset_summary(&run.dataset));
    print!("{}", crate::report::format_curve_preview(&run.dataset, args.rows));

    write_exports(&config, &run)
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config(&args.model, None, &args.data, &args.fix, &args.vary, &args.export);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_parameter_table(&run.model));
    print!("{}", crate::report::format_dataset_summary(&run.dataset));
    if let Some(stats) = &run.fit {
        println!();
        print!("{}", crate::report::format_fit_summary(stats));
    }

    write_exports(&config, &run)
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let no_data = DataArgs {
        data: None,
        example: false,
    };
    let no_export = ExportArgs {
        export: None,
        export_json: None,
    };
    let config = run_config(&args.model, Some(&args.range), &no_data, &[], &[], &no_export);
    let session = pipeline::prepare(&config)?;
    let model = session
        .model()
        .ok_or_else(|| AppError::new(2, "No model selected."))?;

    let sample_config = SampleConfig {
        noise_rel: args.noise,
        noise_floor: args.noise_floor,
        seed: args.seed,
    };
    let range = session.range();
    let sample = crate::data::generate_sample(&LocalEngine::default(), model, &range, &sample_config)?;

    let header = format!(
        "Synthetic {} data generated by funcfit {}\nparameters: {}\nnoise: {} relative + {} absolute, seed {}",
        model.display_name,
        env!("CARGO_PKG_VERSION"),
        model
            .parameters
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect::<Vec<_>>()
            .join(", "),
        sample_config.noise_rel,
        sample_config.noise_floor,
        sample_config.seed
    );
    crate::io::write_columns_file(&args.out, &sample, &header)?;
    println!(
        "Wrote {} points of {} on [{}, {}] to {}",
        sample.len(),
        model.display_name,
        range.x_min,
        range.x_max,
        args.out.display()
    );
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::read_report_json(&args.report)?;
    print!("{}", crate::report::format_saved_report(&report));
    Ok(())
}

fn write_exports(config: &RunConfig, run: &pipeline::RunOutput) -> Result<(), AppError> {
    if let Some(path) = &config.export_text {
        crate::io::write_result_text(path, &run.dataset, Some(&run.model), run.fit.as_ref())?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &config.export_json {
        let report = FitReport::new(
            &run.dataset,
            Some(&run.model),
            run.fit.as_ref(),
            &crate::io::timestamp_now(),
        );
        crate::io::write_report_json(path, &report)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Convert parsed flags into a `RunConfig`.
///
/// Partial range flags are completed from the model family's default range.
pub fn run_config(
    model: &ModelArgs,
    range: Option<&RangeArgs>,
    data: &DataArgs,
    fix: &[String],
    vary: &[String],
    export: &ExportArgs,
) -> RunConfig {
    let range = range.and_then(|r| resolve_range(&model.model, r));
    RunConfig {
        model: model.model.clone(),
        params: model.params.clone(),
        fix: fix.to_vec(),
        vary: vary.to_vec(),
        range,
        data: pipeline::data_source(data.data.as_deref(), data.example),
        export_text: export.export.clone(),
        export_json: export.export_json.clone(),
    }
}

fn resolve_range(model: &str, args: &RangeArgs) -> Option<LinspaceRange> {
    if args.x_min.is_none() && args.x_max.is_none() && args.points.is_none() {
        return None;
    }
    let default = ModelRegistry::global().get(model)?.family.default_range();
    Some(LinspaceRange::new(
        args.x_min.unwrap_or(default.x_min),
        args.x_max.unwrap_or(default.x_max),
        args.points.unwrap_or(default.points),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataSource;

    fn model_args(name: &str) -> ModelArgs {
        ModelArgs {
            model: name.to_string(),
            params: vec![("a".to_string(), 2.0)],
        }
    }

    fn no_export() -> ExportArgs {
        ExportArgs {
            export: None,
            export_json: None,
        }
    }

    #[test]
    fn logging_can_be_initialized_twice() {
        init_logging();
        init_logging();
        log::debug!("logger survives a second init");
    }

    #[test]
    fn partial_range_is_completed_from_family_default() {
        let range = RangeArgs {
            x_min: None,
            x_max: Some(0.3),
            points: None,
        };
        let data = DataArgs {
            data: None,
            example: false,
        };
        let cfg = run_config(&model_args("sas_cube"), Some(&range), &data, &[], &[], &no_export());
        assert_eq!(cfg.range, Some(LinspaceRange::new(0.01, 0.3, 100)));
        assert_eq!(cfg.data, DataSource::None);
        assert_eq!(cfg.params, vec![("a".to_string(), 2.0)]);
    }

    #[test]
    fn no_range_flags_keep_default() {
        let range = RangeArgs {
            x_min: None,
            x_max: None,
            points: None,
        };
        let data = DataArgs {
            data: Some("in.dat".to_string()),
            example: false,
        };
        let cfg = run_config(&model_args("linear"), Some(&range), &data, &["b".to_string()], &[], &no_export());
        assert!(cfg.range.is_none());
        assert_eq!(cfg.data, DataSource::Path("in.dat".into()));
        assert_eq!(cfg.fix, vec!["b".to_string()]);
    }
}
