mod cli;

use std::process;

use clap::{CommandFactory, Parser};
use cli::progress::CliReporter;
use cli::{Cli, Commands, OrganizeArgs, SummarizeArgs};
use colored::*;
use dicom_sorter::summary::{run_survey, SurveyConfig};
use dicom_sorter::{AppConfig, DicomDecoder, OrganizeEngine, PipelineConfig};
use dotenv::dotenv;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = cli::logging::init_logger();

    let config = match dicom_sorter::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Organize(organize_args)) => {
            if let Err(err) = run_organize(config, organize_args) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::Summarize(summarize_args)) => {
            if let Err(err) = run_summarize(config, summarize_args) {
                error!("Error: {:#}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_organize(mut config: AppConfig, args: OrganizeArgs) -> anyhow::Result<()> {
    args.apply(&mut config);
    let pipeline_config = PipelineConfig::from_app_config(&config)?;
    let engine = OrganizeEngine::new(pipeline_config);
    let reporter = CliReporter::new();
    let result = engine.run(&reporter)?;

    println!();
    info!(
        "Scan: {}, Total: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.total_duration.as_secs_f64()).green(),
    );
    info!(
        "{} files found, {} analyzed, {} moved",
        format!("{}", result.files_enumerated).cyan(),
        format!("{}", result.files_processed).cyan(),
        format!("{}", result.files_moved).cyan(),
    );
    info!(
        "{} series summarized, {} errors logged to {}",
        format!("{}", result.series_summarized).cyan(),
        format!("{}", result.errors_logged).red(),
        engine.config().error_log.display(),
    );

    Ok(())
}

fn run_summarize(config: AppConfig, args: SummarizeArgs) -> anyhow::Result<()> {
    let fields = config
        .summary_fields
        .clone()
        .unwrap_or_else(dicom_sorter::summary::standard_fields);
    let survey_config = SurveyConfig {
        source_dir: args.source_dir,
        full: args.full,
        fields,
        summary_output: args.summary_output.unwrap_or(config.summary_output),
        error_log: args.error_log.unwrap_or(config.error_log),
    };
    let decoder = DicomDecoder::new(survey_config.fields.iter().map(|f| f.name.clone()));
    let result = run_survey(&survey_config, &decoder)?;

    info!(
        "Summarized {} files from {} directories into {} rows in {}",
        format!("{}", result.files_summarized).cyan(),
        format!("{}", result.directories).cyan(),
        format!("{}", result.rows_written).cyan(),
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    if result.invalid_files > 0 {
        info!(
            "{} invalid files listed in {}",
            format!("{}", result.invalid_files).red(),
            survey_config.error_log.display()
        );
    }

    Ok(())
}
