use crate::cli::args::{Cli, Commands, SourceArgs, WarehouseArgs};
use crate::error::{ProcessingError, Result};
use crate::models::{DateDimRow, LocationDimRow, TemperatureFactRow};
use crate::pipeline::{self, TransformOptions};
use crate::readers::{DatasetInfo, ParquetReader};
use crate::settings::Settings;
use crate::utils::constants::{DATE_DIM, LOCATION_DIM, TEMPERATURE_FACT};
use crate::utils::progress::ProgressReporter;
use crate::warehouse::{MemoryWarehouse, PgWarehouse, QualityMode};
use serde::Serialize;
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let silent = !std::io::stderr().is_terminal();

    match cli.command {
        Commands::Run { source, warehouse } => {
            let options = transform_options(&source);
            let mode = quality_mode(warehouse.collect_failures);
            let progress = ProgressReporter::new_spinner("Starting run...", silent);

            let summary = if warehouse.dry_run {
                info!(root = %options.output_root.display(), "Dry run against in-process warehouse");
                let storage = pipeline::local_storage(&options.output_root);
                let mut target = MemoryWarehouse::with_source_root(&options.output_root);
                pipeline::run(&options, &storage, &mut target, mode, Some(&progress)).await?
            } else {
                let settings = load_settings(&warehouse)?;
                let mut target = PgWarehouse::connect(&settings.warehouse).await?;
                let summary =
                    pipeline::run(&options, &settings.storage, &mut target, mode, Some(&progress))
                        .await?;
                target.close().await?;
                summary
            };

            progress.finish_with_message("Run complete");
            println!("\n{}", summary.schema.report.summary());
            println!("Rows loaded: {}", summary.rows_loaded);
            println!("{}", summary.quality.summary());
        }

        Commands::Transform { source } => {
            let options = transform_options(&source);
            let progress = ProgressReporter::new_spinner("Transforming...", silent);

            let (schema, written) = pipeline::transform_and_write(&options, Some(&progress))?;

            progress.finish_with_message("Transform complete");
            println!("\n{}", schema.report.summary());
            for path in written {
                println!("Wrote {}", path.display());
            }
        }

        Commands::Load { output, warehouse } => {
            let mode = quality_mode(warehouse.collect_failures);
            let progress = ProgressReporter::new_spinner("Loading...", silent);

            let (rows, report) = if warehouse.dry_run {
                let storage = pipeline::local_storage(&output);
                let mut target = MemoryWarehouse::with_source_root(&output);
                pipeline::load_and_check(&mut target, &storage, mode, Some(&progress)).await?
            } else {
                let settings = load_settings(&warehouse)?;
                let mut target = PgWarehouse::connect(&settings.warehouse).await?;
                let result =
                    pipeline::load_and_check(&mut target, &settings.storage, mode, Some(&progress))
                        .await?;
                target.close().await?;
                result
            };

            progress.finish_with_message("Load complete");
            println!("Rows loaded: {}", rows);
            println!("{}", report.summary());
        }

        Commands::Check {
            config,
            collect_failures,
        } => {
            let settings = Settings::load(&config)?;
            let progress = ProgressReporter::new_spinner("Checking...", silent);

            let mut target = PgWarehouse::connect(&settings.warehouse).await?;
            let report =
                pipeline::check(&mut target, quality_mode(collect_failures), Some(&progress))
                    .await?;
            target.close().await?;

            progress.finish_with_message("Checks complete");
            println!("{}", report.summary());
        }

        Commands::Info { output, sample } => {
            let info = inspect_output(&output, sample)?;
            let json = serde_json::to_string_pretty(&info)
                .map_err(|e| ProcessingError::InvalidFormat(e.to_string()))?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let initialised = match log_file {
        Some(path) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .try_init(),
    };

    initialised.map_err(|e| ProcessingError::Config(format!("logging: {}", e)))
}

fn transform_options(source: &SourceArgs) -> TransformOptions {
    let mut options = TransformOptions::new(&source.temperature, &source.demographics, &source.output);
    options.row_limit = source.row_limit;
    options.compression = source.compression.clone();
    options
}

fn quality_mode(collect_failures: bool) -> QualityMode {
    if collect_failures {
        QualityMode::CollectAll
    } else {
        QualityMode::FailFast
    }
}

fn load_settings(args: &WarehouseArgs) -> Result<Settings> {
    let settings = Settings::load(&args.config)?;
    info!(config = %args.config.display(), warehouse = ?settings.warehouse, "Loaded settings");
    Ok(settings)
}

#[derive(Debug, Serialize)]
struct OutputInfo {
    datasets: Vec<DatasetInfo>,
    date_dim_sample: Vec<DateDimRow>,
    location_dim_sample: Vec<LocationDimRow>,
    temperature_fact_sample: Vec<TemperatureFactRow>,
}

fn inspect_output(root: &Path, sample: usize) -> Result<OutputInfo> {
    let reader = ParquetReader::new();

    let mut datasets = Vec::new();
    for name in [DATE_DIM, LOCATION_DIM, TEMPERATURE_FACT] {
        let info = reader.dataset_info(&root.join(name))?;
        info!("{}", info.summary());
        datasets.push(info);
    }

    Ok(OutputInfo {
        datasets,
        date_dim_sample: head(reader.read_date_dim(&root.join(DATE_DIM))?, sample),
        location_dim_sample: head(reader.read_location_dim(&root.join(LOCATION_DIM))?, sample),
        temperature_fact_sample: head(
            reader.read_temperature_fact(&root.join(TEMPERATURE_FACT))?,
            sample,
        ),
    })
}

fn head<T>(mut rows: Vec<T>, n: usize) -> Vec<T> {
    rows.truncate(n);
    rows
}
