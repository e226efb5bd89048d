//! End-to-end run: transform, write, then load into and check the warehouse.
//!
//! Steps are strictly sequential and the first error ends the run. Each step
//! logs a start and a completion line.

use crate::error::{ProcessingError, Result};
use crate::processors::{IntegrityChecker, StarSchema, TransformPipeline};
use crate::settings::StorageSettings;
use crate::utils::constants::{COMPRESSION_SNAPPY, DEFAULT_ROW_LIMIT};
use crate::utils::progress::ProgressReporter;
use crate::warehouse::{
    star_schema_tables, BulkLoader, QualityGate, QualityMode, QualityReport, SchemaLifecycle,
    Warehouse,
};
use crate::writers::ParquetWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Inputs of the transform half of a run
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub temperature_path: PathBuf,
    pub demographic_path: PathBuf,
    pub output_root: PathBuf,
    pub row_limit: usize,
    pub compression: String,
}

impl TransformOptions {
    pub fn new(
        temperature_path: impl Into<PathBuf>,
        demographic_path: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            temperature_path: temperature_path.into(),
            demographic_path: demographic_path.into(),
            output_root: output_root.into(),
            row_limit: DEFAULT_ROW_LIMIT,
            compression: COMPRESSION_SNAPPY.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub schema: StarSchema,
    pub written: Vec<PathBuf>,
    pub rows_loaded: u64,
    pub quality: QualityReport,
}

fn step(progress: Option<&ProgressReporter>, message: &str) {
    if let Some(p) = progress {
        p.set_message(message);
    }
}

/// Derive the star schema, verify its integrity and write the three datasets
pub fn transform_and_write(
    options: &TransformOptions,
    progress: Option<&ProgressReporter>,
) -> Result<(StarSchema, Vec<PathBuf>)> {
    step(progress, "Transforming source data...");
    info!("Transforming source data");
    let schema = TransformPipeline::new()
        .with_row_limit(options.row_limit)
        .run(&options.temperature_path, &options.demographic_path)?;
    info!("Done transforming source data");

    step(progress, "Checking integrity...");
    let checker = IntegrityChecker::new();
    let integrity = checker.check_integrity(&schema);
    info!("{}", checker.generate_summary(&integrity));
    integrity.ensure_clean()?;

    step(progress, "Writing parquet datasets...");
    info!(root = %options.output_root.display(), "Writing parquet datasets");
    let written = ParquetWriter::new()
        .with_compression(&options.compression)?
        .write_star_schema(&schema, &options.output_root)?;
    info!(datasets = written.len(), "Done writing parquet datasets");

    Ok((schema, written))
}

/// Drop and recreate the tables, bulk load them, then run the quality gate.
///
/// The quality report is returned only when every check passed.
pub async fn load_and_check<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    storage: &StorageSettings,
    mode: QualityMode,
    progress: Option<&ProgressReporter>,
) -> Result<(u64, QualityReport)> {
    let tables = star_schema_tables();
    let lifecycle = SchemaLifecycle::new(tables);

    step(progress, "Dropping tables...");
    info!("Dropping tables");
    lifecycle.drop_tables(warehouse).await?;
    info!("Done dropping tables");

    step(progress, "Creating tables...");
    info!("Creating tables");
    lifecycle.create_tables(warehouse).await?;
    info!("Done creating tables");

    step(progress, "Loading tables...");
    info!("Loading tables");
    let rows = BulkLoader::new(storage.clone())
        .load_all(warehouse, &tables)
        .await?;
    info!(rows, "Done loading tables");

    let report = check(warehouse, mode, progress).await?;
    Ok((rows, report))
}

/// Run the quality gate over all three tables, failing on any finding
pub async fn check<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    mode: QualityMode,
    progress: Option<&ProgressReporter>,
) -> Result<QualityReport> {
    step(progress, "Running quality checks...");
    info!("Running quality checks");
    let report = QualityGate::new(mode)
        .run(warehouse, &star_schema_tables())
        .await?;
    report.ensure_passed()?;
    info!("Done running quality checks");
    Ok(report)
}

/// The whole pipeline against `warehouse`.
///
/// The warehouse copies from `storage`, so the output root must be that same
/// location. Otherwise the load would read whatever an earlier upload left
/// there; the run is refused before anything is written.
pub async fn run<W: Warehouse + ?Sized>(
    options: &TransformOptions,
    storage: &StorageSettings,
    warehouse: &mut W,
    mode: QualityMode,
    progress: Option<&ProgressReporter>,
) -> Result<RunSummary> {
    ensure_copy_source(options, storage)?;

    let (schema, written) = transform_and_write(options, progress)?;
    let (rows_loaded, quality) = load_and_check(warehouse, storage, mode, progress).await?;

    Ok(RunSummary {
        schema,
        written,
        rows_loaded,
        quality,
    })
}

fn ensure_copy_source(options: &TransformOptions, storage: &StorageSettings) -> Result<()> {
    let location = storage.location();
    if Path::new(&location) == options.output_root {
        return Ok(());
    }
    Err(ProcessingError::Config(format!(
        "output root {} is not the bulk-copy source {}; run `transform`, upload the datasets, then `load`",
        options.output_root.display(),
        location
    )))
}

/// Storage settings that point bulk copies at a local output root
pub fn local_storage(output_root: &Path) -> StorageSettings {
    let mut storage = StorageSettings::local("");
    storage.bucket = output_root.display().to_string();
    storage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::MemoryWarehouse;
    use std::fs;
    use tempfile::TempDir;

    const TEMPERATURES: &str = "\
dt,AverageTemperature,AverageTemperatureUncertainty,City,Country,Latitude,Longitude
1820-01-01,2.345678,1.1234,Boston,United States,42.59N,72.00W
1820-02-01,,1.5,Boston,United States,42.59N,72.00W
1820-01-01,5.0,0.5,Paris,France,49.03N,2.45E
";

    const DEMOGRAPHICS: &str = "\
City;State;Median Age;Total Population
Boston;Massachusetts;31.3;669469
";

    fn write_sources(dir: &Path) -> TransformOptions {
        let temperature = dir.join("temperatures.csv");
        let demographics = dir.join("demographics.csv");
        fs::write(&temperature, TEMPERATURES).unwrap();
        fs::write(&demographics, DEMOGRAPHICS).unwrap();
        TransformOptions::new(temperature, demographics, dir.join("output"))
    }

    #[tokio::test]
    async fn test_run_against_memory_warehouse() -> Result<()> {
        let dir = TempDir::new()?;
        let options = write_sources(dir.path());
        let mut warehouse = MemoryWarehouse::with_source_root(&options.output_root);

        let summary = run(
            &options,
            &local_storage(&options.output_root),
            &mut warehouse,
            QualityMode::FailFast,
            None,
        )
        .await?;

        assert_eq!(summary.schema.temperature_fact.len(), 1);
        assert_eq!(summary.written.len(), 3);
        assert_eq!(summary.rows_loaded, 3);
        assert!(summary.quality.passed());
        assert_eq!(warehouse.row_count("temperatureFact"), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_run_refuses_output_root_outside_copy_source() -> Result<()> {
        let dir = TempDir::new()?;
        let options = write_sources(dir.path());
        let mut warehouse = MemoryWarehouse::with_source_root(&options.output_root);
        let storage = StorageSettings {
            bucket: "s3://data-mig-project".to_string(),
            access_key_id: "AKIAEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
            prefix: "output".to_string(),
        };

        let result = run(&options, &storage, &mut warehouse, QualityMode::FailFast, None).await;

        match result {
            Err(ProcessingError::Config(message)) => {
                assert!(message.contains("s3://data-mig-project/output"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!options.output_root.exists());
        assert_eq!(warehouse.row_count("temperatureFact"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_run_accepts_storage_rooted_at_output() -> Result<()> {
        let dir = TempDir::new()?;
        let options = write_sources(dir.path());
        let mut warehouse = MemoryWarehouse::with_source_root(&options.output_root);
        let mut storage = StorageSettings::local("output");
        storage.bucket = format!("{}/", dir.path().display());

        let summary = run(&options, &storage, &mut warehouse, QualityMode::FailFast, None).await?;

        assert_eq!(summary.rows_loaded, 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_result_fails_quality_gate() -> Result<()> {
        let dir = TempDir::new()?;
        let mut options = write_sources(dir.path());
        options.row_limit = 0;
        let mut warehouse = MemoryWarehouse::with_source_root(&options.output_root);

        let result = run(
            &options,
            &local_storage(&options.output_root),
            &mut warehouse,
            QualityMode::FailFast,
            None,
        )
        .await;

        assert!(matches!(
            result,
            Err(ProcessingError::DataQuality { ref table, .. }) if table == "dateDim"
        ));
        Ok(())
    }
}
