use climate_warehouse::error::{ProcessingError, Result};
use climate_warehouse::pipeline::{self, TransformOptions};
use climate_warehouse::processors::IntegrityChecker;
use climate_warehouse::readers::ParquetReader;
use climate_warehouse::utils::keys::location_id;
use climate_warehouse::utils::rounding::decimal_places;
use climate_warehouse::warehouse::{
    star_schema_tables, MemoryWarehouse, QualityGate, QualityMode, SchemaLifecycle,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TEMPERATURES: &str = "\
dt,AverageTemperature,AverageTemperatureUncertainty,City,Country,Latitude,Longitude
1820-01-01,2.345678,1.1234,Boston,United States,42.59N,72.00W
1820-02-01,,1.5,Boston,United States,42.59N,72.00W
1820-01-01,-7.5555,2.001,Chicago,United States,42.59N,87.27W
1820-03-01,4.25,0.75,Chicago,United States,42.59N,87.27W
1820-01-01,3.1,0.4,Paris,France,49.03N,2.45E
1820-01-01,11.2,0.9,Springfield,United States,39.38N,89.14W
";

const DEMOGRAPHICS: &str = "\
City;State;Median Age;Male Population;Female Population;Total Population;Race
Boston;Massachusetts;31.3;314023;355446;669469;White
Boston;Massachusetts;31.3;314023;355446;669469;Asian
Chicago;Illinois;34.2;1320015;1400541;2720556;White
Springfield;Missouri;29.7;81562;85157;166719;White
Springfield;Illinois;38.1;55306;61376;116682;White
";

fn write_sources(dir: &Path) -> TransformOptions {
    let temperature = dir.join("GlobalLandTemperaturesByCity.csv");
    let demographics = dir.join("us-cities-demographics.csv");
    fs::write(&temperature, TEMPERATURES).expect("write temperatures");
    fs::write(&demographics, DEMOGRAPHICS).expect("write demographics");
    TransformOptions::new(temperature, demographics, dir.join("output"))
}

#[test]
fn test_boston_row_is_rounded_and_keyed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let options = write_sources(temp_dir.path());

    let (schema, _) = pipeline::transform_and_write(&options, None)?;

    let boston_id = location_id("Boston", "United States");
    let boston: Vec<_> = schema
        .temperature_fact
        .iter()
        .filter(|f| f.location_id == boston_id)
        .collect();
    assert_eq!(boston.len(), 1);
    assert_eq!(boston[0].avg_temp, 2.346);
    assert_eq!(boston[0].avg_temp_uncert, 1.123);

    let location = schema
        .location_dim
        .iter()
        .find(|l| l.location_id == boston_id)
        .expect("Boston location");
    assert_eq!(location.state, "Massachusetts");
    assert_eq!(location.total_population, "669469");
    Ok(())
}

#[test]
fn test_null_temperature_leaves_no_trace() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let options = write_sources(temp_dir.path());

    let (schema, _) = pipeline::transform_and_write(&options, None)?;

    // 1820-02-01 only occurs on the dropped Boston row
    assert!(schema
        .date_dim
        .iter()
        .all(|d| d.date.to_string() != "1820-02-01"));
    assert_eq!(schema.report.rows_null_temperature, 1);
    assert_eq!(schema.temperature_fact.len(), 4);
    Ok(())
}

#[test]
fn test_star_schema_invariants() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let options = write_sources(temp_dir.path());

    let (schema, _) = pipeline::transform_and_write(&options, None)?;

    let report = IntegrityChecker::new().check_integrity(&schema);
    assert!(report.is_clean());

    let date_ids: HashSet<_> = schema.date_dim.iter().map(|d| &d.date_id).collect();
    let location_ids: HashSet<_> = schema.location_dim.iter().map(|l| &l.location_id).collect();
    assert_eq!(date_ids.len(), schema.date_dim.len());
    assert_eq!(location_ids.len(), schema.location_dim.len());

    for fact in &schema.temperature_fact {
        assert!(date_ids.contains(&fact.date_id));
        assert!(location_ids.contains(&fact.location_id));
        assert!(decimal_places(fact.avg_temp) <= 3);
        assert!(decimal_places(fact.avg_temp_uncert) <= 3);
    }

    // Paris is filtered out by country
    assert!(schema.location_dim.iter().all(|l| l.country == "United States"));
    assert_eq!(schema.report.ambiguous_cities, vec!["Springfield".to_string()]);
    Ok(())
}

#[test]
fn test_parquet_output_reads_back() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let options = write_sources(temp_dir.path());

    let (schema, written) = pipeline::transform_and_write(&options, None)?;
    assert_eq!(written.len(), 3);

    let read_back = ParquetReader::new().read_star_schema(&options.output_root)?;
    assert_eq!(read_back.date_dim, schema.date_dim);
    assert_eq!(read_back.location_dim, schema.location_dim);
    assert_eq!(read_back.temperature_fact, schema.temperature_fact);
    Ok(())
}

#[test]
fn test_row_limit_caps_in_scope_rows() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut options = write_sources(temp_dir.path());
    options.row_limit = 2;

    let (schema, _) = pipeline::transform_and_write(&options, None)?;

    // Both in-scope rows are Boston, one with a null temperature
    assert_eq!(schema.report.rows_in_scope, 2);
    assert_eq!(schema.temperature_fact.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_repeated_dry_runs_leave_identical_state() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let options = write_sources(temp_dir.path());
    let storage = pipeline::local_storage(&options.output_root);

    let mut first_counts = Vec::new();
    let mut first_batches = Vec::new();
    let mut warehouse = MemoryWarehouse::with_source_root(&options.output_root);
    for run in 0..2 {
        let summary = pipeline::run(
            &options,
            &storage,
            &mut warehouse,
            QualityMode::FailFast,
            None,
        )
        .await?;
        assert!(summary.quality.passed());

        let counts: Vec<_> = star_schema_tables()
            .iter()
            .map(|t| warehouse.row_count(t.name))
            .collect();
        let batches: Vec<_> = star_schema_tables()
            .iter()
            .map(|t| warehouse.batches(t.name).map(|b| b.to_vec()))
            .collect();

        if run == 0 {
            first_counts = counts;
            first_batches = batches;
        } else {
            assert_eq!(counts, first_counts);
            assert_eq!(batches, first_batches);
        }
    }

    assert_eq!(first_counts, vec![Some(2), Some(3), Some(4)]);
    Ok(())
}

#[tokio::test]
async fn test_empty_fact_table_fails_naming_table() -> Result<()> {
    let mut warehouse = MemoryWarehouse::new();
    let tables = star_schema_tables();
    SchemaLifecycle::new(tables).create_tables(&mut warehouse).await?;

    let report = QualityGate::new(QualityMode::FailFast)
        .run(&mut warehouse, &tables[2..])
        .await?;

    match report.ensure_passed() {
        Err(ProcessingError::DataQuality { table, .. }) => assert_eq!(table, "temperatureFact"),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_load_rejects_missing_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path().join("output");
    let mut warehouse = MemoryWarehouse::with_source_root(&root);

    let result = pipeline::load_and_check(
        &mut warehouse,
        &pipeline::local_storage(&root),
        QualityMode::CollectAll,
        None,
    )
    .await;

    match result {
        Err(ProcessingError::LoadFailure { table, .. }) => assert_eq!(table, "dateDim"),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_misshapen_temperature_source_is_schema_mismatch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut options = write_sources(temp_dir.path());
    let broken = temp_dir.path().join("broken.csv");
    fs::write(&broken, "dt,AverageTemperature,City\n1820-01-01,2.0,Boston\n")?;
    options.temperature_path = broken;

    let result = pipeline::transform_and_write(&options, None);

    assert!(matches!(result, Err(ProcessingError::SchemaMismatch { .. })));
    assert!(!options.output_root.exists());
    Ok(())
}
