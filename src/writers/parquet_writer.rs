use crate::error::{ProcessingError, Result};
use crate::models::{DateDimRow, LocationDimRow, TemperatureFactRow};
use crate::processors::StarSchema;
use crate::utils::constants::{
    DATE_DIM, DEFAULT_ROW_GROUP_SIZE, LOCATION_DIM, PART_FILE_NAME, TEMPERATURE_FACT,
};
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Days from 0001-01-01 (CE) to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            "snappy" => Compression::SNAPPY,
            "gzip" => Compression::GZIP(GzipLevel::default()),
            "lz4" => Compression::LZ4,
            "zstd" => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            "none" => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Write the three datasets under `output_root`, replacing previous output.
    ///
    /// Returns the directory written for each dataset, in load order.
    pub fn write_star_schema(&self, schema: &StarSchema, output_root: &Path) -> Result<Vec<PathBuf>> {
        let datasets = [
            (DATE_DIM, date_dim_batch(&schema.date_dim)),
            (LOCATION_DIM, location_dim_batch(&schema.location_dim)),
            (TEMPERATURE_FACT, temperature_fact_batch(&schema.temperature_fact)),
        ];

        let mut written = Vec::with_capacity(datasets.len());
        for (name, batch) in datasets {
            let path = batch
                .and_then(|batch| self.write_dataset(&batch, &output_root.join(name)))
                .map_err(|e| ProcessingError::WriteFailure {
                    dataset: name.to_string(),
                    source: Box::new(e),
                })?;
            written.push(path);
        }

        Ok(written)
    }

    /// Write one batch as the only part file of `dataset_dir`.
    ///
    /// The directory is removed first. An empty batch still produces a file
    /// carrying the schema.
    pub fn write_dataset(&self, batch: &RecordBatch, dataset_dir: &Path) -> Result<PathBuf> {
        info!(
            path = %dataset_dir.display(),
            rows = batch.num_rows(),
            "Writing {} rows of {} data",
            batch.num_rows(),
            dataset_dir.file_name().and_then(|n| n.to_str()).unwrap_or("dataset")
        );
        info!(schema = %describe_schema(&batch.schema()), "Dataset schema");

        if dataset_dir.exists() {
            fs::remove_dir_all(dataset_dir)?;
        }
        fs::create_dir_all(dataset_dir)?;

        let path = dataset_dir.join(PART_FILE_NAME);
        let file = File::create(&path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        if batch.num_rows() > 0 {
            writer.write(batch)?;
        }
        writer.close()?;

        Ok(path)
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// `name: Type` pairs, one per column
pub fn describe_schema(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn date_dim_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("dateId", DataType::Utf8, false),
        Field::new("date", DataType::Date32, false),
        Field::new("year", DataType::Int32, false),
        Field::new("month", DataType::Int32, false),
        Field::new("day", DataType::Int32, false),
        Field::new("dayOfWeek", DataType::Int32, false),
        Field::new("weekOfYear", DataType::Int32, false),
    ]))
}

pub fn location_dim_schema() -> SchemaRef {
    let fields = [
        "locationId",
        "city",
        "state",
        "country",
        "latitude",
        "longitude",
        "totalPopulation",
    ]
    .into_iter()
    .map(|name| Field::new(name, DataType::Utf8, false))
    .collect::<Vec<_>>();

    Arc::new(Schema::new(fields))
}

pub fn temperature_fact_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("temperatureId", DataType::Int64, false),
        Field::new("dateId", DataType::Utf8, false),
        Field::new("locationId", DataType::Utf8, false),
        Field::new("avgTemp", DataType::Float64, false),
        Field::new("avgTempUncert", DataType::Float64, false),
    ]))
}

pub fn date_to_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

pub fn date_dim_batch(rows: &[DateDimRow]) -> Result<RecordBatch> {
    let ids: Vec<&str> = rows.iter().map(|r| r.date_id.as_str()).collect();
    let dates: Vec<i32> = rows.iter().map(|r| date_to_days(r.date)).collect();
    let years: Vec<i32> = rows.iter().map(|r| r.year).collect();
    let months: Vec<i32> = rows.iter().map(|r| r.month).collect();
    let days: Vec<i32> = rows.iter().map(|r| r.day).collect();
    let days_of_week: Vec<i32> = rows.iter().map(|r| r.day_of_week).collect();
    let weeks: Vec<i32> = rows.iter().map(|r| r.week_of_year).collect();

    let batch = RecordBatch::try_new(
        date_dim_schema(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(Date32Array::from(dates)),
            Arc::new(Int32Array::from(years)),
            Arc::new(Int32Array::from(months)),
            Arc::new(Int32Array::from(days)),
            Arc::new(Int32Array::from(days_of_week)),
            Arc::new(Int32Array::from(weeks)),
        ],
    )?;

    Ok(batch)
}

pub fn location_dim_batch(rows: &[LocationDimRow]) -> Result<RecordBatch> {
    let column = |values: Vec<&str>| -> ArrayRef { Arc::new(StringArray::from(values)) };

    let batch = RecordBatch::try_new(
        location_dim_schema(),
        vec![
            column(rows.iter().map(|r| r.location_id.as_str()).collect()),
            column(rows.iter().map(|r| r.city.as_str()).collect()),
            column(rows.iter().map(|r| r.state.as_str()).collect()),
            column(rows.iter().map(|r| r.country.as_str()).collect()),
            column(rows.iter().map(|r| r.latitude.as_str()).collect()),
            column(rows.iter().map(|r| r.longitude.as_str()).collect()),
            column(rows.iter().map(|r| r.total_population.as_str()).collect()),
        ],
    )?;

    Ok(batch)
}

pub fn temperature_fact_batch(rows: &[TemperatureFactRow]) -> Result<RecordBatch> {
    let ids: Vec<i64> = rows.iter().map(|r| r.temperature_id).collect();
    let date_ids: Vec<&str> = rows.iter().map(|r| r.date_id.as_str()).collect();
    let location_ids: Vec<&str> = rows.iter().map(|r| r.location_id.as_str()).collect();
    let avg_temps: Vec<f64> = rows.iter().map(|r| r.avg_temp).collect();
    let uncertainties: Vec<f64> = rows.iter().map(|r| r.avg_temp_uncert).collect();

    let batch = RecordBatch::try_new(
        temperature_fact_schema(),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(date_ids)),
            Arc::new(StringArray::from(location_ids)),
            Arc::new(Float64Array::from(avg_temps)),
            Arc::new(Float64Array::from(uncertainties)),
        ],
    )?;

    Ok(batch)
}
