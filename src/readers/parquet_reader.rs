use crate::error::{ProcessingError, Result};
use crate::models::{DateDimRow, LocationDimRow, TemperatureFactRow};
use crate::processors::StarSchema;
use crate::utils::constants::{DATE_DIM, DEFAULT_BATCH_SIZE, LOCATION_DIM, TEMPERATURE_FACT};
use crate::writers::parquet_writer::{describe_schema, days_to_date};
use arrow::array::*;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Reads datasets written by [`crate::writers::ParquetWriter`] back into rows.
pub struct ParquetReader {
    batch_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub files: usize,
    pub total_rows: i64,
    pub row_groups: usize,
    pub file_size: u64,
    pub schema: String,
}

impl DatasetInfo {
    pub fn summary(&self) -> String {
        format!(
            "Dataset {}:\n\
            - Files: {}\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - Size: {:.2} MB\n\
            - Schema: {}",
            self.name,
            self.files,
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.schema
        )
    }
}

impl ParquetReader {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self { batch_size }
    }

    /// Parquet part files of a dataset directory, sorted by name
    pub fn part_files(&self, dataset_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dataset_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "No parquet files in {}",
                dataset_dir.display()
            )));
        }

        Ok(files)
    }

    /// Every record batch of a dataset directory
    pub fn read_batches(&self, dataset_dir: &Path) -> Result<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for path in self.part_files(dataset_dir)? {
            let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?
                .with_batch_size(self.batch_size)
                .build()?;
            for batch in reader {
                batches.push(batch?);
            }
        }
        Ok(batches)
    }

    pub fn read_star_schema(&self, output_root: &Path) -> Result<StarSchema> {
        Ok(StarSchema {
            date_dim: self.read_date_dim(&output_root.join(DATE_DIM))?,
            location_dim: self.read_location_dim(&output_root.join(LOCATION_DIM))?,
            temperature_fact: self.read_temperature_fact(&output_root.join(TEMPERATURE_FACT))?,
            report: Default::default(),
        })
    }

    pub fn read_date_dim(&self, dataset_dir: &Path) -> Result<Vec<DateDimRow>> {
        let mut rows = Vec::new();
        for batch in self.read_batches(dataset_dir)? {
            let ids = column::<StringArray>(&batch, "dateId")?;
            let dates = column::<Date32Array>(&batch, "date")?;
            let years = column::<Int32Array>(&batch, "year")?;
            let months = column::<Int32Array>(&batch, "month")?;
            let days = column::<Int32Array>(&batch, "day")?;
            let days_of_week = column::<Int32Array>(&batch, "dayOfWeek")?;
            let weeks = column::<Int32Array>(&batch, "weekOfYear")?;

            for i in 0..batch.num_rows() {
                let date = days_to_date(dates.value(i)).ok_or_else(|| {
                    ProcessingError::InvalidFormat(format!("Invalid date in {}", dataset_dir.display()))
                })?;
                rows.push(DateDimRow {
                    date_id: ids.value(i).to_string(),
                    date,
                    year: years.value(i),
                    month: months.value(i),
                    day: days.value(i),
                    day_of_week: days_of_week.value(i),
                    week_of_year: weeks.value(i),
                });
            }
        }
        Ok(rows)
    }

    pub fn read_location_dim(&self, dataset_dir: &Path) -> Result<Vec<LocationDimRow>> {
        let mut rows = Vec::new();
        for batch in self.read_batches(dataset_dir)? {
            let ids = column::<StringArray>(&batch, "locationId")?;
            let cities = column::<StringArray>(&batch, "city")?;
            let states = column::<StringArray>(&batch, "state")?;
            let countries = column::<StringArray>(&batch, "country")?;
            let latitudes = column::<StringArray>(&batch, "latitude")?;
            let longitudes = column::<StringArray>(&batch, "longitude")?;
            let populations = column::<StringArray>(&batch, "totalPopulation")?;

            for i in 0..batch.num_rows() {
                rows.push(LocationDimRow {
                    location_id: ids.value(i).to_string(),
                    city: cities.value(i).to_string(),
                    state: states.value(i).to_string(),
                    country: countries.value(i).to_string(),
                    latitude: latitudes.value(i).to_string(),
                    longitude: longitudes.value(i).to_string(),
                    total_population: populations.value(i).to_string(),
                });
            }
        }
        Ok(rows)
    }

    pub fn read_temperature_fact(&self, dataset_dir: &Path) -> Result<Vec<TemperatureFactRow>> {
        let mut rows = Vec::new();
        for batch in self.read_batches(dataset_dir)? {
            let ids = column::<Int64Array>(&batch, "temperatureId")?;
            let date_ids = column::<StringArray>(&batch, "dateId")?;
            let location_ids = column::<StringArray>(&batch, "locationId")?;
            let avg_temps = column::<Float64Array>(&batch, "avgTemp")?;
            let uncertainties = column::<Float64Array>(&batch, "avgTempUncert")?;

            for i in 0..batch.num_rows() {
                rows.push(TemperatureFactRow::new(
                    ids.value(i),
                    date_ids.value(i).to_string(),
                    location_ids.value(i).to_string(),
                    avg_temps.value(i),
                    uncertainties.value(i),
                ));
            }
        }
        Ok(rows)
    }

    /// File statistics of one dataset directory
    pub fn dataset_info(&self, dataset_dir: &Path) -> Result<DatasetInfo> {
        let files = self.part_files(dataset_dir)?;
        let mut info = DatasetInfo {
            name: dataset_dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            files: files.len(),
            total_rows: 0,
            row_groups: 0,
            file_size: 0,
            schema: String::new(),
        };

        for path in &files {
            let reader = SerializedFileReader::new(File::open(path)?)?;
            let metadata = reader.metadata();
            info.total_rows += metadata.file_metadata().num_rows();
            info.row_groups += metadata.num_row_groups();
            info.file_size += fs::metadata(path)?.len();
        }

        let first = ParquetRecordBatchReaderBuilder::try_new(File::open(&files[0])?)?;
        info.schema = describe_schema(first.schema());

        Ok(info)
    }
}

impl Default for ParquetReader {
    fn default() -> Self {
        Self::new()
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Missing or invalid {} column", name)))
}
