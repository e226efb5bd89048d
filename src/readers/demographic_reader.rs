use crate::error::{ProcessingError, Result};
use crate::models::DemographicRecord;
use crate::utils::constants::{
    DEMOGRAPHIC_CITY, DEMOGRAPHIC_DELIMITER, DEMOGRAPHIC_POPULATION, DEMOGRAPHIC_STATE,
};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads the `;`-delimited city demographics file, keeping only
/// City, State and Total Population.
pub struct DemographicReader {
    delimiter: u8,
}

impl DemographicReader {
    pub fn new() -> Self {
        Self {
            delimiter: DEMOGRAPHIC_DELIMITER,
        }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn read_demographics(&self, path: &Path) -> Result<Vec<DemographicRecord>> {
        let file = File::open(path)?;
        self.read_from(file, &path.display().to_string())
    }

    pub fn read_from<R: Read>(&self, reader: R, source_name: &str) -> Result<Vec<DemographicRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}') == name)
                .ok_or_else(|| {
                    ProcessingError::schema_mismatch(source_name, format!("missing column '{}'", name))
                })
        };

        let city_idx = position(DEMOGRAPHIC_CITY)?;
        let state_idx = position(DEMOGRAPHIC_STATE)?;
        let population_idx = position(DEMOGRAPHIC_POPULATION)?;

        let mut records = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let field = |index: usize| record.get(index).unwrap_or("").trim();

            // Short rows cannot carry the projected columns
            if record.len() <= city_idx.max(state_idx).max(population_idx) {
                return Err(ProcessingError::schema_mismatch(
                    source_name,
                    format!(
                        "line {}: expected at least {} fields, found {}",
                        record.position().map(|p| p.line()).unwrap_or(0),
                        city_idx.max(state_idx).max(population_idx) + 1,
                        record.len()
                    ),
                ));
            }

            records.push(DemographicRecord::new(
                field(city_idx),
                field(state_idx),
                field(population_idx),
            ));
        }

        Ok(records)
    }
}

impl Default for DemographicReader {
    fn default() -> Self {
        Self::new()
    }
}
