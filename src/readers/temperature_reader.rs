use crate::error::{ProcessingError, Result};
use crate::models::RawTemperatureRecord;
use crate::utils::constants::TEMPERATURE_COLUMNS;
use chrono::NaiveDate;
use csv::{StringRecord, StringRecordsIntoIter};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads the city temperature source against a fixed schema.
///
/// The header must match [`TEMPERATURE_COLUMNS`] exactly; types are never
/// inferred. Empty numeric fields are read as nulls, anything else that does
/// not parse is a schema mismatch.
pub struct TemperatureReader;

impl TemperatureReader {
    pub fn new() -> Self {
        Self
    }

    /// Open `path` and validate its header
    pub fn open(&self, path: &Path) -> Result<TemperatureIterator<File>> {
        let file = File::open(path)?;
        self.from_reader(file, &path.display().to_string())
    }

    /// Validate the header of `reader` and return a streaming record iterator
    pub fn from_reader<R: Read>(&self, reader: R, source_name: &str) -> Result<TemperatureIterator<R>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        check_header(&headers, source_name)?;

        Ok(TemperatureIterator {
            records: csv_reader.into_records(),
            source_name: source_name.to_string(),
        })
    }

    /// Read every record of `path` into memory
    pub fn read_all(&self, path: &Path) -> Result<Vec<RawTemperatureRecord>> {
        self.open(path)?.collect()
    }
}

impl Default for TemperatureReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Streaming iterator over temperature records
pub struct TemperatureIterator<R: Read> {
    records: StringRecordsIntoIter<R>,
    source_name: String,
}

impl<R: Read> Iterator for TemperatureIterator<R> {
    type Item = Result<RawTemperatureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(csv_error(e, &self.source_name))),
        };
        Some(parse_temperature_record(&record, &self.source_name))
    }
}

fn check_header(headers: &StringRecord, source_name: &str) -> Result<()> {
    let actual: Vec<&str> = headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}'))
        .collect();

    if actual != TEMPERATURE_COLUMNS {
        return Err(ProcessingError::schema_mismatch(
            source_name,
            format!(
                "expected columns [{}], found [{}]",
                TEMPERATURE_COLUMNS.join(", "),
                actual.join(", ")
            ),
        ));
    }

    Ok(())
}

fn csv_error(error: csv::Error, source_name: &str) -> ProcessingError {
    let message = match error.kind() {
        csv::ErrorKind::UnequalLengths { pos, expected_len, len } => Some(format!(
            "line {}: expected {} fields, found {}",
            pos.as_ref().map(|p| p.line()).unwrap_or(0),
            expected_len,
            len
        )),
        csv::ErrorKind::Utf8 { pos, err } => Some(format!(
            "line {}: invalid UTF-8 in field {}",
            pos.as_ref().map(|p| p.line()).unwrap_or(0),
            err.field() + 1
        )),
        _ => None,
    };

    match message {
        Some(message) => ProcessingError::schema_mismatch(source_name, message),
        None => ProcessingError::Csv(error),
    }
}

fn parse_temperature_record(record: &StringRecord, source_name: &str) -> Result<RawTemperatureRecord> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let field = |index: usize| record.get(index).unwrap_or("").trim();
    let mismatch = |column: &str, value: &str, expected: &str| {
        ProcessingError::schema_mismatch(
            source_name,
            format!("line {}: column {} value '{}' is not {}", line, column, value, expected),
        )
    };

    let date_text = field(0);
    let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
        .map_err(|_| mismatch(TEMPERATURE_COLUMNS[0], date_text, "a YYYY-MM-DD date"))?;

    let parse_optional = |index: usize| -> Result<Option<f64>> {
        let text = field(index);
        if text.is_empty() {
            return Ok(None);
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(mismatch(TEMPERATURE_COLUMNS[index], text, "a finite number")),
        }
    };

    Ok(RawTemperatureRecord {
        date,
        average_temperature: parse_optional(1)?,
        average_temperature_uncertainty: parse_optional(2)?,
        city: field(3).to_string(),
        country: field(4).to_string(),
        latitude: field(5).to_string(),
        longitude: field(6).to_string(),
    })
}
