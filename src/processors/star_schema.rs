use crate::error::Result;
use crate::models::{
    DateDimRow, DemographicRecord, LocationDimRow, RawTemperatureRecord, TemperatureFactRow,
};
use crate::readers::{DemographicReader, TemperatureReader};
use crate::utils::constants::{DEFAULT_ROW_LIMIT, TARGET_COUNTRY};
use crate::utils::keys::{date_id, location_id};
use crate::utils::rounding::round_temperature;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

/// The three datasets of one run plus the counters explaining how they were
/// derived from the sources.
#[derive(Debug, Clone, Default)]
pub struct StarSchema {
    pub date_dim: Vec<DateDimRow>,
    pub location_dim: Vec<LocationDimRow>,
    pub temperature_fact: Vec<TemperatureFactRow>,
    pub report: TransformReport,
}

impl StarSchema {
    pub fn is_empty(&self) -> bool {
        self.temperature_fact.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    /// Temperature rows read before the row limit was reached
    pub rows_scanned: usize,
    /// Rows kept by the country filter and row limit
    pub rows_in_scope: usize,
    /// In-scope rows whose city has no demographic match
    pub rows_unmatched: usize,
    pub rows_null_temperature: usize,
    pub rows_null_uncertainty: usize,
    pub fact_rows: usize,
    pub date_rows: usize,
    pub location_rows: usize,
    /// Cities present in more than one state of the demographics source
    pub ambiguous_cities: Vec<String>,
}

impl TransformReport {
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Transform Report ===\n");
        summary.push_str(&format!("Rows scanned: {}\n", self.rows_scanned));
        summary.push_str(&format!("Rows in scope: {}\n", self.rows_in_scope));
        summary.push_str(&format!(
            "Dropped (no demographic match): {}\n",
            self.rows_unmatched
        ));
        summary.push_str(&format!(
            "Dropped (null temperature): {}\n",
            self.rows_null_temperature
        ));
        summary.push_str(&format!(
            "Dropped (null uncertainty): {}\n",
            self.rows_null_uncertainty
        ));
        summary.push_str(&format!(
            "Output: {} fact, {} date, {} location rows\n",
            self.fact_rows, self.date_rows, self.location_rows
        ));

        if !self.ambiguous_cities.is_empty() {
            summary.push_str(&format!(
                "Ambiguous demographic cities: {}\n",
                self.ambiguous_cities.join(", ")
            ));
        }

        summary
    }
}

/// A temperature row enriched with its demographic match, measurements rounded
#[derive(Debug, Clone)]
struct JoinedRow {
    record: RawTemperatureRecord,
    avg_temp: f64,
    avg_temp_uncert: f64,
    demographic: DemographicRecord,
}

/// Turns the temperature and demographic sources into the star schema.
pub struct TransformPipeline {
    country: String,
    row_limit: usize,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            country: TARGET_COUNTRY.to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Read both source files and transform them
    pub fn run(&self, temperature_path: &Path, demographic_path: &Path) -> Result<StarSchema> {
        info!(path = %demographic_path.display(), "Reading the demographics data");
        let demographics = DemographicReader::new().read_demographics(demographic_path)?;
        info!(rows = demographics.len(), "Done reading the demographics data");

        info!(path = %temperature_path.display(), "Reading the temperature data");
        let temperatures = TemperatureReader::new().open(temperature_path)?;

        self.transform(temperatures, &demographics)
    }

    /// Transform already-opened sources.
    ///
    /// `temperatures` is consumed lazily and reading stops once the row limit
    /// of in-scope rows is reached.
    pub fn transform<I>(&self, temperatures: I, demographics: &[DemographicRecord]) -> Result<StarSchema>
    where
        I: IntoIterator<Item = Result<RawTemperatureRecord>>,
    {
        let mut report = TransformReport::default();

        let (by_city, ambiguous) = resolve_demographics(demographics);
        if !ambiguous.is_empty() {
            warn!(
                cities = ambiguous.len(),
                "Demographic cities found in several states, keeping the first state alphabetically"
            );
        }
        report.ambiguous_cities = ambiguous;

        let in_scope = self.select_in_scope(temperatures, &mut report)?;
        info!(
            scanned = report.rows_scanned,
            in_scope = in_scope.len(),
            country = %self.country,
            "Done reading the temperature data"
        );

        let joined = join_and_clean(in_scope, &by_city, &mut report);
        if report.rows_unmatched > 0 {
            warn!(rows = report.rows_unmatched, "Dropped temperature rows without a demographic match");
        }

        let date_dim = project_date_dim(&joined);
        let location_dim = project_location_dim(&joined);
        let temperature_fact = project_temperature_fact(&joined);

        report.fact_rows = temperature_fact.len();
        report.date_rows = date_dim.len();
        report.location_rows = location_dim.len();

        info!(
            facts = report.fact_rows,
            dates = report.date_rows,
            locations = report.location_rows,
            "Star schema derived"
        );

        Ok(StarSchema {
            date_dim,
            location_dim,
            temperature_fact,
            report,
        })
    }

    /// Country filter then row limit, in source order
    fn select_in_scope<I>(&self, temperatures: I, report: &mut TransformReport) -> Result<Vec<RawTemperatureRecord>>
    where
        I: IntoIterator<Item = Result<RawTemperatureRecord>>,
    {
        let mut in_scope = Vec::new();
        if self.row_limit == 0 {
            return Ok(in_scope);
        }

        for record in temperatures {
            let record = record?;
            report.rows_scanned += 1;

            if record.is_in_country(&self.country) {
                in_scope.push(record);
                if in_scope.len() >= self.row_limit {
                    break;
                }
            }
        }

        report.rows_in_scope = in_scope.len();
        Ok(in_scope)
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// One demographic record per city.
///
/// Rows are first collapsed per (city, state), first occurrence winning. A
/// city present in several states resolves to the alphabetically first state
/// and is reported as ambiguous.
fn resolve_demographics(
    demographics: &[DemographicRecord],
) -> (HashMap<String, DemographicRecord>, Vec<String>) {
    let mut per_city: BTreeMap<&str, BTreeMap<&str, &DemographicRecord>> = BTreeMap::new();
    for record in demographics {
        per_city
            .entry(record.city.as_str())
            .or_default()
            .entry(record.state.as_str())
            .or_insert(record);
    }

    let mut ambiguous = Vec::new();
    let mut by_city = HashMap::with_capacity(per_city.len());

    for (city, states) in per_city {
        if states.len() > 1 {
            ambiguous.push(city.to_string());
        }
        if let Some((_, record)) = states.into_iter().next() {
            by_city.insert(city.to_string(), record.clone());
        }
    }

    (by_city, ambiguous)
}

/// Inner join on city, drop rows with null measurements, round the rest
fn join_and_clean(
    in_scope: Vec<RawTemperatureRecord>,
    by_city: &HashMap<String, DemographicRecord>,
    report: &mut TransformReport,
) -> Vec<JoinedRow> {
    let mut joined = Vec::with_capacity(in_scope.len());

    for record in in_scope {
        let Some(demographic) = by_city.get(&record.city) else {
            report.rows_unmatched += 1;
            continue;
        };

        let Some(avg_temp) = record.average_temperature else {
            report.rows_null_temperature += 1;
            continue;
        };

        let Some(avg_temp_uncert) = record.average_temperature_uncertainty else {
            report.rows_null_uncertainty += 1;
            continue;
        };

        joined.push(JoinedRow {
            avg_temp: round_temperature(avg_temp),
            avg_temp_uncert: round_temperature(avg_temp_uncert),
            demographic: demographic.clone(),
            record,
        });
    }

    joined
}

fn project_date_dim(rows: &[JoinedRow]) -> Vec<DateDimRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(row.record.date))
        .map(|row| DateDimRow::from_date(row.record.date))
        .collect()
}

fn project_location_dim(rows: &[JoinedRow]) -> Vec<LocationDimRow> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| {
            LocationDimRow::from_joined(
                &row.record,
                &row.demographic.state,
                &row.demographic.total_population,
            )
        })
        .filter(|location| seen.insert(location.location_id.clone()))
        .collect()
}

/// Fact rows numbered over a stable sort by country
fn project_temperature_fact(rows: &[JoinedRow]) -> Vec<TemperatureFactRow> {
    let mut order: Vec<&JoinedRow> = rows.iter().collect();
    order.sort_by(|a, b| a.record.country.cmp(&b.record.country));

    order
        .par_iter()
        .enumerate()
        .map(|(index, row)| {
            TemperatureFactRow::new(
                index as i64 + 1,
                date_id(row.record.date),
                location_id(&row.record.city, &row.record.country),
                row.avg_temp,
                row.avg_temp_uncert,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn temp(date: &str, avg: Option<f64>, city: &str, country: &str) -> Result<RawTemperatureRecord> {
        Ok(RawTemperatureRecord::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            avg,
            avg.map(|_| 0.2715),
            city,
            country,
            "42.59N",
            "72.00W",
        ))
    }

    fn demographics() -> Vec<DemographicRecord> {
        vec![
            DemographicRecord::new("Boston", "Massachusetts", "650000"),
            DemographicRecord::new("Boston", "Massachusetts", "650000"),
            DemographicRecord::new("Peoria", "Illinois", "118661"),
            DemographicRecord::new("Peoria", "Arizona", "164173"),
        ]
    }

    #[test]
    fn test_filters_country_and_caps_rows() -> Result<()> {
        let temperatures = (0..30).map(|i| {
            let country = if i % 3 == 0 { "Canada" } else { "United States" };
            temp("2013-01-01", Some(1.0), "Boston", country)
        });

        let schema = TransformPipeline::new()
            .with_row_limit(10)
            .transform(temperatures, &demographics())?;

        assert_eq!(schema.report.rows_in_scope, 10);
        assert_eq!(schema.temperature_fact.len(), 10);
        // 10 US rows are found within the first 15 source rows
        assert_eq!(schema.report.rows_scanned, 15);
        assert!(schema
            .location_dim
            .iter()
            .all(|l| l.country == "United States"));
        Ok(())
    }

    #[test]
    fn test_default_row_cap() -> Result<()> {
        let temperatures = (0..DEFAULT_ROW_LIMIT + 1)
            .map(|_| temp("2013-01-01", Some(1.0), "Boston", "United States"));

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert_eq!(DEFAULT_ROW_LIMIT, 10_000);
        assert_eq!(schema.report.rows_in_scope, 10_000);
        assert_eq!(schema.temperature_fact.len(), 10_000);
        Ok(())
    }

    #[test]
    fn test_inner_join_drops_unmatched_cities() -> Result<()> {
        let temperatures = vec![
            temp("2013-01-01", Some(1.0), "Boston", "United States"),
            temp("2013-01-01", Some(1.0), "Springfield", "United States"),
        ];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert_eq!(schema.report.rows_unmatched, 1);
        assert_eq!(schema.temperature_fact.len(), 1);
        assert_eq!(schema.location_dim.len(), 1);
        assert_eq!(schema.location_dim[0].city, "Boston");
        Ok(())
    }

    #[test]
    fn test_ambiguous_city_resolves_to_first_state() -> Result<()> {
        let temperatures = vec![temp("2013-01-01", Some(5.0), "Peoria", "United States")];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert_eq!(schema.report.ambiguous_cities, vec!["Peoria".to_string()]);
        assert_eq!(schema.temperature_fact.len(), 1);
        assert_eq!(schema.location_dim[0].state, "Arizona");
        assert_eq!(schema.location_dim[0].total_population, "164173");
        Ok(())
    }

    #[test]
    fn test_null_temperature_rows_leave_no_trace() -> Result<()> {
        let temperatures = vec![
            temp("2013-01-01", Some(1.0), "Boston", "United States"),
            temp("1850-06-01", None, "Peoria", "United States"),
        ];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert_eq!(schema.report.rows_null_temperature, 1);
        assert_eq!(schema.temperature_fact.len(), 1);
        assert_eq!(schema.date_dim.len(), 1);
        assert_eq!(schema.location_dim.len(), 1);
        assert_eq!(schema.date_dim[0].year, 2013);
        Ok(())
    }

    #[test]
    fn test_dimensions_are_deduplicated() -> Result<()> {
        let temperatures = vec![
            temp("2013-01-01", Some(1.0), "Boston", "United States"),
            temp("2013-02-01", Some(2.0), "Boston", "United States"),
            temp("2013-01-01", Some(3.0), "Peoria", "United States"),
        ];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert_eq!(schema.temperature_fact.len(), 3);
        assert_eq!(schema.date_dim.len(), 2);
        assert_eq!(schema.location_dim.len(), 2);

        let date_ids: HashSet<_> = schema.date_dim.iter().map(|d| &d.date_id).collect();
        let location_ids: HashSet<_> = schema.location_dim.iter().map(|l| &l.location_id).collect();
        for fact in &schema.temperature_fact {
            assert!(date_ids.contains(&fact.date_id));
            assert!(location_ids.contains(&fact.location_id));
        }
        Ok(())
    }

    #[test]
    fn test_fact_ids_are_sequential_in_source_order() -> Result<()> {
        let temperatures = vec![
            temp("2013-03-01", Some(3.0), "Boston", "United States"),
            temp("2013-01-01", Some(1.0), "Boston", "United States"),
            temp("2013-02-01", Some(2.0), "Boston", "United States"),
        ];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        let ids: Vec<i64> = schema.temperature_fact.iter().map(|f| f.temperature_id).collect();
        let temps: Vec<f64> = schema.temperature_fact.iter().map(|f| f.avg_temp).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(temps, vec![3.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_measurements_are_rounded() -> Result<()> {
        let temperatures = vec![temp("2013-01-01", Some(2.345678), "Boston", "United States")];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert_eq!(schema.temperature_fact[0].avg_temp, 2.346);
        assert_eq!(schema.temperature_fact[0].avg_temp_uncert, 0.272);
        Ok(())
    }

    #[test]
    fn test_empty_join_is_not_an_error() -> Result<()> {
        let temperatures = vec![temp("2013-01-01", Some(1.0), "Nowhere", "United States")];

        let schema = TransformPipeline::new().transform(temperatures, &demographics())?;

        assert!(schema.is_empty());
        assert!(schema.date_dim.is_empty());
        assert!(schema.location_dim.is_empty());
        Ok(())
    }

    #[test]
    fn test_source_errors_propagate() {
        let temperatures = vec![
            temp("2013-01-01", Some(1.0), "Boston", "United States"),
            Err(crate::error::ProcessingError::schema_mismatch("t.csv", "bad row")),
        ];

        let result = TransformPipeline::new().transform(temperatures, &demographics());
        assert!(result.is_err());
    }
}
