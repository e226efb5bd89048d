use crate::error::{ProcessingError, Result};
use crate::processors::StarSchema;
use crate::utils::constants::{DATE_DIM, LOCATION_DIM, TEMPERATURE_DECIMAL_PLACES, TEMPERATURE_FACT};
use crate::utils::rounding::decimal_places;
use std::collections::HashSet;
use validator::Validate;

#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub date_rows: usize,
    pub location_rows: usize,
    pub fact_rows: usize,
    pub violations: Vec<IntegrityViolation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityViolation {
    pub table: &'static str,
    pub violation_type: ViolationType,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationType {
    DuplicateKey,
    DanglingReference,
    InvalidField,
    Precision,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Fail with the first violation, naming its table
    pub fn ensure_clean(&self) -> Result<()> {
        match self.violations.first() {
            None => Ok(()),
            Some(first) => Err(ProcessingError::data_quality(
                first.table,
                format!(
                    "{} integrity violation(s) before load, first: {}",
                    self.violations.len(),
                    first.details
                ),
            )),
        }
    }
}

/// Checks the star schema invariants locally, before anything is written.
pub struct IntegrityChecker {
    max_reported: usize,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self { max_reported: 100 }
    }

    pub fn with_max_reported(max_reported: usize) -> Self {
        Self { max_reported }
    }

    pub fn check_integrity(&self, schema: &StarSchema) -> IntegrityReport {
        let mut report = IntegrityReport {
            date_rows: schema.date_dim.len(),
            location_rows: schema.location_dim.len(),
            fact_rows: schema.temperature_fact.len(),
            violations: Vec::new(),
        };

        let mut date_ids = HashSet::with_capacity(schema.date_dim.len());
        for row in &schema.date_dim {
            if !date_ids.insert(row.date_id.as_str()) {
                self.push(&mut report, DATE_DIM, ViolationType::DuplicateKey, format!("duplicate dateId {}", row.date_id));
            }
            if let Err(e) = row.validate() {
                self.push(&mut report, DATE_DIM, ViolationType::InvalidField, format!("date {}: {}", row.date, e));
            }
        }

        let mut location_ids = HashSet::with_capacity(schema.location_dim.len());
        for row in &schema.location_dim {
            if !location_ids.insert(row.location_id.as_str()) {
                self.push(
                    &mut report,
                    LOCATION_DIM,
                    ViolationType::DuplicateKey,
                    format!("duplicate locationId {}", row.location_id),
                );
            }
            if let Err(e) = row.validate() {
                self.push(&mut report, LOCATION_DIM, ViolationType::InvalidField, format!("city {}: {}", row.city, e));
            }
        }

        let mut temperature_ids = HashSet::with_capacity(schema.temperature_fact.len());
        for row in &schema.temperature_fact {
            if !temperature_ids.insert(row.temperature_id) {
                self.push(
                    &mut report,
                    TEMPERATURE_FACT,
                    ViolationType::DuplicateKey,
                    format!("duplicate temperatureId {}", row.temperature_id),
                );
            }
            if !date_ids.contains(row.date_id.as_str()) {
                self.push(
                    &mut report,
                    TEMPERATURE_FACT,
                    ViolationType::DanglingReference,
                    format!("temperatureId {} references unknown dateId {}", row.temperature_id, row.date_id),
                );
            }
            if !location_ids.contains(row.location_id.as_str()) {
                self.push(
                    &mut report,
                    TEMPERATURE_FACT,
                    ViolationType::DanglingReference,
                    format!(
                        "temperatureId {} references unknown locationId {}",
                        row.temperature_id, row.location_id
                    ),
                );
            }
            if let Err(e) = row.validate() {
                self.push(
                    &mut report,
                    TEMPERATURE_FACT,
                    ViolationType::InvalidField,
                    format!("temperatureId {}: {}", row.temperature_id, e),
                );
            }
            for (name, value) in [("avgTemp", row.avg_temp), ("avgTempUncert", row.avg_temp_uncert)] {
                if !value.is_finite() || decimal_places(value) > TEMPERATURE_DECIMAL_PLACES as usize {
                    self.push(
                        &mut report,
                        TEMPERATURE_FACT,
                        ViolationType::Precision,
                        format!("temperatureId {}: {} = {} is not a 3-decimal value", row.temperature_id, name, value),
                    );
                }
            }
        }

        report
    }

    fn push(&self, report: &mut IntegrityReport, table: &'static str, violation_type: ViolationType, details: String) {
        if report.violations.len() < self.max_reported {
            report.violations.push(IntegrityViolation {
                table,
                violation_type,
                details,
            });
        }
    }

    pub fn generate_summary(&self, report: &IntegrityReport) -> String {
        let mut summary = String::new();

        summary.push_str("=== Integrity Check Report ===\n");
        summary.push_str(&format!("{} rows: {}\n", DATE_DIM, report.date_rows));
        summary.push_str(&format!("{} rows: {}\n", LOCATION_DIM, report.location_rows));
        summary.push_str(&format!("{} rows: {}\n", TEMPERATURE_FACT, report.fact_rows));
        summary.push_str(&format!("\nViolations: {}\n", report.violations.len()));

        if !report.violations.is_empty() {
            summary.push_str("\nTop 10 Violations:\n");
            for (i, violation) in report.violations.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {} [{:?}]: {}\n",
                    i + 1,
                    violation.table,
                    violation.violation_type,
                    violation.details
                ));
            }
        }

        summary
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}
