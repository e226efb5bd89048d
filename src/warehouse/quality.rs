//! Post-load data quality checks.
//!
//! Two kinds of check run against the loaded tables: every table must hold
//! at least one row, and each column listed in a table's `null_checked`
//! set must contain no NULL. A failed check is a finding, recorded in the
//! [`QualityReport`]; an error running the query itself is returned as-is.

use crate::error::{ProcessingError, Result};
use crate::warehouse::statement::{count_rows, null_lookup};
use crate::warehouse::tables::TableSpec;
use crate::warehouse::{Identifier, Warehouse};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum QualityMode {
    /// Stop at the first failed check
    #[default]
    FailFast,
    /// Run every check and report all failures
    CollectAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum QualityCheck {
    Existence { table: String },
    NotNull { table: String, column: String },
}

impl QualityCheck {
    pub fn table(&self) -> &str {
        match self {
            Self::Existence { table } | Self::NotNull { table, .. } => table,
        }
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existence { table } => write!(f, "{} has rows", table),
            Self::NotNull { table, column } => write!(f, "{}.{} has no NULL", table, column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityOutcome {
    pub check: QualityCheck,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub outcomes: Vec<QualityOutcome>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &QualityOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn summary(&self) -> String {
        let failed = self.failures().count();
        let mut summary = format!(
            "Quality checks: {} run, {} passed, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        );
        for outcome in self.failures() {
            summary.push_str(&format!("\n  - {}: {}", outcome.check, outcome.message));
        }
        summary
    }

    /// `DataQuality` error naming the first failing table and listing every
    /// failure message
    pub fn ensure_passed(&self) -> Result<()> {
        let failures: Vec<&QualityOutcome> = self.failures().collect();
        match failures.first() {
            Some(first) => Err(ProcessingError::data_quality(
                first.check.table(),
                failures
                    .iter()
                    .map(|o| o.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
            None => Ok(()),
        }
    }
}

pub struct QualityGate {
    mode: QualityMode,
}

impl QualityGate {
    pub fn new(mode: QualityMode) -> Self {
        Self { mode }
    }

    /// Run the existence check of every table, then the NOT NULL checks of
    /// every table, both in `tables` order
    pub async fn run<W: Warehouse + ?Sized>(
        &self,
        warehouse: &mut W,
        tables: &[&'static TableSpec],
    ) -> Result<QualityReport> {
        let mut report = QualityReport::default();

        for spec in tables {
            let outcome = check_existence(warehouse, &spec.identifier()?).await?;
            if self.record(&mut report, outcome) {
                return Ok(report);
            }
        }

        for spec in tables {
            let table = spec.identifier()?;
            for column in spec.null_checked {
                let outcome = check_not_null(warehouse, &table, column).await?;
                if self.record(&mut report, outcome) {
                    return Ok(report);
                }
            }
        }

        info!("{}", report.summary());
        Ok(report)
    }

    /// Returns true when the gate should stop
    fn record(&self, report: &mut QualityReport, outcome: QualityOutcome) -> bool {
        if outcome.passed {
            info!(check = %outcome.check, "Quality check passed");
        } else {
            warn!(check = %outcome.check, message = %outcome.message, "Quality check failed");
        }
        let stop = !outcome.passed && self.mode == QualityMode::FailFast;
        report.outcomes.push(outcome);
        stop
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(QualityMode::default())
    }
}

async fn check_existence<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    table: &Identifier,
) -> Result<QualityOutcome> {
    let count = warehouse.fetch_scalar(&count_rows(table)).await?.unwrap_or(0);
    let passed = count > 0;
    Ok(QualityOutcome {
        check: QualityCheck::Existence {
            table: table.as_str().to_string(),
        },
        passed,
        message: if passed {
            format!("{} rows", count)
        } else {
            format!("table {} contains no rows", table.as_str())
        },
    })
}

async fn check_not_null<W: Warehouse + ?Sized>(
    warehouse: &mut W,
    table: &Identifier,
    column: &str,
) -> Result<QualityOutcome> {
    let column = Identifier::new(column)?;
    let has_null = warehouse
        .fetch_scalar(&null_lookup(table, &column))
        .await?
        .is_some();
    Ok(QualityOutcome {
        check: QualityCheck::NotNull {
            table: table.as_str().to_string(),
            column: column.as_str().to_string(),
        },
        passed: !has_null,
        message: if has_null {
            format!("column {} contains NULL values", column.as_str())
        } else {
            "no NULL values".to_string()
        },
    })
}
