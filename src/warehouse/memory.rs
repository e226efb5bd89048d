use crate::error::{ProcessingError, Result};
use crate::readers::ParquetReader;
use crate::warehouse::{Statement, StatementKind, TableSpec, Warehouse};
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

/// In-process warehouse that interprets statements instead of sending SQL.
///
/// Bulk copies read the Parquet datasets from a local output root, so a run
/// can be rehearsed end to end without a remote warehouse. Copies enforce
/// NOT NULL columns, primary-key uniqueness and the column count, as the
/// real table definitions would.
#[derive(Debug, Default)]
pub struct MemoryWarehouse {
    tables: BTreeMap<String, MemoryTable>,
    source_root: Option<PathBuf>,
    executed: Vec<String>,
}

#[derive(Debug)]
struct MemoryTable {
    spec: &'static TableSpec,
    batches: Vec<RecordBatch>,
}

impl MemoryTable {
    fn row_count(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    fn primary_key_values(&self) -> Result<HashSet<String>> {
        let mut values = HashSet::new();
        if let Some(index) = self.primary_key_index() {
            for batch in &self.batches {
                for row in 0..batch.num_rows() {
                    values.insert(array_value_to_string(batch.column(index), row)?);
                }
            }
        }
        Ok(values)
    }

    fn primary_key_index(&self) -> Option<usize> {
        self.spec.columns.iter().position(|c| c.primary_key)
    }
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve copy sources against `root` (`root/<subpath>`)
    pub fn with_source_root(root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: Some(root.into()),
            ..Self::default()
        }
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(MemoryTable::row_count)
    }

    pub fn batches(&self, table: &str) -> Option<&[RecordBatch]> {
        self.tables.get(table).map(|t| t.batches.as_slice())
    }

    /// Statements executed so far, credentials redacted
    pub fn statements(&self) -> &[String] {
        &self.executed
    }

    /// Append rows to an existing table without any constraint checks
    pub fn append_unchecked(&mut self, table: &str, batch: RecordBatch) -> Result<()> {
        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| missing_relation(table))?;
        target.batches.push(batch);
        Ok(())
    }

    fn copy(&mut self, table: &str, subpath: &str) -> Result<u64> {
        let root = self.source_root.as_deref().ok_or_else(|| {
            ProcessingError::Warehouse("no source root configured for COPY".to_string())
        })?;
        let batches = ParquetReader::new().read_batches(&root.join(subpath))?;

        let target = self
            .tables
            .get_mut(table)
            .ok_or_else(|| missing_relation(table))?;
        let mut keys = target.primary_key_values()?;
        let key_index = target.primary_key_index();

        for batch in &batches {
            check_batch(target.spec, batch)?;
            if let Some(index) = key_index {
                for row in 0..batch.num_rows() {
                    let key = array_value_to_string(batch.column(index), row)?;
                    if !keys.insert(key.clone()) {
                        return Err(ProcessingError::Warehouse(format!(
                            "duplicate key value {} violates primary key of \"{}\"",
                            key, table
                        )));
                    }
                }
            }
        }

        let loaded: usize = batches.iter().map(|b| b.num_rows()).sum();
        target.batches.extend(batches);
        Ok(loaded as u64)
    }

    fn table(&self, table: &str) -> Result<&MemoryTable> {
        self.tables.get(table).ok_or_else(|| missing_relation(table))
    }
}

fn missing_relation(table: &str) -> ProcessingError {
    ProcessingError::Warehouse(format!("relation \"{}\" does not exist", table))
}

fn check_batch(spec: &TableSpec, batch: &RecordBatch) -> Result<()> {
    if batch.num_columns() != spec.columns.len() {
        return Err(ProcessingError::Warehouse(format!(
            "\"{}\" has {} columns, source has {}",
            spec.name,
            spec.columns.len(),
            batch.num_columns()
        )));
    }

    for (column, array) in spec.columns.iter().zip(batch.columns()) {
        if column.not_null && array.null_count() > 0 {
            return Err(ProcessingError::Warehouse(format!(
                "null value in column \"{}\" of \"{}\" violates not-null constraint",
                column.name, spec.name
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(%statement, "Executing statement in memory");
        self.executed.push(statement.to_string());

        match statement.kind() {
            StatementKind::DropTable { table } => {
                self.tables.remove(table);
                Ok(0)
            }
            StatementKind::CreateTable { table: spec } => {
                if self.tables.contains_key(spec.name) {
                    return Err(ProcessingError::Warehouse(format!(
                        "relation \"{}\" already exists",
                        spec.name
                    )));
                }
                self.tables.insert(
                    spec.name.to_string(),
                    MemoryTable {
                        spec: *spec,
                        batches: Vec::new(),
                    },
                );
                Ok(0)
            }
            StatementKind::CopyParquet { table, subpath, .. } => self.copy(table, subpath),
            other => Err(ProcessingError::Warehouse(format!(
                "{:?} returns rows, use fetch_scalar",
                other
            ))),
        }
    }

    async fn fetch_scalar(&mut self, statement: &Statement) -> Result<Option<i64>> {
        debug!(%statement, "Running query in memory");
        self.executed.push(statement.to_string());

        match statement.kind() {
            StatementKind::CountRows { table } => Ok(Some(self.table(table)?.row_count() as i64)),
            StatementKind::NullLookup { table, column } => {
                let target = self.table(table)?;
                let index = target.spec.column_index(column).ok_or_else(|| {
                    ProcessingError::Warehouse(format!(
                        "column \"{}\" does not exist in \"{}\"",
                        column, table
                    ))
                })?;
                let has_null = target
                    .batches
                    .iter()
                    .any(|batch| batch.column(index).null_count() > 0);
                Ok(has_null.then_some(1))
            }
            other => Err(ProcessingError::Warehouse(format!(
                "{:?} does not return rows",
                other
            ))),
        }
    }
}
