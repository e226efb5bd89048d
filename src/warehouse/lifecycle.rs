use crate::error::{ProcessingError, Result};
use crate::warehouse::statement::{create_table, drop_table};
use crate::warehouse::tables::TableSpec;
use crate::warehouse::Warehouse;
use tracing::info;

/// Drops and recreates the destination tables.
///
/// Statements run in the order the tables are given; the first failure
/// stops the sequence and names the table it happened on.
pub struct SchemaLifecycle {
    tables: Vec<&'static TableSpec>,
}

impl SchemaLifecycle {
    pub fn new(tables: impl IntoIterator<Item = &'static TableSpec>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    /// `DROP TABLE IF EXISTS` for every table; missing tables are not an error
    pub async fn drop_tables<W: Warehouse + ?Sized>(&self, warehouse: &mut W) -> Result<()> {
        for &spec in &self.tables {
            let statement = drop_table(&spec.identifier()?);
            warehouse
                .execute(&statement)
                .await
                .map_err(|e| lifecycle_error("drop", spec, e))?;
            info!(table = spec.name, "Dropped table");
        }
        Ok(())
    }

    /// `CREATE TABLE` for every table; fails if one already exists
    pub async fn create_tables<W: Warehouse + ?Sized>(&self, warehouse: &mut W) -> Result<()> {
        for &spec in &self.tables {
            let statement = create_table(spec)?;
            warehouse
                .execute(&statement)
                .await
                .map_err(|e| lifecycle_error("create", spec, e))?;
            info!(table = spec.name, "Created table");
        }
        Ok(())
    }
}

fn lifecycle_error(operation: &'static str, spec: &TableSpec, source: ProcessingError) -> ProcessingError {
    ProcessingError::SchemaLifecycle {
        operation,
        table: spec.name.to_string(),
        source: Box::new(source),
    }
}
