use crate::error::{ProcessingError, Result};
use crate::settings::StorageSettings;
use crate::warehouse::statement::copy_parquet;
use crate::warehouse::tables::TableSpec;
use crate::warehouse::Warehouse;
use tracing::info;

/// Bulk-loads each table from the Parquet dataset stored under its sub-path.
pub struct BulkLoader {
    storage: StorageSettings,
}

impl BulkLoader {
    pub fn new(storage: StorageSettings) -> Self {
        Self { storage }
    }

    /// Load tables in the order given, stopping at the first failure
    pub async fn load_all<W: Warehouse + ?Sized>(
        &self,
        warehouse: &mut W,
        tables: &[&'static TableSpec],
    ) -> Result<u64> {
        let mut total = 0;
        for spec in tables {
            total += self.load(warehouse, spec).await?;
        }
        Ok(total)
    }

    pub async fn load<W: Warehouse + ?Sized>(&self, warehouse: &mut W, spec: &TableSpec) -> Result<u64> {
        let wrap = |source: ProcessingError| ProcessingError::LoadFailure {
            table: spec.name.to_string(),
            source: Box::new(source),
        };

        let statement = copy_parquet(&spec.identifier().map_err(wrap)?, spec.subpath, &self.storage);
        info!(table = spec.name, %statement, "Loading table");

        let rows = warehouse.execute(&statement).await.map_err(wrap)?;
        info!(table = spec.name, rows, "Loaded table");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::tables::DATE_DIM_TABLE;
    use crate::warehouse::{star_schema_tables, MemoryWarehouse, SchemaLifecycle};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_dataset_is_load_failure() -> Result<()> {
        let root = TempDir::new()?;
        let mut warehouse = MemoryWarehouse::with_source_root(root.path());
        SchemaLifecycle::new(star_schema_tables())
            .create_tables(&mut warehouse)
            .await?;

        let loader = BulkLoader::new(StorageSettings::local(""));
        match loader.load_all(&mut warehouse, &star_schema_tables()).await {
            Err(ProcessingError::LoadFailure { table, .. }) => assert_eq!(table, "dateDim"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(warehouse.row_count(DATE_DIM_TABLE.name), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn test_copy_statement_is_logged_redacted() -> Result<()> {
        let root = TempDir::new()?;
        let mut warehouse = MemoryWarehouse::with_source_root(root.path());
        let storage = StorageSettings {
            bucket: "s3://bucket".to_string(),
            access_key_id: "AKIA".to_string(),
            secret_access_key: "topsecret".to_string(),
            prefix: String::new(),
        };

        let _ = BulkLoader::new(storage).load(&mut warehouse, &DATE_DIM_TABLE).await;

        let executed = warehouse.statements();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].starts_with("COPY \"dateDim\" FROM 's3://bucket/dateDim'"));
        assert!(!executed[0].contains("topsecret"));
        Ok(())
    }
}
