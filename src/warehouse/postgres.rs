use crate::error::Result;
use crate::settings::WarehouseSettings;
use crate::warehouse::{Statement, Warehouse};
use async_trait::async_trait;
use sqlx::{Connection as _, Executor as _, PgConnection, Postgres};
use tracing::{debug, instrument};

/// A dedicated connection to a PostgreSQL-protocol warehouse (Redshift).
///
/// Opened fresh for each run and never shared. The connection runs in
/// autocommit mode, so each statement commits independently.
#[derive(Debug)]
pub struct PgWarehouse(PgConnection);

impl PgWarehouse {
    #[instrument(skip_all, fields(host = %settings.host, database = %settings.database), err)]
    pub async fn connect(settings: &WarehouseSettings) -> Result<Self> {
        let conn = PgConnection::connect_with(&settings.connect_options()).await?;
        Ok(Self(conn))
    }

    pub async fn close(self) -> Result<()> {
        self.0.close().await?;
        Ok(())
    }
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn execute(&mut self, statement: &Statement) -> Result<u64> {
        debug!(%statement, "Executing statement");
        // Simple query protocol: DDL and COPY carry no bind parameters
        let result = self.0.execute(sqlx::raw_sql(statement.sql())).await?;
        Ok(result.rows_affected())
    }

    async fn fetch_scalar(&mut self, statement: &Statement) -> Result<Option<i64>> {
        debug!(%statement, "Running query");
        let value = sqlx::query_scalar::<Postgres, i64>(statement.sql())
            .fetch_optional(&mut self.0)
            .await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;

    fn assert_warehouse<W: Warehouse>() {}

    #[test]
    fn test_pg_warehouse_implements_warehouse() {
        assert_warehouse::<PgWarehouse>();
    }

    #[tokio::test]
    async fn test_connect_failure_is_database_error() {
        let settings = WarehouseSettings {
            host: "127.0.0.1".to_string(),
            user: "awsuser".to_string(),
            password: "unused".to_string(),
            port: 1,
            database: "dev".to_string(),
        };

        let result = PgWarehouse::connect(&settings).await;
        assert!(matches!(result, Err(ProcessingError::Database(_))));
    }
}
