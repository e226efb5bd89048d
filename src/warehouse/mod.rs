//! Destination warehouse: statement construction, table catalog and the
//! drop/create, bulk load and quality-check steps that run against it.

pub mod lifecycle;
pub mod loader;
pub mod memory;
pub mod postgres;
pub mod quality;
pub mod statement;
pub mod tables;

pub use lifecycle::SchemaLifecycle;
pub use loader::BulkLoader;
pub use memory::MemoryWarehouse;
pub use postgres::PgWarehouse;
pub use quality::{QualityCheck, QualityGate, QualityMode, QualityOutcome, QualityReport};
pub use statement::{Identifier, Statement, StatementBuilder, StatementKind};
pub use tables::{star_schema_tables, ColumnSpec, TableSpec};

use crate::error::Result;
use async_trait::async_trait;

/// The capability the warehouse steps need from a connection.
///
/// Every `execute` is committed on its own; there is no transaction spanning
/// several statements.
#[async_trait]
pub trait Warehouse: Send {
    /// Run a statement, returning the number of affected rows
    async fn execute(&mut self, statement: &Statement) -> Result<u64>;

    /// Run a query and return the first column of its first row, if any
    async fn fetch_scalar(&mut self, statement: &Statement) -> Result<Option<i64>>;
}
