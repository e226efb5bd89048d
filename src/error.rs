use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Schema mismatch in {source_name}: {message}")]
    SchemaMismatch {
        source_name: String,
        message: String,
    },

    #[error("Failed to write dataset {dataset}: {source}")]
    WriteFailure {
        dataset: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Failed to {operation} table {table}: {source}")]
    SchemaLifecycle {
        operation: &'static str,
        table: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Bulk load into table {table} failed: {source}")]
    LoadFailure {
        table: String,
        #[source]
        source: Box<ProcessingError>,
    },

    #[error("Data quality failed on table {table}: {message}")]
    DataQuality { table: String, message: String },

    #[error("Invalid SQL identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Warehouse error: {0}")]
    Warehouse(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

impl ProcessingError {
    pub fn schema_mismatch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn data_quality(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataQuality {
            table: table.into(),
            message: message.into(),
        }
    }
}
