pub mod parquet_writer;

pub use parquet_writer::{
    date_dim_batch, date_dim_schema, describe_schema, location_dim_batch, location_dim_schema,
    temperature_fact_batch, temperature_fact_schema, ParquetWriter,
};
