pub mod demographic_reader;
pub mod parquet_reader;
pub mod temperature_reader;

pub use demographic_reader::DemographicReader;
pub use parquet_reader::{DatasetInfo, ParquetReader};
pub use temperature_reader::{TemperatureIterator, TemperatureReader};
