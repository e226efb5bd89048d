/// Country retained by the temperature filter
pub const TARGET_COUNTRY: &str = "United States";

/// Sampling bound applied to the filtered temperature rows
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

/// Decimal places kept on temperature measurements
pub const TEMPERATURE_DECIMAL_PLACES: u32 = 3;

/// Dataset sub-paths under the output root, also used as table names
pub const DATE_DIM: &str = "dateDim";
pub const LOCATION_DIM: &str = "locationDim";
pub const TEMPERATURE_FACT: &str = "temperatureFact";

/// File written inside each dataset directory
pub const PART_FILE_NAME: &str = "part-00000.parquet";

/// Source file layouts
pub const TEMPERATURE_COLUMNS: [&str; 7] = [
    "dt",
    "AverageTemperature",
    "AverageTemperatureUncertainty",
    "City",
    "Country",
    "Latitude",
    "Longitude",
];
pub const DEMOGRAPHIC_DELIMITER: u8 = b';';
pub const DEMOGRAPHIC_CITY: &str = "City";
pub const DEMOGRAPHIC_STATE: &str = "State";
pub const DEMOGRAPHIC_POPULATION: &str = "Total Population";

/// Configuration defaults
pub const DEFAULT_CONFIG_FILE: &str = "config.cfg";
pub const DEFAULT_STORAGE_PREFIX: &str = "output";
pub const CONFIG_ENV_PREFIX: &str = "CLIMATE_WAREHOUSE";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
