pub mod dimension;
pub mod fact;
pub mod raw;

pub use dimension::{DateDimRow, LocationDimRow};
pub use fact::TemperatureFactRow;
pub use raw::{DemographicRecord, RawTemperatureRecord};
