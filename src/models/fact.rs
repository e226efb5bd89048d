use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureFactRow {
    #[validate(range(min = 1))]
    pub temperature_id: i64,
    #[validate(length(equal = 40))]
    pub date_id: String,
    #[validate(length(equal = 40))]
    pub location_id: String,
    pub avg_temp: f64,
    pub avg_temp_uncert: f64,
}

impl TemperatureFactRow {
    pub fn new(
        temperature_id: i64,
        date_id: String,
        location_id: String,
        avg_temp: f64,
        avg_temp_uncert: f64,
    ) -> Self {
        Self {
            temperature_id,
            date_id,
            location_id,
            avg_temp,
            avg_temp_uncert,
        }
    }
}
