use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::RawTemperatureRecord;
use crate::utils::keys::{date_id, location_id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DateDimRow {
    #[validate(length(equal = 40))]
    pub date_id: String,
    pub date: NaiveDate,
    pub year: i32,
    #[validate(range(min = 1, max = 12))]
    pub month: i32,
    #[validate(range(min = 1, max = 31))]
    pub day: i32,
    /// 1 = Sunday ... 7 = Saturday
    #[validate(range(min = 1, max = 7))]
    pub day_of_week: i32,
    /// ISO-8601 week number
    #[validate(range(min = 1, max = 53))]
    pub week_of_year: i32,
}

impl DateDimRow {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            date_id: date_id(date),
            date,
            year: date.year(),
            month: date.month() as i32,
            day: date.day() as i32,
            day_of_week: date.weekday().number_from_sunday() as i32,
            week_of_year: date.iso_week().week() as i32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationDimRow {
    #[validate(length(equal = 40))]
    pub location_id: String,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub state: String,
    #[validate(length(min = 1))]
    pub country: String,
    #[validate(length(min = 1))]
    pub latitude: String,
    #[validate(length(min = 1))]
    pub longitude: String,
    pub total_population: String,
}

impl LocationDimRow {
    pub fn from_joined(record: &RawTemperatureRecord, state: &str, total_population: &str) -> Self {
        Self {
            location_id: location_id(&record.city, &record.country),
            city: record.city.clone(),
            state: state.to_string(),
            country: record.country.clone(),
            latitude: record.latitude.clone(),
            longitude: record.longitude.clone(),
            total_population: total_population.to_string(),
        }
    }
}
