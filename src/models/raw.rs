use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the city temperature source (one city, one month).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTemperatureRecord {
    pub date: NaiveDate,
    pub average_temperature: Option<f64>,
    pub average_temperature_uncertainty: Option<f64>,
    pub city: String,
    pub country: String,
    pub latitude: String,
    pub longitude: String,
}

impl RawTemperatureRecord {
    pub fn new(
        date: NaiveDate,
        average_temperature: Option<f64>,
        average_temperature_uncertainty: Option<f64>,
        city: impl Into<String>,
        country: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        Self {
            date,
            average_temperature,
            average_temperature_uncertainty,
            city: city.into(),
            country: country.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
        }
    }

    pub fn is_in_country(&self, country: &str) -> bool {
        self.country == country
    }

    pub fn has_measurements(&self) -> bool {
        self.average_temperature.is_some() && self.average_temperature_uncertainty.is_some()
    }
}

/// The demographic columns the pipeline keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemographicRecord {
    pub city: String,
    pub state: String,
    pub total_population: String,
}

impl DemographicRecord {
    pub fn new(
        city: impl Into<String>,
        state: impl Into<String>,
        total_population: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            total_population: total_population.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_measurements() {
        let date = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
        let full = RawTemperatureRecord::new(
            date,
            Some(2.0),
            Some(0.3),
            "Boston",
            "United States",
            "42.59N",
            "72.00W",
        );
        assert!(full.has_measurements());
        assert!(full.is_in_country("United States"));

        let missing = RawTemperatureRecord {
            average_temperature: None,
            ..full
        };
        assert!(!missing.has_measurements());
    }
}
