//! Surrogate keys for the star schema.
//!
//! Keys are lowercase hex SHA-1 digests of the natural key text, so the same
//! input yields the same key on every run and platform. Fact rows compute
//! their foreign keys with these same functions instead of joining back to
//! the dimensions.

use chrono::NaiveDate;
use sha1::{Digest, Sha1};

/// Key of a date dimension row, derived from the ISO-8601 text of `date`.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use climate_warehouse::utils::keys::date_id;
///
/// let date = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
/// assert_eq!(date_id(date), date_id(date));
/// assert_eq!(date_id(date).len(), 40);
/// ```
pub fn date_id(date: NaiveDate) -> String {
    digest_hex(date.format("%Y-%m-%d").to_string().as_bytes())
}

/// Key of a location dimension row: `city` immediately followed by `country`.
pub fn location_id(city: &str, country: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(city.as_bytes());
    hasher.update(country.as_bytes());
    hex::encode(hasher.finalize())
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_id_is_sha1_of_iso_text() {
        let date = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
        assert_eq!(date_id(date), digest_hex(b"2013-01-01"));
        assert_eq!(date_id(date), date_id(NaiveDate::from_ymd_opt(2013, 1, 1).unwrap()));
    }

    #[test]
    fn test_date_id_distinguishes_dates() {
        let a = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2013, 1, 2).unwrap();
        assert_ne!(date_id(a), date_id(b));
    }

    #[test]
    fn test_known_digest() {
        // sha1("abc")
        assert_eq!(
            digest_hex(b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_location_id_concatenates_city_then_country() {
        assert_eq!(
            location_id("Boston", "United States"),
            digest_hex(b"BostonUnited States")
        );
        assert_ne!(
            location_id("Boston", "United States"),
            location_id("United States", "Boston")
        );
        // Plain concatenation, no separator
        assert_eq!(location_id("ab", "c"), location_id("a", "bc"));
    }
}
