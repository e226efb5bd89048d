use crate::error::Result;
use crate::utils::constants::{DATE_DIM, LOCATION_DIM, TEMPERATURE_FACT};
use crate::warehouse::statement::Identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub not_null: bool,
    pub primary_key: bool,
}

impl ColumnSpec {
    const fn key(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            not_null: true,
            primary_key: true,
        }
    }

    const fn required(name: &'static str, sql_type: &'static str) -> Self {
        Self {
            name,
            sql_type,
            not_null: true,
            primary_key: false,
        }
    }
}

/// A destination table: its columns in Parquet column order, the output
/// sub-path it is loaded from and the columns the quality gate checks for
/// NULLs.
#[derive(Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub subpath: &'static str,
    pub columns: &'static [ColumnSpec],
    pub null_checked: &'static [&'static str],
}

impl TableSpec {
    pub fn identifier(&self) -> Result<Identifier> {
        Identifier::new(self.name)
    }

    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

const VARCHAR: &str = "VARCHAR(256)";

pub static DATE_DIM_TABLE: TableSpec = TableSpec {
    name: DATE_DIM,
    subpath: DATE_DIM,
    columns: &[
        ColumnSpec::key("dateId", VARCHAR),
        ColumnSpec::required("date", "DATE"),
        ColumnSpec::required("year", "INTEGER"),
        ColumnSpec::required("month", "INTEGER"),
        ColumnSpec::required("day", "INTEGER"),
        ColumnSpec::required("dayOfWeek", "INTEGER"),
        ColumnSpec::required("weekOfYear", "INTEGER"),
    ],
    null_checked: &["date", "year", "month", "day", "dayOfWeek", "weekOfYear"],
};

pub static LOCATION_DIM_TABLE: TableSpec = TableSpec {
    name: LOCATION_DIM,
    subpath: LOCATION_DIM,
    columns: &[
        ColumnSpec::key("locationId", VARCHAR),
        ColumnSpec::required("city", VARCHAR),
        ColumnSpec::required("state", VARCHAR),
        ColumnSpec::required("country", VARCHAR),
        ColumnSpec::required("latitude", VARCHAR),
        ColumnSpec::required("longitude", VARCHAR),
        ColumnSpec::required("totalPopulation", VARCHAR),
    ],
    null_checked: &["city", "state", "country", "latitude", "longitude"],
};

pub static TEMPERATURE_FACT_TABLE: TableSpec = TableSpec {
    name: TEMPERATURE_FACT,
    subpath: TEMPERATURE_FACT,
    columns: &[
        ColumnSpec::key("temperatureId", "BIGINT"),
        ColumnSpec::required("dateId", VARCHAR),
        ColumnSpec::required("locationId", VARCHAR),
        ColumnSpec::required("avgTemp", "DOUBLE PRECISION"),
        ColumnSpec::required("avgTempUncert", "DOUBLE PRECISION"),
    ],
    null_checked: &["avgTemp", "avgTempUncert"],
};

/// The star schema tables in load order: dimensions before the fact table
pub fn star_schema_tables() -> [&'static TableSpec; 3] {
    [&DATE_DIM_TABLE, &LOCATION_DIM_TABLE, &TEMPERATURE_FACT_TABLE]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::{date_dim_schema, location_dim_schema, temperature_fact_schema};

    #[test]
    fn test_columns_match_parquet_layout() {
        let layouts = [
            (&DATE_DIM_TABLE, date_dim_schema()),
            (&LOCATION_DIM_TABLE, location_dim_schema()),
            (&TEMPERATURE_FACT_TABLE, temperature_fact_schema()),
        ];

        for (table, schema) in layouts {
            let parquet_names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
            let table_names: Vec<&str> = table.columns.iter().map(|c| c.name).collect();
            assert_eq!(parquet_names, table_names, "{}", table.name);
        }
    }

    #[test]
    fn test_null_checked_columns_exist() {
        for table in star_schema_tables() {
            assert!(table.identifier().is_ok());
            assert!(table.primary_key().is_some());
            for column in table.null_checked {
                assert!(table.column_index(column).is_some(), "{}.{}", table.name, column);
            }
        }
    }

    #[test]
    fn test_load_order() {
        let names: Vec<&str> = star_schema_tables().iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["dateDim", "locationDim", "temperatureFact"]);
    }
}
