//! SQL statement construction.
//!
//! Fixed SQL text can only be appended as `&'static str`; anything supplied
//! at run time goes through [`Identifier`] (validated, double-quoted) or a
//! literal (single-quoted, quotes doubled). Secret literals are replaced by
//! `'***'` in the text used for display and logging.

use crate::error::{ProcessingError, Result};
use crate::settings::StorageSettings;
use crate::warehouse::tables::TableSpec;
use std::fmt;

/// A table or column name made of ASCII letters, digits and underscores,
/// not starting with a digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(Self(name))
        } else {
            Err(ProcessingError::InvalidIdentifier(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// What a statement does, for implementations that interpret statements
/// instead of sending SQL text.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    DropTable {
        table: String,
    },
    CreateTable {
        table: &'static TableSpec,
    },
    CopyParquet {
        table: String,
        subpath: String,
        source: String,
    },
    CountRows {
        table: String,
    },
    NullLookup {
        table: String,
        column: String,
    },
}

#[derive(Clone, PartialEq)]
pub struct Statement {
    sql: String,
    redacted: String,
    kind: StatementKind,
}

impl Statement {
    /// Full SQL text, secrets included
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.redacted)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct StatementBuilder {
    sql: String,
    redacted: String,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_sql(mut self, text: &'static str) -> Self {
        self.sql.push_str(text);
        self.redacted.push_str(text);
        self
    }

    pub fn push_ident(mut self, ident: &Identifier) -> Self {
        let quoted = ident.to_string();
        self.sql.push_str(&quoted);
        self.redacted.push_str(&quoted);
        self
    }

    pub fn push_literal(mut self, value: &str) -> Self {
        let quoted = quote_literal(value);
        self.sql.push_str(&quoted);
        self.redacted.push_str(&quoted);
        self
    }

    pub fn push_secret_literal(mut self, value: &str) -> Self {
        self.sql.push_str(&quote_literal(value));
        self.redacted.push_str("'***'");
        self
    }

    pub fn build(self, kind: StatementKind) -> Statement {
        Statement {
            sql: self.sql,
            redacted: self.redacted,
            kind,
        }
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn drop_table(table: &Identifier) -> Statement {
    StatementBuilder::new()
        .push_sql("DROP TABLE IF EXISTS ")
        .push_ident(table)
        .build(StatementKind::DropTable {
            table: table.as_str().to_string(),
        })
}

pub fn create_table(spec: &'static TableSpec) -> Result<Statement> {
    let mut builder = StatementBuilder::new()
        .push_sql("CREATE TABLE ")
        .push_ident(&spec.identifier()?)
        .push_sql(" (\n");

    for (i, column) in spec.columns.iter().enumerate() {
        if i > 0 {
            builder = builder.push_sql(",\n");
        }
        builder = builder
            .push_sql("    ")
            .push_ident(&Identifier::new(column.name)?)
            .push_sql(" ")
            .push_sql(column.sql_type);
        if column.primary_key {
            builder = builder.push_sql(" PRIMARY KEY");
        } else if column.not_null {
            builder = builder.push_sql(" NOT NULL");
        }
    }

    Ok(builder
        .push_sql("\n)")
        .build(StatementKind::CreateTable { table: spec }))
}

/// Bulk copy of the Parquet files at `<bucket>/<prefix>/<subpath>` into `table`
pub fn copy_parquet(table: &Identifier, subpath: &str, storage: &StorageSettings) -> Statement {
    let source = storage.dataset_uri(subpath);
    let credentials = format!(
        "aws_access_key_id={};aws_secret_access_key={}",
        storage.access_key_id, storage.secret_access_key
    );

    StatementBuilder::new()
        .push_sql("COPY ")
        .push_ident(table)
        .push_sql(" FROM ")
        .push_literal(&source)
        .push_sql(" CREDENTIALS ")
        .push_secret_literal(&credentials)
        .push_sql(" FORMAT AS PARQUET")
        .build(StatementKind::CopyParquet {
            table: table.as_str().to_string(),
            subpath: subpath.to_string(),
            source,
        })
}

pub fn count_rows(table: &Identifier) -> Statement {
    StatementBuilder::new()
        .push_sql("SELECT COUNT(*) FROM ")
        .push_ident(table)
        .build(StatementKind::CountRows {
            table: table.as_str().to_string(),
        })
}

/// Returns one row when `column` holds at least one NULL
pub fn null_lookup(table: &Identifier, column: &Identifier) -> Statement {
    StatementBuilder::new()
        .push_sql("SELECT CAST(1 AS BIGINT) FROM ")
        .push_ident(table)
        .push_sql(" WHERE ")
        .push_ident(column)
        .push_sql(" IS NULL LIMIT 1")
        .build(StatementKind::NullLookup {
            table: table.as_str().to_string(),
            column: column.as_str().to_string(),
        })
}
