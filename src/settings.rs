//! Run configuration.
//!
//! Settings are read once at startup from an INI file with `[Redshift]` and
//! `[S3]` sections, overridden by `CLIMATE_WAREHOUSE__<SECTION>__<KEY>`
//! environment variables, validated, and then passed by value to the
//! components that need them.
//!
//! INI section and key names are lowercased and `-` becomes `_` before the
//! file is parsed, so `aws-bucket` in the file and
//! `CLIMATE_WAREHOUSE__S3__AWS_BUCKET` in the environment name the same key.

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{CONFIG_ENV_PREFIX, DEFAULT_STORAGE_PREFIX};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;
use std::fmt;
use std::fs;
use std::path::Path;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Settings {
    #[serde(rename = "redshift")]
    #[validate(nested)]
    pub warehouse: WarehouseSettings,

    #[serde(rename = "s3")]
    #[validate(nested)]
    pub storage: StorageSettings,
}

/// Warehouse connection parameters
#[derive(Clone, Deserialize, Validate)]
pub struct WarehouseSettings {
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(length(min = 1))]
    pub user: String,

    pub password: String,

    #[validate(range(min = 1))]
    pub port: u16,

    #[validate(length(min = 1))]
    pub database: String,
}

/// Object storage location of the output root and its credentials
#[derive(Clone, Deserialize, Validate)]
pub struct StorageSettings {
    #[serde(rename = "aws_bucket")]
    #[validate(length(min = 1))]
    pub bucket: String,

    pub access_key_id: String,

    pub secret_access_key: String,

    /// Key prefix the datasets were uploaded under
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

fn default_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

impl Settings {
    /// Load from an INI file plus environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, environment())
    }

    fn load_with(path: &Path, environment: Environment) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            ProcessingError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let builder = Config::builder()
            .add_source(File::from_str(&normalize_ini(&text), FileFormat::Ini))
            .add_source(environment);
        Self::build(builder)
    }

    /// Load from INI text; environment overrides are not applied
    pub fn from_ini(text: &str) -> Result<Self> {
        Self::build(
            Config::builder().add_source(File::from_str(&normalize_ini(text), FileFormat::Ini)),
        )
    }

    fn build(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }
}

/// Lowercase section headers and key names, `-` in keys becomes `_`.
/// Values and comments are left untouched.
fn normalize_ini(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            normalized.push_str(&trimmed.to_lowercase());
        } else if trimmed.starts_with(';') || trimmed.starts_with('#') {
            normalized.push_str(line);
        } else if let Some((key, value)) = line.split_once('=') {
            normalized.push_str(&key.trim().to_lowercase().replace('-', "_"));
            normalized.push_str(" =");
            normalized.push_str(value);
        } else {
            normalized.push_str(line);
        }
        normalized.push('\n');
    }
    normalized
}

fn environment() -> Environment {
    Environment::with_prefix(CONFIG_ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

impl WarehouseSettings {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
    }
}

impl StorageSettings {
    /// Storage used when no remote warehouse is involved
    pub fn local(prefix: impl Into<String>) -> Self {
        Self {
            bucket: "local".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            prefix: prefix.into(),
        }
    }

    /// `<bucket>/<prefix>`, the root every COPY reads from
    pub fn location(&self) -> String {
        let mut location = self.bucket.trim_end_matches('/').to_string();
        let prefix = self.prefix.trim_matches('/');
        if !prefix.is_empty() {
            location.push('/');
            location.push_str(prefix);
        }
        location
    }

    /// `<bucket>/<prefix>/<subpath>`
    pub fn dataset_uri(&self, subpath: &str) -> String {
        format!("{}/{}", self.location(), subpath)
    }
}

impl fmt::Debug for WarehouseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseSettings")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("prefix", &self.prefix)
            .finish()
    }
}
