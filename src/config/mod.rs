//! Pipeline configuration
//!
//! Every step receives a [`PipelineConfig`] explicitly; nothing in the
//! library reads process environment. The CLI maps its flags (and their
//! environment fallbacks) onto this structure.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{KpiError, KpiResult};
use crate::validation::{validate_dataset_ref, validate_sql_identifier};

/// Schema holding one all-TEXT table per source CSV file
pub const DEFAULT_RAW_SCHEMA: &str = "raw";

/// Schema receiving the generated KPI views
pub const DEFAULT_ANALYTICS_SCHEMA: &str = "analytics";

/// Public theLook e-commerce dataset (small, multi-table)
pub const DEFAULT_DATASET: &str = "daichiuchigashima/thelook-ecommerce";

/// Database that is guaranteed to exist and is used to create the analytics one
pub const DEFAULT_MAINTENANCE_DB: &str = "airflow";

pub const DEFAULT_ANALYTICS_DB: &str = "ecommerce";

/// File name of the dataset API token inside the secrets directory
pub const CREDENTIALS_FILE_NAME: &str = "kaggle.json";

/// PostgreSQL connection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "postgres".to_string(),
            port: 5432,
            user: "gpi".to_string(),
            password: "gpi".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Build a `postgres` client configuration targeting `dbname`
    pub fn pg_config(&self, dbname: &str) -> postgres::Config {
        let mut config = postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .password(&self.password)
            .dbname(dbname)
            .application_name("kpi-etl");
        config
    }

    /// `user@host:port/dbname`, for log lines and error messages
    pub fn describe(&self, dbname: &str) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, dbname)
    }
}

/// Full configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub connection: ConnectionConfig,
    pub maintenance_db: String,
    pub analytics_db: String,
    pub raw_schema: String,
    pub analytics_schema: String,
    pub dataset: String,
    /// Root data directory; CSV files land in `<data_dir>/raw/thelook`
    pub data_dir: PathBuf,
    pub secrets_dir: PathBuf,
    /// Where the dataset CLI looks for its token
    pub kaggle_config_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            maintenance_db: DEFAULT_MAINTENANCE_DB.to_string(),
            analytics_db: DEFAULT_ANALYTICS_DB.to_string(),
            raw_schema: DEFAULT_RAW_SCHEMA.to_string(),
            analytics_schema: DEFAULT_ANALYTICS_SCHEMA.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            data_dir: PathBuf::from("/opt/airflow/data"),
            secrets_dir: PathBuf::from("/opt/airflow/secrets"),
            kaggle_config_dir: PathBuf::from("/home/airflow/.kaggle"),
        }
    }
}

impl PipelineConfig {
    /// Directory the dataset is downloaded and unpacked into
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("thelook")
    }

    pub fn credentials_source(&self) -> PathBuf {
        self.secrets_dir.join(CREDENTIALS_FILE_NAME)
    }

    pub fn credentials_target(&self) -> PathBuf {
        self.kaggle_config_dir.join(CREDENTIALS_FILE_NAME)
    }

    /// Reject names and references that cannot be used as configured
    pub fn validate(&self) -> KpiResult<()> {
        validate_sql_identifier(&self.raw_schema, "raw_schema")?;
        validate_sql_identifier(&self.analytics_schema, "analytics_schema")?;
        validate_sql_identifier(&self.analytics_db, "analytics_db")?;
        validate_sql_identifier(&self.maintenance_db, "maintenance_db")?;
        validate_dataset_ref(&self.dataset, "dataset")?;

        if self.raw_schema == self.analytics_schema {
            return Err(KpiError::ConfigError {
                setting: "analytics_schema".to_string(),
                value: self.analytics_schema.clone(),
                reason: "must differ from raw_schema".to_string(),
            });
        }

        if self.connection.port == 0 {
            return Err(KpiError::ConfigError {
                setting: "port".to_string(),
                value: "0".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
