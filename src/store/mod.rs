//! Store: the data-store operations the pipeline consumes
//!
//! The pipeline only ever needs three things from the database:
//! - **execute**: run one DDL/DML statement
//! - **column_names**: list columns of a schema-qualified table from the
//!   information catalog
//! - **copy_in**: stream a CSV file into a table with `COPY ... FROM STDIN`
//!
//! [`PgStore`] implements them over one synchronous `postgres` connection.
//! Tests use the in-memory store in [`memory`].

use std::io::Read;

use log::debug;

use crate::config::ConnectionConfig;
use crate::error::{KpiError, KpiResult};

#[cfg(test)]
pub mod memory;

const COLUMNS_QUERY: &str = "SELECT column_name::text \
                             FROM information_schema.columns \
                             WHERE table_schema = $1 AND table_name = $2 \
                             ORDER BY ordinal_position";

/// Operations consumed from the backing data store
pub trait Store {
    /// Execute a single statement, discarding any rows
    fn execute(&mut self, sql: &str) -> KpiResult<()>;

    /// Column names of `schema.table`, in catalog order
    ///
    /// A missing table yields an empty list.
    fn column_names(&mut self, schema: &str, table: &str) -> KpiResult<Vec<String>>;

    /// Run a `COPY ... FROM STDIN` statement fed from `reader`, returning the
    /// number of rows copied
    fn copy_in(&mut self, sql: &str, reader: &mut dyn Read) -> KpiResult<u64>;
}

/// Store backed by a live PostgreSQL connection (autocommit)
pub struct PgStore {
    client: postgres::Client,
    target: String,
}

impl PgStore {
    /// Open a connection to `dbname` without TLS
    pub fn connect(connection: &ConnectionConfig, dbname: &str) -> KpiResult<Self> {
        let target = connection.describe(dbname);
        debug!("Connecting to {}", target);
        let client = connection
            .pg_config(dbname)
            .connect(postgres::NoTls)
            .map_err(|e| KpiError::ConnectionFailed {
                target: target.clone(),
                error: e.to_string(),
            })?;
        Ok(Self { client, target })
    }

    /// Whether a database called `dbname` exists on the server
    pub fn database_exists(&mut self, dbname: &str) -> KpiResult<bool> {
        let sql = "SELECT 1 FROM pg_database WHERE datname = $1";
        let row = self
            .client
            .query_opt(sql, &[&dbname])
            .map_err(|e| KpiError::CatalogError {
                operation: format!("look up database '{}' on {}", dbname, self.target),
                error: e.to_string(),
            })?;
        Ok(row.is_some())
    }
}

impl Store for PgStore {
    fn execute(&mut self, sql: &str) -> KpiResult<()> {
        debug!("Executing: {}", sql);
        self.client
            .batch_execute(sql)
            .map_err(|e| KpiError::store(format!("Statement on {}", self.target), sql, &e))
    }

    fn column_names(&mut self, schema: &str, table: &str) -> KpiResult<Vec<String>> {
        let rows = self
            .client
            .query(COLUMNS_QUERY, &[&schema, &table])
            .map_err(|e| KpiError::CatalogError {
                operation: format!("list columns of {}.{}", schema, table),
                error: e.to_string(),
            })?;

        rows.iter()
            .map(|row| {
                row.try_get::<_, String>(0).map_err(|e| KpiError::CatalogError {
                    operation: format!("read column name of {}.{}", schema, table),
                    error: e.to_string(),
                })
            })
            .collect()
    }

    fn copy_in(&mut self, sql: &str, reader: &mut dyn Read) -> KpiResult<u64> {
        debug!("Copying: {}", sql);
        let mut writer = self
            .client
            .copy_in(sql)
            .map_err(|e| KpiError::store("COPY FROM STDIN", sql, &e))?;
        std::io::copy(reader, &mut writer).map_err(|e| KpiError::IoError {
            operation: format!("stream rows for {}", sql),
            error: e.to_string(),
        })?;
        writer
            .finish()
            .map_err(|e| KpiError::store("COPY FROM STDIN", sql, &e))
    }
}
