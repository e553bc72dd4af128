use log::info;

use crate::config::PipelineConfig;
use crate::ddl::create_schema;
use crate::error::KpiResult;
use crate::store::{PgStore, Store};
use crate::utils::quote_ident;

/// Create the analytics database if it is missing.
///
/// Connects to the maintenance database, which is guaranteed to exist.
/// Returns whether the database had to be created.
pub fn ensure_database(config: &PipelineConfig) -> KpiResult<bool> {
    let mut store = PgStore::connect(&config.connection, &config.maintenance_db)?;
    if store.database_exists(&config.analytics_db)? {
        info!("Database {} already exists", config.analytics_db);
        return Ok(false);
    }

    store.execute(&create_database_sql(&config.analytics_db))?;
    info!("Created database {}", config.analytics_db);
    Ok(true)
}

fn create_database_sql(dbname: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(dbname))
}

/// Create the raw and analytics schemas if they are missing
pub fn ensure_schemas(store: &mut dyn Store, config: &PipelineConfig) -> KpiResult<()> {
    create_schema(store, &config.raw_schema)?;
    create_schema(store, &config.analytics_schema)?;
    Ok(())
}

/// Full bootstrap: database first, then schemas inside it
pub fn bootstrap(config: &PipelineConfig) -> KpiResult<()> {
    ensure_database(config)?;
    let mut store = PgStore::connect(&config.connection, &config.analytics_db)?;
    ensure_schemas(&mut store, config)
}
