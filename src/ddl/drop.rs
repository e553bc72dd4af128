use log::debug;

use crate::error::{KpiError, KpiResult};
use crate::store::Store;
use crate::utils::qualified_name;
use crate::views::compose::drop_view_sql;

/// Drop view `schema.view` if it exists
///
/// Dropping a view that is not there is not an error.
pub fn drop_view(store: &mut dyn Store, schema: &str, view: &str) -> KpiResult<()> {
    let sql = drop_view_sql(schema, view);
    store.execute(&sql).map_err(|e| match e {
        KpiError::StoreExecutionError { sqlstate, error, .. } => KpiError::StoreExecutionError {
            context: format!("DROP VIEW {}.{}", schema, view),
            sql,
            sqlstate,
            error,
        },
        other => other,
    })?;
    debug!("Dropped view {}.{} (if it existed)", schema, view);
    Ok(())
}

/// Drop table `schema.table` if it exists
pub fn drop_table(store: &mut dyn Store, schema: &str, table: &str) -> KpiResult<()> {
    let sql = format!("DROP TABLE IF EXISTS {}", qualified_name(schema, table));
    store.execute(&sql)
}
