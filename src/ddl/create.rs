use log::info;

use crate::error::{KpiError, KpiResult};
use crate::store::Store;
use crate::utils::{qualified_name, quote_ident};
use crate::views::compose::create_view_sql;

/// `CREATE SCHEMA IF NOT EXISTS`
pub fn create_schema(store: &mut dyn Store, schema: &str) -> KpiResult<()> {
    let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(schema));
    store.execute(&sql)
}

/// Create `schema.table` with one unconstrained `TEXT` column per name
///
/// Type coercion is left to the views reading the table.
///
/// # Errors
/// Returns `InvalidInput` when `columns` is empty; otherwise whatever the
/// store reports.
pub fn create_text_table(
    store: &mut dyn Store,
    schema: &str,
    table: &str,
    columns: &[String],
) -> KpiResult<()> {
    if columns.is_empty() {
        return Err(KpiError::InvalidInput {
            parameter: "columns".to_string(),
            value: table.to_string(),
            reason: "a raw table needs at least one column".to_string(),
        });
    }

    let cols_sql: Vec<String> = columns
        .iter()
        .map(|c| format!("{} TEXT", quote_ident(c)))
        .collect();
    let sql = format!(
        "CREATE TABLE {} ({})",
        qualified_name(schema, table),
        cols_sql.join(", ")
    );
    store.execute(&sql)
}

/// Create view `schema.view` from a composed SELECT
pub fn create_view(
    store: &mut dyn Store,
    schema: &str,
    view: &str,
    select_sql: &str,
) -> KpiResult<()> {
    let sql = create_view_sql(schema, view, select_sql);
    store.execute(&sql).map_err(|e| match e {
        KpiError::StoreExecutionError { sqlstate, error, .. } => KpiError::StoreExecutionError {
            context: format!("CREATE VIEW {}.{}", schema, view),
            sql,
            sqlstate,
            error,
        },
        other => other,
    })?;
    info!("Created view {}.{}", schema, view);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::assert_error_contains;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_create_schema() {
        let mut store = MemoryStore::new();
        create_schema(&mut store, "raw").unwrap();
        assert_eq!(store.statements, vec!["CREATE SCHEMA IF NOT EXISTS \"raw\""]);
    }

    #[test]
    fn test_create_text_table_quotes_headers() {
        let mut store = MemoryStore::new();
        let columns = vec!["id".to_string(), "sale \"price\"".to_string()];
        create_text_table(&mut store, "raw", "order items", &columns).unwrap();
        assert_eq!(
            store.statements,
            vec!["CREATE TABLE \"raw\".\"order items\" (\"id\" TEXT, \"sale \"\"price\"\"\" TEXT)"]
        );
    }

    #[test]
    fn test_create_text_table_without_columns() {
        let mut store = MemoryStore::new();
        assert_error_contains(
            create_text_table(&mut store, "raw", "empty", &[]),
            "at least one column",
        );
        assert!(store.statements.is_empty());
    }

    #[test]
    fn test_create_view_error_names_view() {
        let mut store = MemoryStore::new().rejecting("CREATE VIEW", "22P02");
        let err = create_view(&mut store, "analytics", "kpi_daily", "SELECT 1").unwrap_err();
        match err {
            KpiError::StoreExecutionError { context, sql, sqlstate, .. } => {
                assert_eq!(context, "CREATE VIEW analytics.kpi_daily");
                assert!(sql.starts_with("CREATE VIEW \"analytics\".\"kpi_daily\" AS"));
                assert_eq!(sqlstate.as_deref(), Some("22P02"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
