//! Raw load: one all-`TEXT` table per CSV file
//!
//! Each file `<dir>/<Name>.csv` becomes `<raw_schema>.<name>` with one
//! `TEXT` column per (normalized) header field, and its rows are streamed
//! in with `COPY ... FROM STDIN` in CSV mode. Existing tables are replaced.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::info;

use crate::catalog::{ColumnSet, ColumnSets};
use crate::ddl::{create_schema, create_text_table, drop_table};
use crate::error::{KpiError, KpiResult};
use crate::report::{LoadSummary, LoadedTable};
use crate::store::Store;
use crate::utils::{normalize_identifier, qualified_name, quote_ident, table_name_for_path};

/// `*.csv` files directly inside `dir`, sorted by path
pub fn list_csv_files(dir: &Path) -> KpiResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| KpiError::IoError {
        operation: format!("list {}", dir.display()),
        error: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| KpiError::IoError {
                operation: format!("list {}", dir.display()),
                error: e.to_string(),
            })?
            .path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(KpiError::NoSourceFiles {
            dir: dir.display().to_string(),
        });
    }
    Ok(files)
}

/// Normalized header of a CSV file
///
/// # Errors
/// `CsvError` when the file has no header row, or when two header fields
/// normalize to the same name or to an empty one.
pub fn read_csv_header(path: &Path) -> KpiResult<Vec<String>> {
    let csv_err = |reason: String| KpiError::CsvError {
        path: path.display().to_string(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_err(e.to_string()))?;
    let header = reader.headers().map_err(|e| csv_err(e.to_string()))?;

    if header.is_empty() {
        return Err(csv_err("missing header row".to_string()));
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(header.len());
    for (pos, raw) in header.iter().enumerate() {
        let name = normalize_identifier(raw);
        if name.is_empty() {
            return Err(csv_err(format!("header field {} is empty", pos + 1)));
        }
        if !seen.insert(name.clone()) {
            return Err(csv_err(format!("duplicate column '{}'", name)));
        }
        columns.push(name);
    }
    Ok(columns)
}

/// `COPY` statement for a raw table, columns in file order
pub fn copy_sql(schema: &str, table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT CSV, HEADER TRUE, QUOTE '\"', ESCAPE '\"')",
        qualified_name(schema, table),
        cols.join(", ")
    )
}

fn table_name(path: &Path) -> KpiResult<String> {
    table_name_for_path(path).ok_or_else(|| KpiError::CsvError {
        path: path.display().to_string(),
        reason: "file name does not yield a table name".to_string(),
    })
}

/// Replace `<schema>.<table>` with the contents of one CSV file
pub fn load_csv(store: &mut dyn Store, schema: &str, path: &Path) -> KpiResult<LoadedTable> {
    let table = table_name(path)?;
    let columns = read_csv_header(path)?;

    drop_table(store, schema, &table)?;
    create_text_table(store, schema, &table, &columns)?;

    let mut file = File::open(path).map_err(|e| KpiError::IoError {
        operation: format!("open {}", path.display()),
        error: e.to_string(),
    })?;
    let rows = store.copy_in(&copy_sql(schema, &table, &columns), &mut file)?;

    info!("Loaded {} rows into {}.{} from {}", rows, schema, table, path.display());
    Ok(LoadedTable {
        table,
        source: path.display().to_string(),
        columns: columns.len(),
        rows,
    })
}

/// Load every CSV file in `paths` into `schema`, stopping at the first failure
pub fn load_csvs(store: &mut dyn Store, schema: &str, paths: &[PathBuf]) -> KpiResult<LoadSummary> {
    create_schema(store, schema)?;

    let mut summary = LoadSummary {
        schema: schema.to_string(),
        tables: Vec::with_capacity(paths.len()),
    };
    for path in paths {
        summary.tables.push(load_csv(store, schema, path)?);
    }
    Ok(summary)
}

/// Column sets the load step would stage from the CSV files in `dir`
pub fn csv_column_sets(dir: &Path) -> KpiResult<ColumnSets> {
    let mut sets = ColumnSets::new();
    for path in list_csv_files(dir)? {
        let columns: ColumnSet = read_csv_header(&path)?.into_iter().collect();
        sets.insert(&table_name(&path)?, columns);
    }
    Ok(sets)
}
