//! Schema Inspector
//!
//! Reads which columns currently exist on the raw tables. A table that does
//! not exist produces an empty [`ColumnSet`]; callers cannot and need not
//! tell "missing table" apart from "table without the relevant columns".

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::KpiResult;
use crate::store::Store;
use crate::utils::normalize_identifier;

/// Normalized column names of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSet(BTreeSet<String>);

impl ColumnSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column name after normalizing it
    pub fn insert(&mut self, column: &str) -> bool {
        let name = normalize_identifier(column);
        if name.is_empty() {
            return false;
        }
        self.0.insert(name)
    }

    /// Membership test; `column` is normalized the same way as stored names
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(&normalize_identifier(column))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ColumnSet::new();
        for column in iter {
            set.insert(column.as_ref());
        }
        set
    }
}

/// Column sets keyed by raw table name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSets(BTreeMap<String, ColumnSet>);

impl ColumnSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for static fixtures
    pub fn with<S: AsRef<str>>(mut self, table: &str, columns: impl IntoIterator<Item = S>) -> Self {
        self.insert(table, columns.into_iter().collect());
        self
    }

    pub fn insert(&mut self, table: &str, columns: ColumnSet) {
        self.0.insert(normalize_identifier(table), columns);
    }

    /// Column set of `table`; the name is normalized like inserted names
    pub fn get(&self, table: &str) -> Option<&ColumnSet> {
        self.0.get(&normalize_identifier(table))
    }

    /// Whether `table` currently has `column`; absent tables have no columns
    pub fn has(&self, table: &str, column: &str) -> bool {
        self.get(table).is_some_and(|cols| cols.contains(column))
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Column set of `schema.table` as currently defined in the store
pub fn columns_of(store: &mut dyn Store, schema: &str, table: &str) -> KpiResult<ColumnSet> {
    let columns: ColumnSet = store.column_names(schema, table)?.into_iter().collect();
    debug!("{}.{} has {} column(s)", schema, table, columns.len());
    Ok(columns)
}

/// Column sets for every table in `tables`
pub fn inspect<'a>(
    store: &mut dyn Store,
    schema: &str,
    tables: impl IntoIterator<Item = &'a str>,
) -> KpiResult<ColumnSets> {
    let mut sets = ColumnSets::new();
    for table in tables {
        let columns = columns_of(store, schema, table)?;
        sets.insert(table, columns);
    }
    Ok(sets)
}
