use std::collections::BTreeMap;
use std::io::Read;

use super::Store;
use crate::error::{KpiError, KpiResult};

/// In-memory store recording every statement it receives
///
/// Catalog answers come from tables registered with [`MemoryStore::with_table`].
/// Statements containing a registered fragment are rejected the way a
/// server would reject them.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<(String, String), Vec<String>>,
    pub statements: Vec<String>,
    pub copied: Vec<(String, String)>,
    reject: Vec<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, table: &str, columns: &[&str]) -> Self {
        self.tables.insert(
            (schema.to_string(), table.to_string()),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Reject any statement containing `fragment` with SQLSTATE `sqlstate`
    pub fn rejecting(mut self, fragment: &str, sqlstate: &str) -> Self {
        self.reject.push((fragment.to_string(), sqlstate.to_string()));
        self
    }

    fn check(&self, sql: &str) -> KpiResult<()> {
        match self.reject.iter().find(|(fragment, _)| sql.contains(fragment.as_str())) {
            Some((_, sqlstate)) => Err(KpiError::StoreExecutionError {
                context: "MemoryStore".to_string(),
                sql: sql.to_string(),
                sqlstate: Some(sqlstate.clone()),
                error: "rejected by test store".to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn execute(&mut self, sql: &str) -> KpiResult<()> {
        self.statements.push(sql.to_string());
        self.check(sql)
    }

    fn column_names(&mut self, schema: &str, table: &str) -> KpiResult<Vec<String>> {
        Ok(self
            .tables
            .get(&(schema.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn copy_in(&mut self, sql: &str, reader: &mut dyn Read) -> KpiResult<u64> {
        let mut body = String::new();
        reader.read_to_string(&mut body)?;
        self.statements.push(sql.to_string());
        self.check(sql)?;
        // header line is skipped by COPY ... HEADER TRUE
        let rows = body.lines().skip(1).filter(|l| !l.is_empty()).count() as u64;
        self.copied.push((sql.to_string(), body));
        Ok(rows)
    }
}
