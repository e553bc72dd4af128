//! Per-run summaries printed by the CLI
//!
//! The view report states, per view, whether it was created, dropped or
//! failed and why; the load summary lists the raw tables staged.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{KpiError, KpiResult};

/// Process exit status after a fatal error
pub const EXIT_FATAL: u8 = 1;
/// Process exit status when at least one view failed to build
pub const EXIT_VIEWS_FAILED: u8 = 2;

/// What happened to one view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewStatus {
    Created {
        variant: String,
        /// Metrics computed with their fallback definition
        fallbacks: Vec<String>,
        sql: String,
    },
    /// Preconditions not met; the view was dropped (soft warning)
    Dropped { reason: String },
    Failed {
        sqlstate: String,
        error: String,
        /// Statement the store rejected, when there was one
        #[serde(skip_serializing_if = "Option::is_none")]
        sql: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewOutcome {
    pub view: String,
    #[serde(flatten)]
    pub status: ViewStatus,
}

impl ViewOutcome {
    pub fn failed(view: &str, error: &KpiError) -> Self {
        Self {
            view: view.to_string(),
            status: ViewStatus::Failed {
                sqlstate: error.sqlstate().to_string(),
                error: error.to_string(),
                sql: match error {
                    KpiError::StoreExecutionError { sql, .. } => Some(sql.clone()),
                    _ => None,
                },
            },
        }
    }
}

/// Result of one synthesis run
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub views: Vec<ViewOutcome>,
}

impl SynthesisReport {
    pub fn created(&self) -> usize {
        self.count(|s| matches!(s, ViewStatus::Created { .. }))
    }

    pub fn dropped(&self) -> usize {
        self.count(|s| matches!(s, ViewStatus::Dropped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ViewStatus::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// 0 unless a view failed; dropped views are only warnings
    pub fn exit_status(&self) -> u8 {
        if self.has_failures() {
            EXIT_VIEWS_FAILED
        } else {
            0
        }
    }

    fn count(&self, pred: impl Fn(&ViewStatus) -> bool) -> usize {
        self.views.iter().filter(|v| pred(&v.status)).count()
    }

    pub fn outcome(&self, view: &str) -> Option<&ViewStatus> {
        self.views.iter().find(|v| v.view == view).map(|v| &v.status)
    }

    /// Soft warnings: one line per dropped view
    pub fn warnings(&self) -> Vec<String> {
        self.views
            .iter()
            .filter_map(|v| match &v.status {
                ViewStatus::Dropped { reason } => Some(format!("{}: {}", v.view, reason)),
                _ => None,
            })
            .collect()
    }

    /// One line per view plus a totals line
    pub fn render_text(&self) -> String {
        let mut lines = Vec::with_capacity(self.views.len() + 1);
        for outcome in &self.views {
            let line = match &outcome.status {
                ViewStatus::Created { variant, fallbacks, .. } if fallbacks.is_empty() => {
                    format!("created  {} (from {})", outcome.view, variant)
                }
                ViewStatus::Created { variant, fallbacks, .. } => format!(
                    "created  {} (from {}, fallback: {})",
                    outcome.view,
                    variant,
                    fallbacks.join(", ")
                ),
                ViewStatus::Dropped { reason } => format!("dropped  {}: {}", outcome.view, reason),
                ViewStatus::Failed { error, .. } => format!("FAILED   {}: {}", outcome.view, error),
            };
            lines.push(line);
        }
        lines.push(format!(
            "{} created, {} dropped, {} failed in {} ms",
            self.created(),
            self.dropped(),
            self.failed(),
            (self.finished_at - self.started_at).num_milliseconds()
        ));
        lines.join("\n")
    }

    pub fn to_json(&self) -> KpiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// One raw table staged from a CSV file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTable {
    pub table: String,
    pub source: String,
    pub columns: usize,
    pub rows: u64,
}

/// Raw tables staged by one load run
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    pub schema: String,
    pub tables: Vec<LoadedTable>,
}

impl LoadSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }

    pub fn render_text(&self) -> String {
        let mut lines: Vec<String> = self
            .tables
            .iter()
            .map(|t| {
                format!(
                    "loaded   {}.{} ({} columns, {} rows) from {}",
                    self.schema, t.table, t.columns, t.rows, t.source
                )
            })
            .collect();
        lines.push(format!(
            "{} table(s), {} row(s)",
            self.tables.len(),
            self.total_rows()
        ));
        lines.join("\n")
    }

    pub fn to_json(&self) -> KpiResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
