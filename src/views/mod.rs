//! View Synthesis: column-driven KPI view definitions
//!
//! KPI views are declared as a static decision table rather than assembled
//! with ad hoc conditionals:
//! - **ViewSpec**: one output view, its GROUP BY / ORDER BY keys and an
//!   ordered list of variants (alternative base tables, highest priority first)
//! - **ViewVariant**: base table, joins, explicitly required columns and the
//!   metrics it selects
//! - **MetricSpec**: a named SELECT expression with a primary definition and
//!   an optional cheaper fallback, each listing the columns it needs
//!
//! ## Resolution
//!
//! [`resolve::resolve`] is a pure function from [`ColumnSets`] to either a
//! resolved view (one variant, one definition per metric) or the list of
//! columns each variant was missing. [`compose`] turns a resolved view into
//! SQL text, and [`crate::synthesize::Synthesizer`] drops/creates the views in the store.
//!
//! ## Templates
//!
//! Definitions are SQL fragments with two kinds of placeholders:
//! - `{alias.column}`: a column of one of the variant's tables, rendered as
//!   `"alias"."column"`
//! - `{metric}`: the already-resolved expression of an earlier metric of the
//!   same view, rendered in parentheses
//!
//! [`ColumnSets`]: crate::catalog::ColumnSets

pub mod compose;
pub mod kpi;
pub mod resolve;

pub use kpi::KPI_VIEWS;
pub use resolve::{resolve, Resolution};

/// A column referenced through a variant's table alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnRef {
    pub alias: &'static str,
    pub column: &'static str,
}

/// Shorthand constructor used by the static view tables
pub const fn col(alias: &'static str, column: &'static str) -> ColumnRef {
    ColumnRef { alias, column }
}

/// A raw table and the alias it is referenced by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub table: &'static str,
    pub alias: &'static str,
}

/// Inner join of `source` on `left = right`
///
/// Both key columns are required for the variant to be usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Join {
    pub source: Source,
    pub left: ColumnRef,
    pub right: ColumnRef,
}

/// One way to compute a metric, usable when all `requires` columns exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    pub sql: &'static str,
    pub requires: &'static [ColumnRef],
}

/// A selected output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSpec {
    /// Output column name
    pub name: &'static str,
    pub primary: Definition,
    pub fallback: Option<Definition>,
}

/// One alternative shape of a view, tied to a base table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewVariant {
    pub label: &'static str,
    pub base: Source,
    pub joins: &'static [Join],
    /// Columns required regardless of metric resolution
    pub requires: &'static [ColumnRef],
    pub metrics: &'static [MetricSpec],
}

impl ViewVariant {
    /// Every table source of this variant, base first
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        std::iter::once(&self.base).chain(self.joins.iter().map(|j| &j.source))
    }

    /// Raw table name behind `alias`
    pub fn table_for(&self, alias: &str) -> Option<&'static str> {
        self.sources().find(|s| s.alias == alias).map(|s| s.table)
    }

    /// Explicit requirements plus join keys
    pub fn required_columns(&self) -> impl Iterator<Item = ColumnRef> + '_ {
        self.requires
            .iter()
            .copied()
            .chain(self.joins.iter().flat_map(|j| [j.left, j.right]))
    }
}

/// A named output view and its alternatives in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewSpec {
    pub name: &'static str,
    /// 1-based SELECT positions used for both GROUP BY and ORDER BY
    pub keys: &'static [u8],
    pub variants: &'static [ViewVariant],
}

impl ViewSpec {
    /// Raw tables any variant may read, in first-mention order
    pub fn tables(&self) -> Vec<&'static str> {
        let mut tables = Vec::new();
        for variant in self.variants {
            for source in variant.sources() {
                if !tables.contains(&source.table) {
                    tables.push(source.table);
                }
            }
        }
        tables
    }
}

/// Raw tables referenced by any of `views`, in first-mention order
pub fn referenced_tables(views: &[ViewSpec]) -> Vec<&'static str> {
    let mut tables = Vec::new();
    for view in views {
        for table in view.tables() {
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
    }
    tables
}
