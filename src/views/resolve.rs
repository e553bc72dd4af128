use std::collections::BTreeSet;

use serde::Serialize;

use super::compose::render_fragment;
use super::{ColumnRef, Definition, ViewSpec, ViewVariant};
use crate::catalog::ColumnSets;
use crate::error::KpiResult;

/// Which definition of a metric was used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Primary,
    Fallback,
}

/// A metric with its rendered SQL expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetric {
    pub name: &'static str,
    pub choice: Choice,
    pub sql: String,
}

/// A view with one variant chosen and every metric resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedView<'a> {
    pub spec: &'a ViewSpec,
    pub variant: &'a ViewVariant,
    pub metrics: Vec<ResolvedMetric>,
}

impl ResolvedView<'_> {
    /// Metrics that had to use their fallback definition
    pub fn fallbacks(&self) -> Vec<&'static str> {
        self.metrics
            .iter()
            .filter(|m| m.choice == Choice::Fallback)
            .map(|m| m.name)
            .collect()
    }
}

/// A column that was needed but absent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingColumn {
    pub table: &'static str,
    pub column: &'static str,
}

/// Why one variant could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMiss {
    pub variant: &'static str,
    pub missing: Vec<MissingColumn>,
}

/// Outcome of resolving a view against the current column sets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    Satisfied(ResolvedView<'a>),
    /// No variant works; one entry per variant in priority order
    Unsatisfiable(Vec<VariantMiss>),
}

/// Human-readable reason for an unsatisfiable view
///
/// When every variant lacks the same single column name the reason is
/// `no <column> column found`; otherwise the missing columns are listed
/// per variant.
pub fn unsatisfied_reason(misses: &[VariantMiss]) -> String {
    let mut common: Option<BTreeSet<&str>> = None;
    for miss in misses {
        let names: BTreeSet<&str> = miss.missing.iter().map(|m| m.column).collect();
        common = Some(match common {
            Some(prev) => prev.intersection(&names).copied().collect(),
            None => names,
        });
    }

    if let Some(common) = common {
        if common.len() == 1 {
            if let Some(column) = common.iter().next() {
                return format!("no {} column found", column);
            }
        }
    }

    let parts: Vec<String> = misses
        .iter()
        .map(|miss| {
            let cols: Vec<String> = miss
                .missing
                .iter()
                .map(|m| format!("{}.{}", m.table, m.column))
                .collect();
            format!("{} variant missing {}", miss.variant, cols.join(", "))
        })
        .collect();
    parts.join("; ")
}

/// Resolve `view` against `sets`
///
/// Variants are tried in declared order and the first one whose required
/// columns exist and whose every metric resolves wins. Each metric uses its
/// primary definition when possible, else its fallback; a metric with
/// neither makes the whole variant unusable. Errors are only returned for
/// broken templates.
pub fn resolve<'a>(view: &'a ViewSpec, sets: &ColumnSets) -> KpiResult<Resolution<'a>> {
    let mut misses = Vec::with_capacity(view.variants.len());

    for variant in view.variants {
        match choose_definitions(variant, sets) {
            Ok(choices) => {
                let metrics = render_metrics(variant, &choices)?;
                return Ok(Resolution::Satisfied(ResolvedView {
                    spec: view,
                    variant,
                    metrics,
                }));
            }
            Err(missing) => misses.push(VariantMiss {
                variant: variant.label,
                missing,
            }),
        }
    }

    Ok(Resolution::Unsatisfiable(misses))
}

/// Pick a definition for every metric, or report every missing column
fn choose_definitions(
    variant: &ViewVariant,
    sets: &ColumnSets,
) -> Result<Vec<(Choice, Definition)>, Vec<MissingColumn>> {
    let mut missing = BTreeSet::new();
    missing.extend(absent(variant, variant.required_columns(), sets));

    let mut choices = Vec::with_capacity(variant.metrics.len());
    for metric in variant.metrics {
        let primary_missing = absent(variant, metric.primary.requires.iter().copied(), sets);
        if primary_missing.is_empty() {
            choices.push((Choice::Primary, metric.primary));
            continue;
        }

        match metric.fallback {
            Some(fallback) => {
                let fallback_missing = absent(variant, fallback.requires.iter().copied(), sets);
                if fallback_missing.is_empty() {
                    choices.push((Choice::Fallback, fallback));
                } else {
                    missing.extend(primary_missing);
                    missing.extend(fallback_missing);
                }
            }
            None => missing.extend(primary_missing),
        }
    }

    if missing.is_empty() {
        Ok(choices)
    } else {
        Err(missing.into_iter().collect())
    }
}

/// Columns of `columns` not present in `sets`
///
/// An alias the variant does not declare counts as missing under the
/// alias name, which makes such a variant unusable rather than silently
/// accepted.
fn absent(
    variant: &ViewVariant,
    columns: impl Iterator<Item = ColumnRef>,
    sets: &ColumnSets,
) -> Vec<MissingColumn> {
    columns
        .filter_map(|c| {
            let table = variant.table_for(c.alias).unwrap_or(c.alias);
            if sets.has(table, c.column) {
                None
            } else {
                Some(MissingColumn { table, column: c.column })
            }
        })
        .collect()
}

fn render_metrics(
    variant: &ViewVariant,
    choices: &[(Choice, Definition)],
) -> KpiResult<Vec<ResolvedMetric>> {
    let mut metrics: Vec<ResolvedMetric> = Vec::with_capacity(choices.len());
    for (metric, (choice, def)) in variant.metrics.iter().zip(choices) {
        let sql = render_fragment(def.sql, variant, &metrics)?;
        metrics.push(ResolvedMetric {
            name: metric.name,
            choice: *choice,
            sql,
        });
    }
    Ok(metrics)
}
