use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::resolve::{ResolvedMetric, ResolvedView};
use super::ViewVariant;
use crate::error::KpiResult;
use crate::internal_error;
use crate::utils::{qualified_name, quote_ident};

/// `{alias.column}` or `{metric}`
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([a-z_][a-z0-9_]*)(?:\.([a-z_][a-z0-9_]*))?\}").expect("placeholder pattern compiles")
});

/// Column placeholders used by `template`, as `(alias, column)` pairs
pub fn template_columns(template: &str) -> Vec<(String, String)> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| {
            let column = caps.get(2)?;
            Some((caps[1].to_string(), column.as_str().to_string()))
        })
        .collect()
}

/// Render one definition template for `variant`
///
/// `earlier` holds the metrics of the same view resolved so far; a
/// `{metric}` placeholder may only name one of them.
pub fn render_fragment(
    template: &str,
    variant: &ViewVariant,
    earlier: &[ResolvedMetric],
) -> KpiResult<String> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        out.push_str(&render_placeholder(&caps, variant, earlier)?);
        last = whole.end();
    }
    out.push_str(&template[last..]);

    Ok(out)
}

fn render_placeholder(
    caps: &Captures<'_>,
    variant: &ViewVariant,
    earlier: &[ResolvedMetric],
) -> KpiResult<String> {
    let head = &caps[1];
    match caps.get(2) {
        Some(column) => {
            if variant.table_for(head).is_none() {
                return Err(internal_error!(
                    "variant '{}' has no table aliased '{}'",
                    variant.label,
                    head
                ));
            }
            Ok(format!("{}.{}", quote_ident(head), quote_ident(column.as_str())))
        }
        None => earlier
            .iter()
            .find(|m| m.name == head)
            .map(|m| format!("({})", m.sql))
            .ok_or_else(|| {
                internal_error!(
                    "variant '{}' references metric '{}' before it is resolved",
                    variant.label,
                    head
                )
            }),
    }
}

/// SELECT statement of a resolved view, reading tables from `raw_schema`
pub fn compose_select(view: &ResolvedView, raw_schema: &str) -> String {
    let variant = view.variant;
    let mut sql = String::from("SELECT\n");

    let select_list: Vec<String> = view
        .metrics
        .iter()
        .map(|m| format!("    {} AS {}", m.sql, quote_ident(m.name)))
        .collect();
    sql.push_str(&select_list.join(",\n"));

    sql.push_str(&format!(
        "\nFROM {} AS {}",
        qualified_name(raw_schema, variant.base.table),
        quote_ident(variant.base.alias)
    ));

    for join in variant.joins {
        sql.push_str(&format!(
            "\nJOIN {} AS {} ON {}.{} = {}.{}",
            qualified_name(raw_schema, join.source.table),
            quote_ident(join.source.alias),
            quote_ident(join.left.alias),
            quote_ident(join.left.column),
            quote_ident(join.right.alias),
            quote_ident(join.right.column),
        ));
    }

    let keys: Vec<String> = view.spec.keys.iter().map(u8::to_string).collect();
    if !keys.is_empty() {
        let keys = keys.join(", ");
        sql.push_str(&format!("\nGROUP BY {keys}\nORDER BY {keys}"));
    }

    sql
}

/// `CREATE VIEW "schema"."name" AS <select>`
pub fn create_view_sql(analytics_schema: &str, view: &str, select: &str) -> String {
    format!("CREATE VIEW {} AS\n{}", qualified_name(analytics_schema, view), select)
}

/// `DROP VIEW IF EXISTS "schema"."name"`
pub fn drop_view_sql(analytics_schema: &str, view: &str) -> String {
    format!("DROP VIEW IF EXISTS {}", qualified_name(analytics_schema, view))
}
