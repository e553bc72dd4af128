//! KPI views over the theLook raw tables
//!
//! Priority list:
//!
//! | view             | variant        | base         | needs                                         |
//! |------------------|----------------|--------------|-----------------------------------------------|
//! | `kpi_daily`      | `order_items`  | order_items  | order_items.created_at                        |
//! | `kpi_daily`      | `orders`       | orders       | orders.created_at                             |
//! | `category_daily` | `order_items`  | order_items ⨝ products | created_at, product_id, sale_price; products.id, category |
//!
//! Raw columns are `TEXT`; every cast happens inside the view.

use super::{col, ColumnRef, Definition, Join, MetricSpec, Source, ViewSpec, ViewVariant};

const ORDER_ITEMS: Source = Source { table: "order_items", alias: "order_items" };
const ORDERS: Source = Source { table: "orders", alias: "orders" };

const OI: Source = Source { table: "order_items", alias: "oi" };
const PRODUCTS: Source = Source { table: "products", alias: "p" };

const ITEMS_CREATED_AT: ColumnRef = col("order_items", "created_at");
const ITEMS_ORDER_ID: ColumnRef = col("order_items", "order_id");
const ITEMS_SALE_PRICE: ColumnRef = col("order_items", "sale_price");
const ORDERS_CREATED_AT: ColumnRef = col("orders", "created_at");

/// `COUNT(*)`; needs nothing
const ROW_COUNT: Definition = Definition { sql: "COUNT(*)", requires: &[] };

const KPI_DAILY_FROM_ITEMS: ViewVariant = ViewVariant {
    label: "order_items",
    base: ORDER_ITEMS,
    joins: &[],
    requires: &[ITEMS_CREATED_AT],
    metrics: &[
        MetricSpec {
            name: "order_date",
            primary: Definition {
                sql: "DATE({order_items.created_at}::timestamp)",
                requires: &[ITEMS_CREATED_AT],
            },
            fallback: None,
        },
        MetricSpec {
            name: "orders",
            primary: Definition {
                sql: "COUNT(DISTINCT {order_items.order_id})",
                requires: &[ITEMS_ORDER_ID],
            },
            fallback: Some(ROW_COUNT),
        },
        MetricSpec {
            name: "items",
            primary: ROW_COUNT,
            fallback: None,
        },
        MetricSpec {
            name: "revenue",
            primary: Definition {
                sql: "SUM(COALESCE({order_items.sale_price}::numeric, 0))",
                requires: &[ITEMS_SALE_PRICE],
            },
            fallback: Some(Definition { sql: "COUNT(*)::numeric", requires: &[] }),
        },
        MetricSpec {
            name: "aov",
            primary: Definition {
                sql: "CASE WHEN {orders} > 0 THEN {revenue} / {orders} ELSE NULL END",
                requires: &[],
            },
            fallback: None,
        },
    ],
};

const KPI_DAILY_FROM_ORDERS: ViewVariant = ViewVariant {
    label: "orders",
    base: ORDERS,
    joins: &[],
    requires: &[ORDERS_CREATED_AT],
    metrics: &[
        MetricSpec {
            name: "order_date",
            primary: Definition {
                sql: "DATE({orders.created_at}::timestamp)",
                requires: &[ORDERS_CREATED_AT],
            },
            fallback: None,
        },
        MetricSpec {
            name: "orders",
            primary: ROW_COUNT,
            fallback: None,
        },
    ],
};

const CATEGORY_DAILY_FROM_ITEMS: ViewVariant = ViewVariant {
    label: "order_items",
    base: OI,
    joins: &[Join {
        source: PRODUCTS,
        left: col("p", "id"),
        right: col("oi", "product_id"),
    }],
    requires: &[col("oi", "created_at"), col("p", "category")],
    metrics: &[
        MetricSpec {
            name: "order_date",
            primary: Definition {
                sql: "DATE({oi.created_at}::timestamp)",
                requires: &[col("oi", "created_at")],
            },
            fallback: None,
        },
        MetricSpec {
            name: "category",
            primary: Definition {
                sql: "{p.category}",
                requires: &[col("p", "category")],
            },
            fallback: None,
        },
        MetricSpec {
            name: "items",
            primary: ROW_COUNT,
            fallback: None,
        },
        MetricSpec {
            name: "revenue",
            primary: Definition {
                sql: "SUM(COALESCE({oi.sale_price}::numeric, 0))",
                requires: &[col("oi", "sale_price")],
            },
            fallback: None,
        },
    ],
};

/// Daily order KPIs, preferring line items over bare orders
pub const KPI_DAILY: ViewSpec = ViewSpec {
    name: "kpi_daily",
    keys: &[1],
    variants: &[KPI_DAILY_FROM_ITEMS, KPI_DAILY_FROM_ORDERS],
};

/// Daily items and revenue per product category
pub const CATEGORY_DAILY: ViewSpec = ViewSpec {
    name: "category_daily",
    keys: &[1, 2],
    variants: &[CATEGORY_DAILY_FROM_ITEMS],
};

/// Views built by the pipeline, in the order they are dropped and created
pub static KPI_VIEWS: &[ViewSpec] = &[KPI_DAILY, CATEGORY_DAILY];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::compose::template_columns;
    use std::collections::HashSet;

    fn definitions(variant: &ViewVariant) -> impl Iterator<Item = &Definition> {
        variant
            .metrics
            .iter()
            .flat_map(|m| std::iter::once(&m.primary).chain(m.fallback.iter()))
    }

    #[test]
    fn test_templates_reference_only_declared_columns() {
        for view in KPI_VIEWS {
            for variant in view.variants {
                for def in definitions(variant) {
                    let declared: HashSet<(String, String)> = def
                        .requires
                        .iter()
                        .map(|c| (c.alias.to_string(), c.column.to_string()))
                        .collect();
                    for used in template_columns(def.sql) {
                        assert!(
                            declared.contains(&used),
                            "{}/{}: '{}' uses {:?} without declaring it",
                            view.name, variant.label, def.sql, used
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_aliases_resolve_to_tables() {
        for view in KPI_VIEWS {
            for variant in view.variants {
                for column in variant.required_columns() {
                    assert!(variant.table_for(column.alias).is_some(), "{:?}", column);
                }
                for def in definitions(variant) {
                    for column in def.requires {
                        assert!(variant.table_for(column.alias).is_some(), "{:?}", column);
                    }
                }
            }
        }
    }

    #[test]
    fn test_keys_point_into_select_list() {
        for view in KPI_VIEWS {
            for variant in view.variants {
                for &key in view.keys {
                    assert!(key >= 1 && usize::from(key) <= variant.metrics.len());
                }
            }
        }
    }

    #[test]
    fn test_view_names_unique() {
        let names: HashSet<_> = KPI_VIEWS.iter().map(|v| v.name).collect();
        assert_eq!(names.len(), KPI_VIEWS.len());
    }
}
