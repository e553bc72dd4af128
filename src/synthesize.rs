//! View Synthesizer
//!
//! Turns column sets into per-view actions and applies them:
//! 1. **plan**: resolve every view (pure, no store access) into
//!    `Created(sql)`, `Dropped` or, for a broken catalog entry, `Failed`
//! 2. **apply**: for each view in catalog order, `DROP VIEW IF EXISTS`
//!    unconditionally, then `CREATE VIEW` when the plan says so
//!
//! Failures are scoped to the view being processed; the remaining views are
//! still dropped and created, and the report lists every outcome.

use chrono::Utc;
use log::{error, info, warn};

use crate::catalog::{inspect, ColumnSets};
use crate::config::PipelineConfig;
use crate::ddl::{create_view, drop_view};
use crate::error::{KpiError, KpiResult};
use crate::report::{SynthesisReport, ViewOutcome, ViewStatus};
use crate::store::Store;
use crate::views::compose::compose_select;
use crate::views::resolve::unsatisfied_reason;
use crate::views::{referenced_tables, resolve, Resolution, ViewSpec, KPI_VIEWS};

/// What to do with a view in the store
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    /// (Re)create the view from this SELECT
    Created(String),
    /// Leave the view dropped; always a `NoSatisfiableView`
    Dropped(KpiError),
    /// The view definition itself could not be rendered
    Failed(KpiError),
}

/// Planned action for one view
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedView {
    pub view: &'static str,
    /// Variant chosen, when the view is created
    pub variant: Option<&'static str>,
    pub fallbacks: Vec<&'static str>,
    pub action: ViewAction,
}

/// Synthesizes a fixed list of views into one analytics schema
#[derive(Debug, Clone)]
pub struct Synthesizer<'a> {
    raw_schema: &'a str,
    analytics_schema: &'a str,
    views: &'a [ViewSpec],
}

impl<'a> Synthesizer<'a> {
    /// Synthesizer for the KPI views, reading and writing the configured schemas
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            raw_schema: &config.raw_schema,
            analytics_schema: &config.analytics_schema,
            views: KPI_VIEWS,
        }
    }

    /// Replace the view catalog
    pub fn with_views(mut self, views: &'a [ViewSpec]) -> Self {
        self.views = views;
        self
    }

    /// Raw tables whose columns the plan depends on
    pub fn required_tables(&self) -> Vec<&'static str> {
        referenced_tables(self.views)
    }

    /// Decide, per view, whether it is created (and from which SQL) or dropped
    pub fn plan(&self, sets: &ColumnSets) -> Vec<PlannedView> {
        self.views.iter().map(|view| self.plan_view(view, sets)).collect()
    }

    fn plan_view(&self, view: &ViewSpec, sets: &ColumnSets) -> PlannedView {
        match resolve(view, sets) {
            Ok(Resolution::Satisfied(resolved)) => PlannedView {
                view: view.name,
                variant: Some(resolved.variant.label),
                fallbacks: resolved.fallbacks(),
                action: ViewAction::Created(compose_select(&resolved, self.raw_schema)),
            },
            Ok(Resolution::Unsatisfiable(misses)) => PlannedView {
                view: view.name,
                variant: None,
                fallbacks: Vec::new(),
                action: ViewAction::Dropped(KpiError::NoSatisfiableView {
                    view: view.name.to_string(),
                    reason: unsatisfied_reason(&misses),
                }),
            },
            Err(e) => PlannedView {
                view: view.name,
                variant: None,
                fallbacks: Vec::new(),
                action: ViewAction::Failed(e),
            },
        }
    }

    /// Drop every planned view, then create the satisfiable ones
    ///
    /// Never stops at the first failure; see [`SynthesisReport`].
    pub fn apply(&self, store: &mut dyn Store, plan: &[PlannedView]) -> SynthesisReport {
        let started_at = Utc::now();
        let views = plan.iter().map(|p| self.apply_one(store, p)).collect();
        SynthesisReport {
            started_at,
            finished_at: Utc::now(),
            views,
        }
    }

    fn apply_one(&self, store: &mut dyn Store, planned: &PlannedView) -> ViewOutcome {
        let schema = self.analytics_schema;

        if let Err(e) = drop_view(store, schema, planned.view) {
            error!("Could not drop {}.{}: {}", schema, planned.view, e);
            return ViewOutcome::failed(planned.view, &e);
        }

        match &planned.action {
            ViewAction::Created(select_sql) => match create_view(store, schema, planned.view, select_sql) {
                Ok(()) => {
                    if !planned.fallbacks.is_empty() {
                        info!(
                            "{}.{} uses fallback definitions for: {}",
                            schema,
                            planned.view,
                            planned.fallbacks.join(", ")
                        );
                    }
                    ViewOutcome {
                        view: planned.view.to_string(),
                        status: ViewStatus::Created {
                            variant: planned.variant.unwrap_or_default().to_string(),
                            fallbacks: planned.fallbacks.iter().map(|f| f.to_string()).collect(),
                            sql: select_sql.clone(),
                        },
                    }
                }
                Err(e) => {
                    error!("Could not create {}.{}: {}", schema, planned.view, e);
                    ViewOutcome::failed(planned.view, &e)
                }
            },
            ViewAction::Dropped(reason) => {
                warn!("Dropped {}.{}: {}", schema, planned.view, reason);
                let reason = match reason {
                    KpiError::NoSatisfiableView { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                ViewOutcome {
                    view: planned.view.to_string(),
                    status: ViewStatus::Dropped { reason },
                }
            }
            ViewAction::Failed(e) => {
                error!("Could not build {}.{}: {}", schema, planned.view, e);
                ViewOutcome::failed(planned.view, e)
            }
        }
    }

    /// Inspect the raw tables, plan and apply
    ///
    /// Only a failing catalog read aborts; view-level problems end up in
    /// the report.
    pub fn run(&self, store: &mut dyn Store) -> KpiResult<SynthesisReport> {
        let sets = inspect(store, self.raw_schema, self.required_tables())?;
        let plan = self.plan(&sets);
        let report = self.apply(store, &plan);
        info!(
            "KPI views: {} created, {} dropped, {} failed",
            report.created(),
            report.dropped(),
            report.failed()
        );
        Ok(report)
    }
}

/// `(view name, action)` for every KPI view, without touching a store
pub fn synthesize(config: &PipelineConfig, sets: &ColumnSets) -> Vec<(String, ViewAction)> {
    Synthesizer::new(config)
        .plan(sets)
        .into_iter()
        .map(|p| (p.view.to_string(), p.action))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::{assert_view_dropped, assert_view_failed};
    use crate::store::memory::MemoryStore;
    use crate::views::{col, Definition, MetricSpec, Source, ViewVariant};

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn action<'p>(plan: &'p [(String, ViewAction)], view: &str) -> &'p ViewAction {
        &plan.iter().find(|(name, _)| name == view).unwrap().1
    }

    fn created_sql<'p>(plan: &'p [(String, ViewAction)], view: &str) -> &'p str {
        match action(plan, view) {
            ViewAction::Created(sql) => sql,
            other => panic!("{view} not created: {other:?}"),
        }
    }

    fn full_sets() -> ColumnSets {
        ColumnSets::new()
            .with("order_items", ["id", "order_id", "product_id", "sale_price", "created_at"])
            .with("products", ["id", "category"])
    }

    #[test]
    fn test_scenario_all_columns_present() {
        let plan = synthesize(&config(), &full_sets());

        let kpi = created_sql(&plan, "kpi_daily");
        assert!(kpi.contains("DATE(\"order_items\".\"created_at\"::timestamp) AS \"order_date\""));
        assert!(kpi.contains("SUM(COALESCE(\"order_items\".\"sale_price\"::numeric, 0)) AS \"revenue\""));
        assert!(kpi.contains("FROM \"raw\".\"order_items\" AS \"order_items\""));
        assert!(kpi.ends_with("GROUP BY 1\nORDER BY 1"));

        let category = created_sql(&plan, "category_daily");
        assert!(category.contains("JOIN \"raw\".\"products\" AS \"p\" ON \"p\".\"id\" = \"oi\".\"product_id\""));
        assert!(category.contains("\"p\".\"category\" AS \"category\""));
        assert!(category.ends_with("GROUP BY 1, 2\nORDER BY 1, 2"));
    }

    #[test]
    fn test_scenario_no_timestamp_anywhere() {
        let sets = ColumnSets::new()
            .with("order_items", ["id", "order_id"])
            .with("orders", Vec::<String>::new());
        let plan = synthesize(&config(), &sets);

        assert_eq!(plan.len(), 2);
        match action(&plan, "kpi_daily") {
            ViewAction::Dropped(KpiError::NoSatisfiableView { reason, .. }) => {
                assert_eq!(reason, "no created_at column found");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            action(&plan, "category_daily"),
            ViewAction::Dropped(KpiError::NoSatisfiableView { .. })
        ));
    }

    #[test]
    fn test_scenario_no_sale_price_no_products() {
        let sets = ColumnSets::new().with("order_items", ["id", "order_id", "product_id", "created_at"]);
        let plan = synthesize(&config(), &sets);

        let kpi = created_sql(&plan, "kpi_daily");
        assert!(kpi.contains("COUNT(*)::numeric AS \"revenue\""));
        assert!(!kpi.contains("sale_price"));
        assert!(matches!(action(&plan, "category_daily"), ViewAction::Dropped(_)));
    }

    #[test]
    fn test_revenue_never_mixes_sum_and_count() {
        for sets in [
            full_sets(),
            ColumnSets::new().with("order_items", ["order_id", "created_at"]),
        ] {
            let plan = synthesize(&config(), &sets);
            let kpi = created_sql(&plan, "kpi_daily");
            let uses_sum = kpi.contains("SUM(COALESCE(\"order_items\".\"sale_price\"");
            let uses_count = kpi.contains("COUNT(*)::numeric");
            assert!(uses_sum ^ uses_count, "mixed revenue expressions in {kpi}");
        }
    }

    #[test]
    fn test_synthesize_is_idempotent() {
        let first = synthesize(&config(), &full_sets());
        let second = synthesize(&config(), &full_sets());
        assert_eq!(first, second);

        let synth_config = config();
        let synth = Synthesizer::new(&synth_config);
        let mut a = MemoryStore::new();
        let mut b = MemoryStore::new();
        let plan = synth.plan(&full_sets());
        synth.apply(&mut a, &plan);
        synth.apply(&mut a, &plan);
        synth.apply(&mut b, &plan);
        assert_eq!(a.statements[..4], b.statements[..]);
        assert_eq!(a.statements[4..], b.statements[..]);
    }

    #[test]
    fn test_apply_drops_before_create_in_catalog_order() {
        let synth_config = config();
        let synth = Synthesizer::new(&synth_config);
        let mut store = MemoryStore::new();
        let plan = synth.plan(&full_sets());
        let report = synth.apply(&mut store, &plan);

        assert_eq!(report.created(), 2);
        assert_eq!(store.statements.len(), 4);
        assert_eq!(store.statements[0], "DROP VIEW IF EXISTS \"analytics\".\"kpi_daily\"");
        assert!(store.statements[1].starts_with("CREATE VIEW \"analytics\".\"kpi_daily\" AS\nSELECT"));
        assert_eq!(store.statements[2], "DROP VIEW IF EXISTS \"analytics\".\"category_daily\"");
        assert!(store.statements[3].starts_with("CREATE VIEW \"analytics\".\"category_daily\""));
    }

    #[test]
    fn test_unsatisfiable_view_is_only_dropped() {
        let synth_config = config();
        let synth = Synthesizer::new(&synth_config);
        let mut store = MemoryStore::new();
        let plan = synth.plan(&ColumnSets::new());
        let report = synth.apply(&mut store, &plan);

        assert_eq!(report.dropped(), 2);
        assert!(!report.has_failures());
        assert!(store.statements.iter().all(|s| s.starts_with("DROP VIEW IF EXISTS")));
        assert_view_dropped(&report, "kpi_daily", "no created_at column found");
        assert_view_dropped(&report, "category_daily", "created_at");
    }

    #[test]
    fn test_store_rejection_does_not_stop_other_views() {
        let synth_config = config();
        let synth = Synthesizer::new(&synth_config);
        let mut store = MemoryStore::new().rejecting("CREATE VIEW \"analytics\".\"kpi_daily\"", "22007");
        let plan = synth.plan(&full_sets());
        let report = synth.apply(&mut store, &plan);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.created(), 1);
        match report.outcome("kpi_daily") {
            Some(ViewStatus::Failed { sqlstate, error, sql }) => {
                assert_eq!(sqlstate, "22007");
                assert!(error.contains("CREATE VIEW analytics.kpi_daily"));
                assert!(sql.as_deref().unwrap_or_default().contains("SELECT"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(report.outcome("category_daily"), Some(ViewStatus::Created { .. })));
    }

    #[test]
    fn test_failed_drop_skips_create() {
        let synth_config = config();
        let synth = Synthesizer::new(&synth_config);
        let mut store = MemoryStore::new().rejecting("DROP VIEW IF EXISTS \"analytics\".\"kpi_daily\"", "2BP01");
        let plan = synth.plan(&full_sets());
        let report = synth.apply(&mut store, &plan);

        assert_view_failed(&report, "kpi_daily", "2BP01");
        assert!(!store.statements.iter().any(|s| s.starts_with("CREATE VIEW \"analytics\".\"kpi_daily\"")));
        assert_eq!(report.created(), 1);
    }

    #[test]
    fn test_run_reads_catalog_from_raw_schema() {
        let synth_config = config();
        let synth = Synthesizer::new(&synth_config);
        let mut store = MemoryStore::new()
            .with_table("raw", "order_items", &["id", "order_id", "product_id", "created_at"])
            .with_table("raw", "products", &["id", "category"]);
        let report = synth.run(&mut store).unwrap();

        assert!(matches!(report.outcome("kpi_daily"), Some(ViewStatus::Created { fallbacks, .. }) if fallbacks == &vec!["revenue".to_string()]));
        assert_eq!(report.warnings(), vec!["category_daily: no sale_price column found"]);
        assert_view_dropped(&report, "category_daily", "no sale_price column found");
    }

    #[test]
    fn test_custom_schemas_and_views() {
        static ONLY: &[ViewSpec] = &[ViewSpec {
            name: "row_counts",
            keys: &[],
            variants: &[ViewVariant {
                label: "events",
                base: Source { table: "events", alias: "e" },
                joins: &[],
                requires: &[col("e", "id")],
                metrics: &[MetricSpec {
                    name: "n",
                    primary: Definition { sql: "COUNT({e.id})", requires: &[col("e", "id")] },
                    fallback: None,
                }],
            }],
        }];

        let synth_config = PipelineConfig {
            raw_schema: "staging".to_string(),
            analytics_schema: "marts".to_string(),
            ..PipelineConfig::default()
        };
        let synth = Synthesizer::new(&synth_config).with_views(ONLY);
        assert_eq!(synth.required_tables(), vec!["events"]);

        let plan = synth.plan(&ColumnSets::new().with("events", ["id"]));
        assert_eq!(
            plan[0].action,
            ViewAction::Created(
                "SELECT\n    COUNT(\"e\".\"id\") AS \"n\"\nFROM \"staging\".\"events\" AS \"e\"".to_string()
            )
        );

        let mut store = MemoryStore::new();
        synth.apply(&mut store, &plan);
        assert_eq!(store.statements[0], "DROP VIEW IF EXISTS \"marts\".\"row_counts\"");
    }

    #[test]
    fn test_broken_template_is_planned_as_failed() {
        static BROKEN: &[ViewSpec] = &[ViewSpec {
            name: "broken",
            keys: &[],
            variants: &[ViewVariant {
                label: "events",
                base: Source { table: "events", alias: "e" },
                joins: &[],
                requires: &[],
                metrics: &[MetricSpec {
                    name: "n",
                    primary: Definition { sql: "COUNT({x.id})", requires: &[col("e", "id")] },
                    fallback: None,
                }],
            }],
        }];

        let synth_config = config();
        let synth = Synthesizer::new(&synth_config).with_views(BROKEN);
        let plan = synth.plan(&ColumnSets::new().with("events", ["id"]));
        match &plan[0].action {
            ViewAction::Failed(e) => {
                assert!(e.is_fatal());
                assert_eq!(e.sqlstate(), "XX000");
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut store = MemoryStore::new();
        let report = synth.apply(&mut store, &plan);
        assert_view_failed(&report, "broken", "XX000");
        assert_eq!(store.statements, vec!["DROP VIEW IF EXISTS \"analytics\".\"broken\"".to_string()]);
        assert!(report.warnings().is_empty());
    }
}
