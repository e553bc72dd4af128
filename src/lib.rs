//! Schema-adaptive KPI views over raw CSV tables in PostgreSQL.
//!
//! The pipeline stages the theLook e-commerce CSV files as all-`TEXT` raw
//! tables and derives KPI views from whatever columns those tables turn
//! out to have:
//!
//! - [`catalog`]: Schema Inspector, reads column sets from the catalog
//! - [`views`]: the static view decision table, resolution and SQL composition
//! - [`synthesize`](mod@synthesize): View Synthesizer, drops and (re)creates the views
//! - [`load`], [`bootstrap`], [`credentials`], [`download`]: the surrounding
//!   ETL steps, sequenced by [`pipeline`]
//!
//! ```rust
//! use kpi_views::catalog::ColumnSets;
//! use kpi_views::config::PipelineConfig;
//! use kpi_views::synthesize::{synthesize, ViewAction};
//!
//! let sets = ColumnSets::new()
//!     .with("order_items", ["id", "order_id", "created_at"]);
//! let plan = synthesize(&PipelineConfig::default(), &sets);
//!
//! assert!(matches!(plan[0].1, ViewAction::Created(_)));   // kpi_daily
//! assert!(matches!(plan[1].1, ViewAction::Dropped(_)));   // category_daily
//! ```

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod ddl;
pub mod download;
pub mod error;
pub mod load;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod synthesize;
pub mod utils;
pub mod validation;
pub mod views;

pub use catalog::{columns_of, ColumnSet, ColumnSets};
pub use error::{KpiError, KpiResult};
pub use synthesize::{synthesize, Synthesizer, ViewAction};

/// Version of the kpi_views crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
