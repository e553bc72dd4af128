//! DDL Operations: schemas, raw tables and KPI views
//!
//! Every statement built here quotes its identifiers, since table and
//! column names come from source file names and CSV headers.
//!
//! - **CREATE**: schemas (`IF NOT EXISTS`), all-`TEXT` raw tables, views
//! - **DROP**: raw tables and views, always `IF EXISTS`
//!
//! Views are never altered in place: the synthesizer drops and recreates
//! them on every run.

pub mod create;
pub mod drop;

pub use create::{create_schema, create_text_table, create_view};
pub use drop::{drop_table, drop_view};
