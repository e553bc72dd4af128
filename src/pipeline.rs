//! Sequential pipeline: credentials → bootstrap → download → load → views
//!
//! Each step opens its own connection. Any error before the view step
//! aborts the run; the view step reports per-view outcomes instead.

use std::path::{Path, PathBuf};

use log::info;

use crate::bootstrap::bootstrap;
use crate::config::PipelineConfig;
use crate::credentials::stage_credentials;
use crate::download::download_dataset;
use crate::error::KpiResult;
use crate::load::{csv_column_sets, list_csv_files, load_csvs};
use crate::report::{LoadSummary, SynthesisReport};
use crate::store::PgStore;
use crate::synthesize::{PlannedView, Synthesizer};

/// Load the CSV files in `dir` (default: the configured raw directory)
pub fn load_step(config: &PipelineConfig, dir: Option<&Path>) -> KpiResult<LoadSummary> {
    let dir = dir.map_or_else(|| config.raw_dir(), Path::to_path_buf);
    let files = list_csv_files(&dir)?;
    load_files(config, &files)
}

fn load_files(config: &PipelineConfig, files: &[PathBuf]) -> KpiResult<LoadSummary> {
    let mut store = PgStore::connect(&config.connection, &config.analytics_db)?;
    load_csvs(&mut store, &config.raw_schema, files)
}

/// Rebuild the KPI views from the current raw tables
pub fn views_step(config: &PipelineConfig) -> KpiResult<SynthesisReport> {
    let mut store = PgStore::connect(&config.connection, &config.analytics_db)?;
    Synthesizer::new(config).run(&mut store)
}

/// Plan the views from CSV headers alone, without a database
pub fn plan_from_csv_dir(config: &PipelineConfig, dir: &Path) -> KpiResult<Vec<PlannedView>> {
    let sets = csv_column_sets(dir)?;
    Ok(Synthesizer::new(config).plan(&sets))
}

/// Outputs of a full run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub load: LoadSummary,
    pub views: SynthesisReport,
}

/// Run every step once, in order
pub fn run_all(config: &PipelineConfig) -> KpiResult<RunSummary> {
    config.validate()?;

    let token = stage_credentials(config)?;
    info!("[1/5] credentials staged at {}", token.display());

    bootstrap(config)?;
    info!("[2/5] database {} ready", config.analytics_db);

    let files = download_dataset(config)?;
    info!("[3/5] {} file(s) downloaded", files.len());

    let load = load_files(config, &files)?;
    info!("[4/5] {} table(s) loaded", load.tables.len());

    let views = views_step(config)?;
    info!("[5/5] {} view(s) created", views.created());

    Ok(RunSummary { load, views })
}
