//! `kpi-etl`: stage theLook CSV files in PostgreSQL and build KPI views.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, warn};

use kpi_views::config::{
    ConnectionConfig, PipelineConfig, DEFAULT_ANALYTICS_DB, DEFAULT_ANALYTICS_SCHEMA, DEFAULT_DATASET,
    DEFAULT_MAINTENANCE_DB, DEFAULT_RAW_SCHEMA,
};
use kpi_views::report::{SynthesisReport, EXIT_FATAL};
use kpi_views::synthesize::ViewAction;
use kpi_views::{bootstrap, credentials, download, pipeline, KpiResult};

#[derive(Parser)]
#[command(
    name = "kpi-etl",
    about = "Load theLook e-commerce CSVs into PostgreSQL and build schema-adaptive KPI views.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Output format for reports
    #[arg(long, global = true, default_value = "text", help_heading = "Global Options")]
    format: OutputFormat,
    #[command(flatten)]
    settings: Settings,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct Settings {
    #[arg(long, env = "PG_HOST", global = true, default_value = "postgres", help_heading = "Connection")]
    pg_host: String,
    #[arg(long, env = "PG_PORT", global = true, default_value_t = 5432, help_heading = "Connection")]
    pg_port: u16,
    #[arg(long, env = "PG_USER", global = true, default_value = "gpi", help_heading = "Connection")]
    pg_user: String,
    #[arg(
        long,
        env = "PG_PASSWORD",
        global = true,
        default_value = "gpi",
        hide_env_values = true,
        hide_default_value = true,
        help_heading = "Connection"
    )]
    pg_password: String,
    /// Existing database used to create the analytics one
    #[arg(long, env = "MAINTENANCE_PG_DB", global = true, default_value = DEFAULT_MAINTENANCE_DB, help_heading = "Connection")]
    maintenance_db: String,
    #[arg(long, env = "ANALYTICS_PG_DB", global = true, default_value = DEFAULT_ANALYTICS_DB, help_heading = "Connection")]
    analytics_db: String,
    #[arg(long, env = "RAW_SCHEMA", global = true, default_value = DEFAULT_RAW_SCHEMA, help_heading = "Pipeline")]
    raw_schema: String,
    #[arg(long, env = "ANALYTICS_SCHEMA", global = true, default_value = DEFAULT_ANALYTICS_SCHEMA, help_heading = "Pipeline")]
    analytics_schema: String,
    /// Dataset reference, `owner/name`
    #[arg(long, env = "KAGGLE_DATASET", global = true, default_value = DEFAULT_DATASET, help_heading = "Pipeline")]
    dataset: String,
    #[arg(long, env = "DATA_DIR", global = true, default_value = "/opt/airflow/data", help_heading = "Pipeline")]
    data_dir: PathBuf,
    #[arg(long, env = "SECRETS_DIR", global = true, default_value = "/opt/airflow/secrets", help_heading = "Pipeline")]
    secrets_dir: PathBuf,
    #[arg(long, env = "KAGGLE_CONFIG_DIR", global = true, default_value = "/home/airflow/.kaggle", help_heading = "Pipeline")]
    kaggle_config_dir: PathBuf,
}

impl From<Settings> for PipelineConfig {
    fn from(s: Settings) -> Self {
        PipelineConfig {
            connection: ConnectionConfig {
                host: s.pg_host,
                port: s.pg_port,
                user: s.pg_user,
                password: s.pg_password,
            },
            maintenance_db: s.maintenance_db,
            analytics_db: s.analytics_db,
            raw_schema: s.raw_schema,
            analytics_schema: s.analytics_schema,
            dataset: s.dataset,
            data_dir: s.data_dir,
            secrets_dir: s.secrets_dir,
            kaggle_config_dir: s.kaggle_config_dir,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Copy the dataset API token into the CLI config directory
    Credentials,
    /// Create the analytics database and its schemas if missing
    Bootstrap,
    /// Download and unzip the dataset into the raw data directory
    Download,
    /// Stage every CSV file as an all-TEXT raw table
    Load {
        /// Directory holding the CSV files (default: <data-dir>/raw/thelook)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Drop and recreate the KPI views from the current raw tables
    Views,
    /// Print the views that would be built from CSV headers, without a database
    Plan {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Run credentials, bootstrap, download, load and views in order
    Run,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _r = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .try_init();

    let config = PipelineConfig::from(cli.settings);
    let result = execute(cli.command, cli.format, &config);
    if let Err(e) = &result {
        error!("{}", e);
    }
    ExitCode::from(exit_status(&result))
}

fn exit_status(result: &KpiResult<u8>) -> u8 {
    match result {
        Ok(status) => *status,
        Err(_) => EXIT_FATAL,
    }
}

fn execute(command: Commands, format: OutputFormat, config: &PipelineConfig) -> KpiResult<u8> {
    config.validate()?;

    match command {
        Commands::Credentials => {
            let target = credentials::stage_credentials(config)?;
            println!("{}", target.display());
        }
        Commands::Bootstrap => {
            bootstrap::bootstrap(config)?;
            println!("database {} ready", config.analytics_db);
        }
        Commands::Download => {
            for file in download::download_dataset(config)? {
                println!("{}", file.display());
            }
        }
        Commands::Load { dir } => {
            let summary = pipeline::load_step(config, dir.as_deref())?;
            match format {
                OutputFormat::Text => println!("{}", summary.render_text()),
                OutputFormat::Json => println!("{}", summary.to_json()?),
            }
        }
        Commands::Views => {
            let report = pipeline::views_step(config)?;
            return print_views(&report, format);
        }
        Commands::Plan { dir } => {
            let dir = dir.unwrap_or_else(|| config.raw_dir());
            for planned in pipeline::plan_from_csv_dir(config, &dir)? {
                match &planned.action {
                    ViewAction::Created(sql) => {
                        println!("-- {} (from {})", planned.view, planned.variant.unwrap_or_default());
                        println!("{};\n", sql);
                    }
                    ViewAction::Dropped(reason) => {
                        println!("-- {} dropped: {}\n", planned.view, reason);
                    }
                    ViewAction::Failed(e) => {
                        println!("-- {} failed: {}\n", planned.view, e);
                    }
                }
            }
        }
        Commands::Run => {
            let summary = pipeline::run_all(config)?;
            if let OutputFormat::Text = format {
                println!("{}", summary.load.render_text());
            }
            return print_views(&summary.views, format);
        }
    }

    Ok(0)
}

fn print_views(report: &SynthesisReport, format: OutputFormat) -> KpiResult<u8> {
    match format {
        OutputFormat::Text => println!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    for warning in report.warnings() {
        warn!("{}", warning);
    }
    Ok(report.exit_status())
}
