use std::fmt;

pub mod testing;

/// Main error type for the KPI pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum KpiError {
    // ============ Prerequisite Errors (58xxx) ============
    /// A required external asset (credential file, CLI tool) is absent
    MissingPrerequisite {
        asset: String,
        hint: String,
    },

    // ============ Synthesis Errors (55xxx) ============
    /// No variant of a view has its preconditions met
    NoSatisfiableView {
        view: String,
        reason: String,
    },

    // ============ Store Errors (XX000 / server SQLSTATE) ============
    /// The store rejected a statement
    StoreExecutionError {
        context: String,
        sql: String,
        sqlstate: Option<String>,
        error: String,
    },

    /// Connecting to the store failed
    ConnectionFailed {
        target: String,
        error: String,
    },

    /// Reading the information catalog failed
    CatalogError {
        operation: String,
        error: String,
    },

    // ============ Input Errors (22xxx / 42xxx) ============
    /// Invalid configuration or externally supplied value
    InvalidInput {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Configuration error (unusable combination of settings)
    ConfigError {
        setting: String,
        value: String,
        reason: String,
    },

    // ============ Dataset Errors ============
    /// Dataset download command failed
    DownloadFailed {
        command: String,
        reason: String,
    },

    /// No CSV files were found where the dataset should be
    NoSourceFiles {
        dir: String,
    },

    /// A CSV file could not be read or has an unusable header
    CsvError {
        path: String,
        reason: String,
    },

    // ============ I/O and System Errors (XX000) ============
    /// Filesystem operation failed
    IoError {
        operation: String,
        error: String,
    },

    /// Serialization of a report failed
    SerializationError {
        message: String,
    },

    /// Internal error (bug in the view catalog or the crate)
    InternalError {
        message: String,
        file: &'static str,
        line: u32,
    },
}

impl KpiError {
    /// Get a PostgreSQL-style SQLSTATE code for this error
    ///
    /// Store errors report the server's own code when it sent one.
    pub fn sqlstate(&self) -> &str {
        use KpiError::*;
        match self {
            MissingPrerequisite { .. } => "58P01", // Undefined file
            NoSatisfiableView { .. } => "55000", // Object not in prerequisite state

            StoreExecutionError { sqlstate: Some(code), .. } => code.as_str(),
            StoreExecutionError { sqlstate: None, .. } => "XX000",
            ConnectionFailed { .. } => "08006", // Connection failure
            CatalogError { .. } => "42P01", // Undefined table

            InvalidInput { .. } => "22023", // Invalid parameter value
            ConfigError { .. } => "F0000", // Config file error

            DownloadFailed { .. } => "58030", // I/O error
            NoSourceFiles { .. } => "58P01",
            CsvError { .. } => "22P04", // Bad copy file format

            IoError { .. } => "58030",
            SerializationError { .. } => "XX000",
            InternalError { .. } => "XX000",
        }
    }

    /// Whether this error aborts the whole run
    ///
    /// `NoSatisfiableView` only drops the affected view; everything else
    /// stops the pipeline when it reaches the top level.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, KpiError::NoSatisfiableView { .. })
    }

    /// Create internal error with file/line info
    pub fn internal(message: String, file: &'static str, line: u32) -> Self {
        KpiError::InternalError { message, file, line }
    }

    /// Wrap a `postgres` error raised while executing `sql`
    pub fn store(context: impl Into<String>, sql: impl Into<String>, e: &postgres::Error) -> Self {
        KpiError::StoreExecutionError {
            context: context.into(),
            sql: sql.into(),
            sqlstate: e.code().map(|c| c.code().to_string()),
            error: e
                .as_db_error()
                .map_or_else(|| e.to_string(), |db| db.message().to_string()),
        }
    }
}

fn truncate_sql(sql: &str) -> &str {
    match sql.char_indices().nth(200) {
        Some((idx, _)) => &sql[..idx],
        None => sql,
    }
}

impl fmt::Display for KpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KpiError::*;
        match self {
            MissingPrerequisite { asset, hint } => {
                write!(f, "Missing prerequisite '{}'. {}", asset, hint)
            }
            NoSatisfiableView { view, reason } => {
                write!(f, "View '{}' cannot be built: {}", view, reason)
            }
            StoreExecutionError { context, sql, sqlstate, error } => {
                write!(f, "{} failed: {}", context, error)?;
                if let Some(code) = sqlstate {
                    write!(f, " (SQLSTATE {})", code)?;
                }
                write!(f, "\nSQL: {}", truncate_sql(sql))
            }
            ConnectionFailed { target, error } => {
                write!(f, "Could not connect to {}: {}", target, error)
            }
            CatalogError { operation, error } => {
                write!(f, "Catalog operation '{}' failed: {}", operation, error)
            }
            InvalidInput { parameter, value, reason } => {
                write!(f, "Invalid value for '{}' ({}): {}", parameter, value, reason)
            }
            ConfigError { setting, value, reason } => {
                write!(f, "Configuration error for '{}': {} (value: {})", setting, reason, value)
            }
            DownloadFailed { command, reason } => {
                write!(f, "Dataset download failed: {}\nCommand: {}", reason, command)
            }
            NoSourceFiles { dir } => {
                write!(f, "No CSV files found in {}", dir)
            }
            CsvError { path, reason } => {
                write!(f, "CSV file '{}': {}", path, reason)
            }
            IoError { operation, error } => {
                write!(f, "I/O error during {}: {}", operation, error)
            }
            SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
            InternalError { message, file, line } => {
                write!(f, "Internal error at {}:{}: {}\nPlease report this bug.",
                       file, line, message)
            }
        }
    }
}

impl std::error::Error for KpiError {}

/// Result type for pipeline operations
pub type KpiResult<T> = Result<T, KpiError>;

/// Convert std::io::Error to KpiError
impl From<std::io::Error> for KpiError {
    fn from(e: std::io::Error) -> Self {
        KpiError::IoError {
            operation: "unknown".to_string(),
            error: e.to_string(),
        }
    }
}

/// Convert csv::Error to KpiError
impl From<csv::Error> for KpiError {
    fn from(e: csv::Error) -> Self {
        KpiError::CsvError {
            path: "unknown".to_string(),
            reason: e.to_string(),
        }
    }
}

/// Convert serde_json::Error to KpiError
impl From<serde_json::Error> for KpiError {
    fn from(e: serde_json::Error) -> Self {
        KpiError::SerializationError {
            message: format!("JSON serialization error: {}", e),
        }
    }
}

/// Helper macro for creating internal errors with automatic file/line
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::KpiError::internal($msg.to_string(), file!(), line!())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::KpiError::internal(format!($fmt, $($arg)*), file!(), line!())
    };
}
