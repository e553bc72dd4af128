//! Input Validation Module
//!
//! Configured names (schemas, databases) and the dataset reference are
//! validated before use. Names that come from source files (CSV file names
//! and headers) are never validated this way; they are normalized and then
//! quoted with [`crate::utils::quote_ident`] instead.
//!
//! ## Usage
//!
//! ```rust
//! use kpi_views::validation::validate_sql_identifier;
//!
//! assert!(validate_sql_identifier("analytics", "analytics_schema").is_ok());
//! assert!(validate_sql_identifier("analytics; DROP", "analytics_schema").is_err());
//! ```

use crate::error::{KpiError, KpiResult};

/// Maximum identifier length accepted by PostgreSQL (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate a configured PostgreSQL identifier (schema or database name)
///
/// Allows: alphanumeric + underscore, not starting with a digit, at most
/// 63 bytes.
///
/// # Examples
///
/// ```rust
/// use kpi_views::validation::validate_sql_identifier;
///
/// assert!(validate_sql_identifier("raw", "raw_schema").is_ok());
/// assert!(validate_sql_identifier("my-db", "analytics_db").is_err());   // dash
/// assert!(validate_sql_identifier("1db", "analytics_db").is_err());     // leading digit
/// ```
pub fn validate_sql_identifier(identifier: &str, param_name: &str) -> KpiResult<()> {
    if identifier.is_empty() {
        return Err(KpiError::InvalidInput {
            parameter: param_name.to_string(),
            value: identifier.to_string(),
            reason: "Identifier cannot be empty".to_string(),
        });
    }

    if !identifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(KpiError::InvalidInput {
            parameter: param_name.to_string(),
            value: sanitize_for_logging(identifier),
            reason: "Identifier must contain only alphanumeric characters and underscores".to_string(),
        });
    }

    if identifier.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(KpiError::InvalidInput {
            parameter: param_name.to_string(),
            value: sanitize_for_logging(identifier),
            reason: "Identifier cannot start with a digit".to_string(),
        });
    }

    if identifier.len() > MAX_IDENTIFIER_LEN {
        return Err(KpiError::InvalidInput {
            parameter: param_name.to_string(),
            value: format!("{}... ({} chars)", &identifier[..20], identifier.len()),
            reason: format!("Identifier too long (max {} characters)", MAX_IDENTIFIER_LEN),
        });
    }

    Ok(())
}

/// Validate a dataset reference of the form `owner/name`
///
/// The reference is passed as an argument to the download tool, so only
/// the characters the dataset hub itself allows are accepted.
pub fn validate_dataset_ref(dataset: &str, param_name: &str) -> KpiResult<()> {
    let mut parts = dataset.split('/');
    let (owner, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) => (owner, name),
        _ => {
            return Err(KpiError::InvalidInput {
                parameter: param_name.to_string(),
                value: sanitize_for_logging(dataset),
                reason: "Dataset reference must look like 'owner/name'".to_string(),
            });
        }
    };

    for segment in [owner, name] {
        let valid = !segment.is_empty()
            && !segment.starts_with('-')
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid {
            return Err(KpiError::InvalidInput {
                parameter: param_name.to_string(),
                value: sanitize_for_logging(dataset),
                reason: format!("Invalid dataset segment '{}'", sanitize_for_logging(segment)),
            });
        }
    }

    Ok(())
}

/// Sanitize string for logging (truncate, escape control chars)
pub fn sanitize_for_logging(s: &str) -> String {
    let max_len = 50;
    let truncated = match s.char_indices().nth(max_len) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    };

    truncated
        .replace('\0', "\\0")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
