use std::fs;
use std::path::PathBuf;
use std::process::Command;

use log::info;

use crate::config::PipelineConfig;
use crate::error::{KpiError, KpiResult};
use crate::load::list_csv_files;
use crate::validation::validate_dataset_ref;

/// Name of the dataset download CLI on `PATH`
pub const DOWNLOAD_TOOL: &str = "kaggle";

/// Arguments that download and unzip `dataset` into `dir`
pub fn download_args(dataset: &str, dir: &str) -> Vec<String> {
    ["datasets", "download", "-d", dataset, "-p", dir, "--unzip", "--force"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Download the dataset into the raw data directory and list its CSV files.
///
/// # Errors
/// - `MissingPrerequisite` when the download CLI cannot be started
/// - `DownloadFailed` when it exits unsuccessfully
/// - `NoSourceFiles` when no CSV file was unpacked
pub fn download_dataset(config: &PipelineConfig) -> KpiResult<Vec<PathBuf>> {
    validate_dataset_ref(&config.dataset, "dataset")?;

    let dir = config.raw_dir();
    fs::create_dir_all(&dir).map_err(|e| KpiError::IoError {
        operation: format!("create {}", dir.display()),
        error: e.to_string(),
    })?;

    let args = download_args(&config.dataset, &dir.display().to_string());
    let command_line = format!("{} {}", DOWNLOAD_TOOL, args.join(" "));
    info!("Running {}", command_line);

    let output = Command::new(DOWNLOAD_TOOL)
        .args(&args)
        .output()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KpiError::MissingPrerequisite {
                asset: DOWNLOAD_TOOL.to_string(),
                hint: "Install the Kaggle CLI (pip install kaggle) and put it on PATH.".to_string(),
            },
            _ => KpiError::DownloadFailed {
                command: command_line.clone(),
                reason: e.to_string(),
            },
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KpiError::DownloadFailed {
            command: command_line,
            reason: format!("{}: {}", output.status, stderr.trim()),
        });
    }

    let files = list_csv_files(&dir)?;
    info!("Downloaded {} CSV file(s) into {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::assert_error_sqlstate;

    #[test]
    fn test_download_args() {
        assert_eq!(
            download_args("owner/data", "/tmp/raw").join(" "),
            "datasets download -d owner/data -p /tmp/raw --unzip --force"
        );
    }

    #[test]
    fn test_invalid_dataset_rejected_before_running() {
        let config = PipelineConfig {
            dataset: "owner/--force".to_string(),
            data_dir: PathBuf::from("/nonexistent/never-created"),
            ..PipelineConfig::default()
        };
        assert_error_sqlstate(download_dataset(&config), "22023");
        assert!(!config.raw_dir().exists());
    }
}
