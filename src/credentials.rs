use std::fs;
use std::path::PathBuf;

use log::info;

use crate::config::PipelineConfig;
use crate::error::{KpiError, KpiResult};

/// Copy the dataset API token to where the download CLI expects it.
///
/// The secrets file is usually a read-only mount, so its bytes are copied
/// rather than the file itself. On Unix the copy is restricted to `0600`;
/// the download CLI refuses tokens readable by others.
///
/// # Errors
/// `MissingPrerequisite` when the secrets file does not exist. This is
/// fatal for the whole run.
pub fn stage_credentials(config: &PipelineConfig) -> KpiResult<PathBuf> {
    let source = config.credentials_source();
    if !source.is_file() {
        return Err(KpiError::MissingPrerequisite {
            asset: source.display().to_string(),
            hint: "Put your Kaggle API token at secrets/kaggle.json (do not commit it).".to_string(),
        });
    }

    fs::create_dir_all(&config.kaggle_config_dir).map_err(|e| KpiError::IoError {
        operation: format!("create {}", config.kaggle_config_dir.display()),
        error: e.to_string(),
    })?;

    let target = config.credentials_target();
    let token = fs::read(&source).map_err(|e| KpiError::IoError {
        operation: format!("read {}", source.display()),
        error: e.to_string(),
    })?;
    fs::write(&target, token).map_err(|e| KpiError::IoError {
        operation: format!("write {}", target.display()),
        error: e.to_string(),
    })?;
    restrict_permissions(&target)?;

    info!("Staged dataset credentials at {}", target.display());
    Ok(target)
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> KpiResult<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| KpiError::IoError {
        operation: format!("chmod 600 {}", path.display()),
        error: e.to_string(),
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> KpiResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::assert_error_sqlstate;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PipelineConfig {
        PipelineConfig {
            secrets_dir: dir.path().join("secrets"),
            kaggle_config_dir: dir.path().join("home").join(".kaggle"),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_missing_secrets_is_fatal_prerequisite() {
        let dir = TempDir::new().unwrap();
        let result = stage_credentials(&config_in(&dir));
        assert_error_sqlstate(result, "58P01");
    }

    #[test]
    fn test_stage_copies_token() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.secrets_dir).unwrap();
        fs::write(config.credentials_source(), br#"{"username":"u","key":"k"}"#).unwrap();

        let target = stage_credentials(&config).unwrap();
        assert_eq!(target, config.credentials_target());
        assert_eq!(fs::read_to_string(&target).unwrap(), r#"{"username":"u","key":"k"}"#);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&target).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_stage_overwrites_previous_token() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.secrets_dir).unwrap();
        fs::create_dir_all(&config.kaggle_config_dir).unwrap();
        fs::write(config.credentials_target(), "old").unwrap();
        fs::write(config.credentials_source(), "new").unwrap();

        stage_credentials(&config).unwrap();
        assert_eq!(fs::read_to_string(config.credentials_target()).unwrap(), "new");
    }
}
