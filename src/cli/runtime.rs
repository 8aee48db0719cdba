use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::FlowConfig;

use super::output::LogFormat;

/// Loads `.env` from the working directory. Variables already set in the
/// process win.
pub fn load_local_env() {
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded environment overrides"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(%err, "failed to read .env"),
    }
}

/// Installs the global subscriber. The returned guard flushes the log file
/// and must live until the process exits.
pub fn init_logging(
    level: &str,
    debug: bool,
    format: LogFormat,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()))
    };

    let stderr = match format {
        LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("--log-file needs a file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr.with_filter(filter()))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: FlowConfig,
    pub path: PathBuf,
}

/// `--config`, else `./config/config.yaml`, else the user config directory.
pub fn config_path(explicit: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path.clone();
    }
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return local_config;
    }
    match dirs::config_dir() {
        Some(mut path) => {
            path.push("ticketpilot");
            path.push("config.yaml");
            path
        }
        None => local_config,
    }
}

pub async fn load_config(explicit: Option<&PathBuf>) -> Result<LoadedConfig> {
    let config_path = config_path(explicit);

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config = FlowConfig::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: FlowConfig::default(),
            path: config_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn explicit_config_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "target:\n  event_id: ABC-1\ntiming:\n  poll_interval_ms: 500\n",
        )
        .unwrap();

        let loaded = assert_ok!(load_config(Some(&path)).await);

        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.target.event_id, "ABC-1");
        assert_eq!(loaded.config.timing.poll_interval_ms, 500);
        assert_eq!(loaded.config.timing.max_poll_ms, 3_600_000);
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.config, FlowConfig::default());
    }

    #[tokio::test]
    async fn broken_yaml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "timing: [not, a, map]\n").unwrap();

        let err = load_config(Some(&path)).await.unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
