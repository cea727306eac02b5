use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// stdout is reserved for the JSON verdict, so everything logs to stderr.
pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    // Priority: --config > ./config/pageflow.yaml > <config dir>/pageflow/config.yaml
    let config_path = match config_path {
        Some(path) => Some(path.clone()),
        None => {
            let local_config = PathBuf::from("config/pageflow.yaml");
            if local_config.exists() {
                Some(local_config)
            } else {
                dirs::config_dir().map(|dir| dir.join("pageflow").join("config.yaml"))
            }
        }
    };

    let Some(path) = config_path.filter(|path| path.exists()) else {
        warn!("Config file not found, using defaults");
        return Ok(LoadedConfig {
            config: Config::default(),
            path: None,
        });
    };

    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

    info!("Loaded configuration from: {}", path.display());
    Ok(LoadedConfig {
        config,
        path: Some(path),
    })
}
