use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::model::{FileConfig, RunSettings};
use super::run_config::RunConfig;
use crate::error::ConfigError;

pub struct AppConfig {
    pub run: RunConfig,
    pub urls: Vec<String>,
    pub report_file: Option<PathBuf>,
}

/// Load the application configuration from a YAML file and environment variables.
/// This function loads `.env` if present, reads the configuration file specified by the
/// `CONFIG_FILE` environment variable (default `config.yml`), and overrides individual run
/// settings with `BATCH_SIZE`, `BATCH_DELAY_SECONDS`, `MAX_CONCURRENCY`, `MAX_URLS`,
/// `PROBE_TIMEOUT_SECONDS` and `REPORT_FILE`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_file_location =
        env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string());
    let config_str =
        std::fs::read_to_string(&config_file_location).map_err(|source| ConfigError::Read {
            path: PathBuf::from(&config_file_location),
            source,
        })?;

    tracing::info!(path = %config_file_location, "loaded config file");

    build_config(&config_str, |name| env::var(name).ok())
}

/// Parse `yaml`, apply overrides from `lookup` and validate the result.
pub fn build_config(
    yaml: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let mut file: FileConfig = serde_yaml::from_str(yaml)?;
    apply_env_overrides(&mut file.run, &lookup)?;

    let report_file = lookup("REPORT_FILE")
        .or(file.report_file)
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from);

    Ok(AppConfig {
        run: RunConfig::from_settings(&file.run)?,
        urls: file.urls,
        report_file,
    })
}

fn apply_env_overrides(
    settings: &mut RunSettings,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(value) = parse_env(lookup, "BATCH_SIZE")? {
        settings.batch_size = value;
    }
    if let Some(value) = parse_env(lookup, "BATCH_DELAY_SECONDS")? {
        settings.batch_delay_seconds = value;
    }
    if let Some(value) = parse_env(lookup, "MAX_CONCURRENCY")? {
        settings.max_concurrency_per_batch = Some(value);
    }
    if let Some(value) = parse_env(lookup, "PROBE_TIMEOUT_SECONDS")? {
        settings.probe_timeout_seconds = value;
    }
    if let Some(raw) = lookup("MAX_URLS") {
        let raw = raw.trim();
        settings.max_urls = if raw.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(raw.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "MAX_URLS".to_string(),
                value: raw.to_string(),
            })?)
        };
    }
    Ok(())
}

fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                name: name.to_string(),
                value: raw,
            }),
    }
}
