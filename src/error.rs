use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Problems that stop a run before the first request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("batch size must be between {min} and {max}, got {value}")]
    BatchSize { value: usize, min: usize, max: usize },

    #[error("batch delay must be between 0 and {max:?}, got {value}s")]
    BatchDelay { value: f64, max: Duration },

    #[error("max concurrency per batch must be at least 1")]
    Concurrency,

    #[error("max urls must be a positive number when set")]
    MaxUrls,

    #[error("probe timeout must be a positive number of seconds, got {0}s")]
    ProbeTimeout(f64),

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: String, value: String },

    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in config file")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{url:?} is not an absolute http(s) URL")]
    InvalidUrl {
        url: String,
        #[source]
        source: Option<url::ParseError>,
    },

    #[error("no URLs to probe")]
    NoUrls,
}

/// Failures that abort a whole run, as opposed to a single URL.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to collect URLs")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),

    #[error("failed to write report")]
    Report(#[from] std::io::Error),

    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
}
