use serde::Deserialize;

/// The YAML configuration file.
/// Contains the run settings and the ordered list of URLs to probe.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Batching and pacing for the run.
    #[serde(default)]
    pub run: RunSettings,

    /// Absolute URLs to probe, in order. Truncated to `run.max_urls`.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Where to write the JSON report. Printed to stdout when unset.
    #[serde(default)]
    pub report_file: Option<String>,
}

/// Unvalidated run settings as written in the config file.
/// See `RunConfig` for the checked form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunSettings {
    /// Number of URLs probed per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between consecutive batches, in seconds.
    #[serde(default = "default_batch_delay_seconds")]
    pub batch_delay_seconds: f64,

    /// Upper bound on in-flight probes within a batch.
    /// Defaults to the batch size.
    #[serde(default)]
    pub max_concurrency_per_batch: Option<usize>,

    /// Only the first `max_urls` URLs are probed. `~` disables the limit.
    #[serde(default = "default_max_urls")]
    pub max_urls: Option<usize>,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: f64,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_seconds: default_batch_delay_seconds(),
            max_concurrency_per_batch: None,
            max_urls: default_max_urls(),
            probe_timeout_seconds: default_probe_timeout_seconds(),
        }
    }
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_delay_seconds() -> f64 {
    1.0
}

fn default_max_urls() -> Option<usize> {
    Some(100)
}

fn default_probe_timeout_seconds() -> f64 {
    15.0
}
