use std::ops::RangeInclusive;
use std::time::Duration;

use super::model::RunSettings;
use crate::error::ConfigError;

pub const BATCH_SIZE_RANGE: RangeInclusive<usize> = 1..=100;
pub const MAX_BATCH_DELAY: Duration = Duration::from_secs(10);

/// Validated, immutable settings for one probing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub max_concurrency_per_batch: usize,
    pub max_urls: Option<usize>,
    pub probe_timeout: Duration,
}

impl RunConfig {
    pub fn from_settings(settings: &RunSettings) -> Result<Self, ConfigError> {
        if !BATCH_SIZE_RANGE.contains(&settings.batch_size) {
            return Err(ConfigError::BatchSize {
                value: settings.batch_size,
                min: *BATCH_SIZE_RANGE.start(),
                max: *BATCH_SIZE_RANGE.end(),
            });
        }

        let batch_delay = Duration::try_from_secs_f64(settings.batch_delay_seconds)
            .ok()
            .filter(|delay| *delay <= MAX_BATCH_DELAY)
            .ok_or(ConfigError::BatchDelay {
                value: settings.batch_delay_seconds,
                max: MAX_BATCH_DELAY,
            })?;

        // More permits than URLs in a batch would never be used.
        let max_concurrency_per_batch = match settings.max_concurrency_per_batch {
            Some(0) => return Err(ConfigError::Concurrency),
            Some(limit) => limit.min(settings.batch_size),
            None => settings.batch_size,
        };

        if settings.max_urls == Some(0) {
            return Err(ConfigError::MaxUrls);
        }

        let probe_timeout = Duration::try_from_secs_f64(settings.probe_timeout_seconds)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .ok_or(ConfigError::ProbeTimeout(settings.probe_timeout_seconds))?;

        Ok(Self {
            batch_size: settings.batch_size,
            batch_delay,
            max_concurrency_per_batch,
            max_urls: settings.max_urls,
            probe_timeout,
        })
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            batch_delay: Duration::from_secs(1),
            max_concurrency_per_batch: 3,
            max_urls: Some(100),
            probe_timeout: Duration::from_secs(15),
        }
    }
}
