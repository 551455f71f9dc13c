use async_trait::async_trait;
use url::Url;

use crate::error::{ConfigError, RunError};

/// Supplies the ordered list of URLs for a run.
///
/// A sitemap reader would implement this; the shipped implementation takes
/// the list straight from the config file. Fetch or parse failures of a
/// remote source are reported as `RunError::Source`.
#[async_trait]
pub trait UrlSource: Send + Sync {
    async fn urls(&self) -> Result<Vec<String>, RunError>;
}

pub struct ConfiguredUrls {
    urls: Vec<String>,
}

impl ConfiguredUrls {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }
}

#[async_trait]
impl UrlSource for ConfiguredUrls {
    async fn urls(&self) -> Result<Vec<String>, RunError> {
        if self.urls.is_empty() {
            return Err(ConfigError::NoUrls.into());
        }
        let urls = self
            .urls
            .iter()
            .map(|raw| validate_url(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(urls)
    }
}

/// Accepts absolute http(s) URLs with a host. Returns the trimmed input,
/// not the normalised form, so records match what the caller supplied.
pub fn validate_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source: Some(source),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            source: None,
        });
    }
    Ok(trimmed.to_string())
}
