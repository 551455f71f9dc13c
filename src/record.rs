use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{self, CacheVerdict};
use crate::http_probe::prelude::*;

/// The cache diagnostics kept from each response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHeaders {
    pub x_cache: Option<String>,
    pub x_cache_remote: Option<String>,
    pub x_check_cacheable: Option<String>,
    pub x_cache_key: Option<String>,
    pub x_true_cache_key: Option<String>,
    pub x_served_by: Option<String>,
    pub x_timer: Option<String>,
    pub age: Option<String>,
    pub cache_control: Option<String>,
}

impl CacheHeaders {
    pub fn from_headers(headers: &HeaderSet) -> Self {
        let pick = |name: &str| headers.get(name).map(str::to_string);
        Self {
            x_cache: pick(classify::X_CACHE),
            x_cache_remote: pick(classify::X_CACHE_REMOTE),
            x_check_cacheable: pick(classify::X_CHECK_CACHEABLE),
            x_cache_key: pick(classify::X_CACHE_KEY),
            x_true_cache_key: pick(classify::X_TRUE_CACHE_KEY),
            x_served_by: pick(classify::X_SERVED_BY),
            x_timer: pick(classify::X_TIMER),
            age: pick(classify::AGE),
            cache_control: pick(classify::CACHE_CONTROL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub verdict: CacheVerdict,
    pub status_code: Option<u16>,
    pub headers: CacheHeaders,
    /// Client-side wall-clock time for the full request.
    #[serde(with = "millis")]
    pub elapsed: Duration,
    /// Edge-side processing time reported in `X-Timer`.
    pub response_time_ms: Option<u64>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Supplement::is_empty")]
    pub supplement: Supplement,
}

impl UrlRecord {
    /// Classifies `result` and keeps what the report needs from it.
    pub fn from_probe(result: ProbeResult) -> Self {
        let verdict = classify::classify(&result);
        let response_time_ms = classify::edge_elapsed_ms(&result);
        let headers = CacheHeaders::from_headers(&result.headers);

        Self {
            url: result.url,
            verdict,
            status_code: result.status_code,
            headers,
            elapsed: result.elapsed,
            response_time_ms,
            error: result.error,
            supplement: result.supplement,
        }
    }

    /// Record for a URL whose probe never produced a result.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self::from_probe(ProbeResult::failure(url, error, Duration::ZERO))
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(ms / 1000.0).map_err(serde::de::Error::custom)
    }
}
