use std::collections::BTreeMap;
use std::time::Duration;

use super::headers::HeaderSet;

/// Opaque per-URL data attached by a `ContentInspector`. Carried through to
/// the record untouched; nothing in the probing core reads it.
pub type Supplement = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: String,
    pub timeout: Duration,
}

impl ProbeRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

/// Raw outcome of a single GET.
/// Either `status_code` and `headers` are populated, or `error` is.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub url: String,
    pub status_code: Option<u16>,
    pub headers: HeaderSet,
    pub elapsed: Duration,
    pub error: Option<String>,
    pub supplement: Supplement,
}

impl ProbeResult {
    pub fn response(url: impl Into<String>, status_code: u16, headers: HeaderSet, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            status_code: Some(status_code),
            headers,
            elapsed,
            error: None,
            supplement: Supplement::new(),
        }
    }

    pub fn failure(url: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            status_code: None,
            headers: HeaderSet::new(),
            elapsed,
            error: Some(error.into()),
            supplement: Supplement::new(),
        }
    }

    pub fn with_supplement(mut self, supplement: Supplement) -> Self {
        self.supplement = supplement;
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
