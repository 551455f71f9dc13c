use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};

use super::prelude::*;
use super::report;

/// Chrome/Edge on macOS. Bot protection in front of most CDNs rejects
/// obviously scripted user agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36 Edg/142.0.0.0";

/// Asks the Akamai edge to echo its cache diagnostics back as
/// `X-Cache`, `X-Cache-Remote`, `X-Check-Cacheable`, `X-Cache-Key` and
/// `X-True-Cache-Key` response headers.
pub const AKAMAI_PRAGMA: &str = "akamai-x-cache-on, akamai-x-cache-remote-on, akamai-x-check-cacheable, akamai-x-get-cache-key, akamai-x-get-true-cache-key";

const BROWSER_HEADERS: &[(&str, &str)] = &[
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
    ),
    ("accept-language", "en-GB,en;q=0.9,en-US;q=0.8,en-AU;q=0.7"),
    ("cache-control", "no-cache"),
    ("priority", "u=0, i"),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"142\", \"Microsoft Edge\";v=\"142\", \"Not_A Brand\";v=\"99\"",
    ),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"macOS\""),
    ("sec-fetch-dest", "document"),
    ("sec-fetch-mode", "navigate"),
    ("sec-fetch-site", "none"),
    ("sec-fetch-user", "?1"),
    ("upgrade-insecure-requests", "1"),
    ("pragma", AKAMAI_PRAGMA),
];

/// Issues a single request for a single URL.
///
/// Implementations must always hand back a `ProbeResult`: transport
/// failures are recorded in `ProbeResult::error`, never returned as `Err`.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, request: ProbeRequest) -> ProbeResult;
}

/// Hook for content heuristics (platform fingerprinting and the like) that
/// need the response body. Whatever it returns is passed through to the
/// final record as-is.
pub trait ContentInspector: Send + Sync {
    fn inspect(&self, url: &str, headers: &HeaderSet, body: &[u8]) -> Supplement;
}

/// Client builder preloaded with the browser headers and the debug pragma.
/// `accept-encoding` is left to reqwest, which advertises and decodes
/// gzip, deflate, brotli and zstd.
pub fn client_builder() -> ClientBuilder {
    let mut headers = HeaderMap::new();
    for (name, value) in BROWSER_HEADERS {
        headers.insert(
            HeaderName::from_static(*name),
            HeaderValue::from_static(*value),
        );
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
}

pub fn build_client() -> Result<Client, reqwest::Error> {
    client_builder().build()
}

#[derive(Clone)]
pub struct HttpProber {
    client: Client,
    inspector: Option<Arc<dyn ContentInspector>>,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            inspector: None,
        }
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn ContentInspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, request: ProbeRequest) -> ProbeResult {
        let ProbeRequest { url, timeout } = request;

        // Timed through to the last body byte: the classifier's timing
        // heuristic needs the full round trip, TLS included.
        let start = Instant::now();
        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                let elapsed = start.elapsed();
                tracing::debug!(url = %url, error = %e, "request failed");
                return ProbeResult::failure(url, report(&e), elapsed);
            }
        };

        let status = response.status().as_u16();
        let headers = HeaderSet::from(response.headers());
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let elapsed = start.elapsed();
                tracing::debug!(url = %url, error = %e, "failed to read body");
                return ProbeResult::failure(url, report(&e), elapsed);
            }
        };
        let elapsed = start.elapsed();

        let supplement = match &self.inspector {
            Some(inspector) => inspector.inspect(&url, &headers, &body),
            None => Supplement::new(),
        };

        ProbeResult::response(url, status, headers, elapsed).with_supplement(supplement)
    }
}
