//! Cache-status classification.
//!
//! A response is classified by walking [`RULES`] in order and taking the
//! first verdict a rule produces. Debug headers returned by the edge are
//! authoritative; when bot protection strips them, the edge's own timing
//! header is used as a statistical stand-in. Responses that fit neither are
//! reported as [`CacheVerdict::Unknown`] rather than guessed.

pub mod timer;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http_probe::result::ProbeResult;
use timer::EdgeTimer;

pub const X_CACHE: &str = "X-Cache";
pub const X_CACHE_REMOTE: &str = "X-Cache-Remote";
pub const X_CHECK_CACHEABLE: &str = "X-Check-Cacheable";
pub const X_CACHE_KEY: &str = "X-Cache-Key";
pub const X_TRUE_CACHE_KEY: &str = "X-True-Cache-Key";
pub const X_SERVED_BY: &str = "X-Served-By";
pub const X_TIMER: &str = "X-Timer";
pub const AGE: &str = "Age";
pub const CACHE_CONTROL: &str = "Cache-Control";

/// Edge-side elapsed time below which a response is inferred to be a hit.
pub const TIMER_HIT_THRESHOLD_MS: u64 = 100;
/// Edge-side elapsed time above which a response is inferred to be a miss.
pub const TIMER_MISS_THRESHOLD_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheVerdict {
    HitConfirmed,
    HitInferred,
    MissConfirmed,
    MissInferred,
    RefreshHit,
    RefreshMiss,
    NotCacheable,
    Unknown,
    Error,
}

impl CacheVerdict {
    pub const ALL: [CacheVerdict; 9] = [
        CacheVerdict::HitConfirmed,
        CacheVerdict::HitInferred,
        CacheVerdict::MissConfirmed,
        CacheVerdict::MissInferred,
        CacheVerdict::RefreshHit,
        CacheVerdict::RefreshMiss,
        CacheVerdict::NotCacheable,
        CacheVerdict::Unknown,
        CacheVerdict::Error,
    ];

    pub fn is_hit(self) -> bool {
        matches!(
            self,
            CacheVerdict::HitConfirmed | CacheVerdict::HitInferred | CacheVerdict::RefreshHit
        )
    }

    pub fn is_miss(self) -> bool {
        matches!(
            self,
            CacheVerdict::MissConfirmed | CacheVerdict::MissInferred | CacheVerdict::RefreshMiss
        )
    }

    /// Derived from an explicit debug header returned by the edge.
    pub fn is_confirmed(self) -> bool {
        matches!(
            self,
            CacheVerdict::HitConfirmed
                | CacheVerdict::MissConfirmed
                | CacheVerdict::RefreshHit
                | CacheVerdict::RefreshMiss
                | CacheVerdict::NotCacheable
        )
    }

    /// Derived from response timing only.
    pub fn is_inferred(self) -> bool {
        matches!(self, CacheVerdict::HitInferred | CacheVerdict::MissInferred)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheVerdict::HitConfirmed => "HIT_CONFIRMED",
            CacheVerdict::HitInferred => "HIT_INFERRED",
            CacheVerdict::MissConfirmed => "MISS_CONFIRMED",
            CacheVerdict::MissInferred => "MISS_INFERRED",
            CacheVerdict::RefreshHit => "REFRESH_HIT",
            CacheVerdict::RefreshMiss => "REFRESH_MISS",
            CacheVerdict::NotCacheable => "NOT_CACHEABLE",
            CacheVerdict::Unknown => "UNKNOWN",
            CacheVerdict::Error => "ERROR",
        }
    }
}

impl fmt::Display for CacheVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the classification chain.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&ProbeResult) -> Option<CacheVerdict>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Evaluated top to bottom; the first rule returning a verdict wins.
pub const RULES: &[Rule] = &[
    Rule {
        name: "transport-error",
        apply: transport_error,
    },
    Rule {
        name: "not-cacheable",
        apply: not_cacheable,
    },
    Rule {
        name: "cache-status",
        apply: cache_status,
    },
    Rule {
        name: "age",
        apply: positive_age,
    },
    Rule {
        name: "edge-timer",
        apply: edge_timing,
    },
];

pub fn classify(result: &ProbeResult) -> CacheVerdict {
    RULES
        .iter()
        .find_map(|rule| (rule.apply)(result))
        .unwrap_or(CacheVerdict::Unknown)
}

/// The rule that decided `result`, or `None` when it fell through to `Unknown`.
pub fn matching_rule(result: &ProbeResult) -> Option<&'static Rule> {
    RULES.iter().find(|rule| (rule.apply)(result).is_some())
}

/// `VE` milliseconds from a well-formed `X-Timer` header.
pub fn edge_elapsed_ms(result: &ProbeResult) -> Option<u64> {
    result
        .headers
        .get(X_TIMER)
        .and_then(EdgeTimer::parse)
        .map(|timer| timer.elapsed_ms)
}

fn transport_error(result: &ProbeResult) -> Option<CacheVerdict> {
    result.error.as_ref().map(|_| CacheVerdict::Error)
}

// Disagreeing X-Cache values are ignored when the edge says the object is not cacheable.
fn not_cacheable(result: &ProbeResult) -> Option<CacheVerdict> {
    result
        .headers
        .get(X_CHECK_CACHEABLE)
        .filter(|value| value.eq_ignore_ascii_case("NO"))
        .map(|_| CacheVerdict::NotCacheable)
}

fn cache_status(result: &ProbeResult) -> Option<CacheVerdict> {
    // e.g. "TCP_MEM_HIT from a23-45-67-89.deploy.akamaitechnologies.com (AkamaiGHost/22.3.1-...)"
    let token = result.headers.get(X_CACHE)?.split_whitespace().next()?;
    match token.to_ascii_uppercase().as_str() {
        "TCP_HIT" | "TCP_MEM_HIT" => Some(CacheVerdict::HitConfirmed),
        "TCP_MISS" => Some(CacheVerdict::MissConfirmed),
        "TCP_REFRESH_HIT" => Some(CacheVerdict::RefreshHit),
        "TCP_REFRESH_MISS" => Some(CacheVerdict::RefreshMiss),
        _ => None,
    }
}

fn positive_age(result: &ProbeResult) -> Option<CacheVerdict> {
    let age = result.headers.get(AGE)?.parse::<u64>().ok()?;
    (age > 0).then_some(CacheVerdict::HitConfirmed)
}

fn edge_timing(result: &ProbeResult) -> Option<CacheVerdict> {
    let elapsed_ms = edge_elapsed_ms(result)?;
    Some(if elapsed_ms < TIMER_HIT_THRESHOLD_MS {
        CacheVerdict::HitInferred
    } else if elapsed_ms > TIMER_MISS_THRESHOLD_MS {
        CacheVerdict::MissInferred
    } else {
        CacheVerdict::Unknown
    })
}
