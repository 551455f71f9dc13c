use serde::{Deserialize, Serialize};

use crate::classify::CacheVerdict;
use crate::record::UrlRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_urls: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub confirmed_hits: usize,
    pub inferred_hits: usize,
    pub confirmed_misses: usize,
    pub inferred_misses: usize,
    pub not_cacheable: usize,
    pub errors: usize,
    pub unknown: usize,
    /// Percentage of cacheable URLs served from the edge, in `[0, 100]`.
    pub cache_hit_ratio: f64,
}

impl Summary {
    /// URLs that count towards the hit ratio.
    pub fn cacheable_total(&self) -> usize {
        self.total_urls
            .saturating_sub(self.not_cacheable)
            .saturating_sub(self.errors)
    }
}

pub fn summarize(records: &[UrlRecord]) -> Summary {
    let mut summary = Summary {
        total_urls: records.len(),
        ..Summary::default()
    };

    for record in records {
        match record.verdict {
            CacheVerdict::HitConfirmed | CacheVerdict::RefreshHit => summary.confirmed_hits += 1,
            CacheVerdict::HitInferred => summary.inferred_hits += 1,
            CacheVerdict::MissConfirmed | CacheVerdict::RefreshMiss => {
                summary.confirmed_misses += 1
            }
            CacheVerdict::MissInferred => summary.inferred_misses += 1,
            CacheVerdict::NotCacheable => summary.not_cacheable += 1,
            CacheVerdict::Error => summary.errors += 1,
            CacheVerdict::Unknown => summary.unknown += 1,
        }
    }

    summary.cache_hits = summary.confirmed_hits + summary.inferred_hits;
    summary.cache_misses = summary.confirmed_misses + summary.inferred_misses;

    let cacheable_total = summary.cacheable_total();
    summary.cache_hit_ratio = if cacheable_total > 0 {
        summary.cache_hits as f64 / cacheable_total as f64 * 100.0
    } else {
        0.0
    };

    summary
}
