//! Batched, paced probing.
//!
//! URLs are probed in consecutive fixed-size batches. All probes of a batch
//! run as one task group bounded by a semaphore, and the group is fully
//! joined before the inter-batch pause starts. Records are collected in
//! completion order, so order within a batch is not deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::classify;
use crate::config::RunConfig;
use crate::http_probe::prelude::*;
use crate::record::UrlRecord;

/// Outcome of a run. Always carries every record collected, even when the
/// run was cancelled part way.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    pub records: Vec<UrlRecord>,
    pub batches_planned: usize,
    pub batches_completed: usize,
    pub cancelled: bool,
}

/// Applies `max_urls` and splits what is left into batches, preserving input order.
pub fn plan_batches<'a>(urls: &'a [String], config: &RunConfig) -> Vec<&'a [String]> {
    let limit = config
        .max_urls
        .map_or(urls.len(), |max| max.min(urls.len()));
    urls[..limit].chunks(config.batch_size.max(1)).collect()
}

pub struct BatchScheduler<P: ?Sized> {
    prober: Arc<P>,
    config: RunConfig,
    cancel: CancellationToken,
    progress: Option<mpsc::UnboundedSender<UrlRecord>>,
}

impl<P: Prober + ?Sized + 'static> BatchScheduler<P> {
    pub fn new(prober: Arc<P>, config: RunConfig) -> Self {
        Self {
            prober,
            config,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Cancelling `token` skips the remaining batches. Probes already in
    /// flight are left to finish.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Every record is also sent here as soon as its probe completes.
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<UrlRecord>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn run(&self, urls: &[String]) -> BatchRun {
        let batches = plan_batches(urls, &self.config);
        let planned_urls: usize = batches.iter().map(|batch| batch.len()).sum();
        let mut run = BatchRun {
            records: Vec::with_capacity(planned_urls),
            batches_planned: batches.len(),
            ..BatchRun::default()
        };

        if urls.len() > planned_urls {
            tracing::info!(
                received = urls.len(),
                max_urls = ?self.config.max_urls,
                "URL list truncated"
            );
        }
        tracing::info!(
            batches = run.batches_planned,
            batch_size = self.config.batch_size,
            concurrency = self.config.max_concurrency_per_batch,
            delay_ms = self.config.batch_delay.as_millis() as u64,
            "starting run"
        );

        for (index, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                run.cancelled = true;
                tracing::warn!(
                    completed = run.batches_completed,
                    skipped = run.batches_planned - run.batches_completed,
                    "run cancelled"
                );
                break;
            }

            let started = Instant::now();
            self.run_batch(batch, &mut run.records).await;
            run.batches_completed += 1;
            tracing::debug!(
                batch = index + 1,
                of = run.batches_planned,
                urls = batch.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "batch complete"
            );

            let is_last = index + 1 == run.batches_planned;
            if !is_last && !self.config.batch_delay.is_zero() {
                tokio::select! {
                    _ = sleep(self.config.batch_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        run
    }

    async fn run_batch(&self, batch: &[String], records: &mut Vec<UrlRecord>) {
        // `RunConfig` fields are public, so a hand-built config may be out of range.
        let limit = self.config.max_concurrency_per_batch.clamp(1, batch.len());
        let permits = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::with_capacity(batch.len());

        for url in batch {
            let prober = Arc::clone(&self.prober);
            let permits = Arc::clone(&permits);
            let request = ProbeRequest::new(url.clone(), self.config.probe_timeout);

            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so the permit is always granted.
                let _permit = permits.acquire_owned().await;
                let result = prober.probe(request).await;
                tracing::trace!(
                    url = %result.url,
                    rule = classify::matching_rule(&result).map_or("none", |rule| rule.name),
                    "classified"
                );
                UrlRecord::from_probe(result)
            });
            in_flight.insert(handle.id(), url.clone());
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let record = match joined {
                Ok((id, record)) => {
                    in_flight.remove(&id);
                    record
                }
                Err(e) => {
                    let url = in_flight.remove(&e.id()).unwrap_or_default();
                    tracing::error!(url = %url, error = %e, "probe task failed");
                    UrlRecord::failed(url, format!("probe task failed: {e}"))
                }
            };

            tracing::debug!(
                url = %record.url,
                verdict = %record.verdict,
                status = ?record.status_code,
                elapsed_ms = record.elapsed.as_millis() as u64,
                "probed"
            );
            if let Some(progress) = &self.progress {
                let _ = progress.send(record.clone());
            }
            records.push(record);
        }
    }
}

/// Runs `urls` through a fresh scheduler with no cancellation or progress hooks.
pub async fn run<P: Prober + ?Sized + 'static>(
    prober: Arc<P>,
    urls: &[String],
    config: RunConfig,
) -> BatchRun {
    BatchScheduler::new(prober, config).run(urls).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::CacheVerdict;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start(String),
        End(String),
    }

    /// Answers every URL with an edge hit after `latency`, except the
    /// scripted failures and panics.
    #[derive(Default)]
    struct ScriptedProber {
        latency: Duration,
        fail: HashSet<String>,
        panic_on: HashSet<String>,
        cancel_on: Option<(String, CancellationToken)>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, request: ProbeRequest) -> ProbeResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push(Event::Start(request.url.clone()));

            if let Some((url, token)) = &self.cancel_on {
                if *url == request.url {
                    token.cancel();
                }
            }
            sleep(self.latency).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.events
                .lock()
                .unwrap()
                .push(Event::End(request.url.clone()));

            if self.panic_on.contains(&request.url) {
                panic!("scripted panic for {}", request.url);
            }
            if self.fail.contains(&request.url) {
                return ProbeResult::failure(request.url, "connection reset", self.latency);
            }
            let headers: HeaderSet = [("X-Cache", "TCP_HIT from a1")].into_iter().collect();
            ProbeResult::response(request.url, 200, headers, self.latency)
        }
    }

    fn urls(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("https://example.com/page{i}"))
            .collect()
    }

    fn config(batch_size: usize, delay: Duration, max_urls: Option<usize>) -> RunConfig {
        RunConfig {
            batch_size,
            batch_delay: delay,
            max_concurrency_per_batch: batch_size,
            max_urls,
            probe_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_plan_batches_partitions_in_order() {
        let urls = urls(25);
        let batches = plan_batches(&urls, &config(10, Duration::ZERO, None));
        let sizes: Vec<_> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, [10, 10, 5]);
        assert_eq!(batches[2][0], "https://example.com/page20");
    }

    #[test]
    fn test_plan_batches_truncates_to_prefix() {
        let urls = urls(150);
        let batches = plan_batches(&urls, &config(10, Duration::ZERO, Some(100)));
        assert_eq!(batches.len(), 10);
        assert_eq!(batches.concat(), urls[..100].to_vec());
    }

    #[test]
    fn test_plan_batches_limit_above_length() {
        let urls = urls(4);
        let batches = plan_batches(&urls, &config(3, Duration::ZERO, Some(100)));
        assert_eq!(batches.concat(), urls);
    }

    #[tokio::test]
    async fn test_every_url_probed_exactly_once() {
        let urls = urls(150);
        let prober = Arc::new(ScriptedProber::default());

        let run = run(prober, &urls, config(10, Duration::ZERO, None)).await;

        assert_eq!(run.batches_planned, 15);
        assert_eq!(run.batches_completed, 15);
        assert!(!run.cancelled);
        assert_eq!(run.records.len(), 150);
        let seen: HashSet<_> = run.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(seen.len(), 150);
        assert!(
            run.records
                .iter()
                .all(|r| r.verdict == CacheVerdict::HitConfirmed)
        );
    }

    #[tokio::test]
    async fn test_max_urls_probes_first_urls_only() {
        let urls = urls(150);
        let prober = Arc::new(ScriptedProber::default());

        let run = run(prober.clone(), &urls, config(10, Duration::ZERO, Some(100))).await;

        assert_eq!(run.records.len(), 100);
        let seen: HashSet<_> = run.records.iter().map(|r| r.url.clone()).collect();
        let expected: HashSet<_> = urls[..100].iter().cloned().collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_delay_between_batches_only() {
        let delay = Duration::from_millis(40);
        let urls = urls(4);
        let prober = Arc::new(ScriptedProber::default());

        let started = Instant::now();
        let run = run(prober, &urls, config(1, delay, None)).await;
        let elapsed = started.elapsed();

        // four batches, three pauses
        assert_eq!(run.batches_completed, 4);
        assert!(elapsed >= delay * 3, "took {elapsed:?}");
        assert!(elapsed < delay * 3 + Duration::from_secs(2), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded_within_batch() {
        let prober = Arc::new(ScriptedProber {
            latency: Duration::from_millis(20),
            ..ScriptedProber::default()
        });
        let mut config = config(10, Duration::ZERO, None);
        config.max_concurrency_per_batch = 3;

        let run = run(prober.clone(), &urls(10), config).await;

        assert_eq!(run.records.len(), 10);
        let peak = prober.peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak in flight was {peak}");
    }

    #[tokio::test]
    async fn test_batches_never_overlap() {
        let prober = Arc::new(ScriptedProber {
            latency: Duration::from_millis(5),
            ..ScriptedProber::default()
        });
        let urls = urls(9);

        run(prober.clone(), &urls, config(3, Duration::ZERO, None)).await;

        let events = prober.events.lock().unwrap().clone();
        let position = |event: Event| events.iter().position(|e| *e == event).unwrap();
        for batch in urls.chunks(3).collect::<Vec<_>>().windows(2) {
            let last_end = batch[0]
                .iter()
                .map(|u| position(Event::End(u.clone())))
                .max()
                .unwrap();
            let first_start = batch[1]
                .iter()
                .map(|u| position(Event::Start(u.clone())))
                .min()
                .unwrap();
            assert!(last_end < first_start);
        }
    }

    #[tokio::test]
    async fn test_failed_probe_does_not_affect_siblings() {
        let urls = urls(6);
        let prober = Arc::new(ScriptedProber {
            fail: HashSet::from([urls[1].clone()]),
            ..ScriptedProber::default()
        });

        let run = run(prober, &urls, config(3, Duration::ZERO, None)).await;

        assert_eq!(run.records.len(), 6);
        let failed: Vec<_> = run
            .records
            .iter()
            .filter(|r| r.verdict == CacheVerdict::Error)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].url, urls[1]);
        assert_eq!(failed[0].error.as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn test_panicking_probe_becomes_error_record() {
        let urls = urls(3);
        let prober = Arc::new(ScriptedProber {
            panic_on: HashSet::from([urls[2].clone()]),
            ..ScriptedProber::default()
        });

        let run = run(prober, &urls, config(3, Duration::ZERO, None)).await;

        assert_eq!(run.records.len(), 3);
        let record = run.records.iter().find(|r| r.url == urls[2]).unwrap();
        assert_eq!(record.verdict, CacheVerdict::Error);
        assert!(record.error.as_deref().unwrap().starts_with("probe task failed"));
    }

    #[tokio::test]
    async fn test_cancellation_finishes_current_batch() {
        let urls = urls(9);
        let token = CancellationToken::new();
        let prober = Arc::new(ScriptedProber {
            latency: Duration::from_millis(5),
            cancel_on: Some((urls[1].clone(), token.clone())),
            ..ScriptedProber::default()
        });

        let started = Instant::now();
        let run = BatchScheduler::new(prober, config(3, Duration::from_secs(5), None))
            .with_cancellation(token)
            .run(&urls)
            .await;

        assert!(run.cancelled);
        assert_eq!(run.batches_planned, 3);
        assert_eq!(run.batches_completed, 1);
        assert_eq!(run.records.len(), 3);
        // the 5s pause after the first batch is cut short
        assert!(started.elapsed() < Duration::from_secs(1), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn test_out_of_range_concurrency_still_completes() {
        let urls = urls(6);
        for limit in [0, usize::MAX] {
            let prober = Arc::new(ScriptedProber {
                latency: Duration::from_millis(5),
                ..ScriptedProber::default()
            });
            let mut config = config(3, Duration::ZERO, None);
            config.max_concurrency_per_batch = limit;

            let run = tokio::time::timeout(
                Duration::from_secs(2),
                run(prober.clone(), &urls, config),
            )
            .await
            .expect("run should finish");

            assert_eq!(run.records.len(), 6);
            assert!(prober.peak.load(Ordering::SeqCst) <= 3);
        }
    }

    #[tokio::test]
    async fn test_progress_receives_each_record() {
        let urls = urls(5);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let run = BatchScheduler::new(
            Arc::new(ScriptedProber::default()),
            config(2, Duration::ZERO, None),
        )
        .with_progress(tx)
        .run(&urls)
        .await;

        let mut streamed = Vec::new();
        while let Ok(record) = rx.try_recv() {
            streamed.push(record);
        }
        assert_eq!(streamed, run.records);
    }
}
