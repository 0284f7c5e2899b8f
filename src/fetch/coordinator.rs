//! Coordinating the segment fetchers of one search.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace};
use parking_lot::Mutex;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use uuid::Uuid;

use crate::abort::CancellationToken;
use crate::config::FetchConfig;
use crate::error::{HitstreamError, Result};
use crate::fetch::RequestedCounts;
use crate::fetch::collector::HitCollector;
use crate::fetch::parallel::make_equal_groups;
use crate::fetch::phase::Phase;
use crate::fetch::worker::SegmentFetcher;
use crate::filter::{CollationCache, HitFilter};
use crate::segment::{CompiledQuery, SegmentRef};

/// Drives the segment fetchers of one search on demand.
pub struct FetchCoordinator {
    id: Uuid,
    config: FetchConfig,
    collector: Arc<HitCollector>,
    requested: Arc<RequestedCounts>,
    workers: Mutex<Vec<SegmentFetcher>>,
    pool: ThreadPool,
    cancellation: Option<CancellationToken>,
    failure: Mutex<Option<HitstreamError>>,
    all_fetched: AtomicBool,
}

impl FetchCoordinator {
    /// Set up fetching `query` from `segments`. Nothing is read yet.
    pub fn new(
        segments: &[SegmentRef],
        query: Arc<dyn CompiledQuery>,
        filter: HitFilter,
        config: FetchConfig,
        cancellation: Option<CancellationToken>,
    ) -> Result<Self> {
        config.validate()?;
        let id = Uuid::new_v4();
        let collector = Arc::new(HitCollector::new(
            segments,
            config.process_limit(),
            config.count_limit(),
        ));
        let requested = Arc::new(RequestedCounts::new());
        let cache = CollationCache::new();

        let workers = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                SegmentFetcher::new(
                    Arc::clone(segment),
                    Arc::clone(&query),
                    filter.clone(),
                    cache.clone(),
                    Arc::clone(&requested),
                    collector.segment_sink(i),
                )
            })
            .collect();

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.fetch_threads())
            .thread_name(|i| format!("hit-fetch-{i}"))
            .build()
            .map_err(|e| HitstreamError::thread_pool(format!("Failed to create thread pool: {e}")))?;

        debug!(
            "search {id}: {} segments, {} fetch threads, {query:?}",
            segments.len(),
            config.fetch_threads()
        );

        Ok(FetchCoordinator {
            id,
            config,
            collector,
            requested,
            workers: Mutex::new(workers),
            pool,
            cancellation,
            failure: Mutex::new(None),
            all_fetched: AtomicBool::new(false),
        })
    }

    /// Identifier used in log messages.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The collector holding the results.
    pub fn collector(&self) -> &Arc<HitCollector> {
        &self.collector
    }

    /// The configuration this search runs with.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Have all hits been fetched (or a ceiling stopped the search)?
    pub fn all_fetched(&self) -> bool {
        self.all_fetched.load(Ordering::SeqCst)
    }

    /// Make sure at least `number` hits are available, or all of them if
    /// `number` is `None`.
    ///
    /// Returns whether that many hits exist. Running out of hits or reaching a
    /// ceiling is not an error. If fetching was interrupted or a segment
    /// failed, that error is returned to every call that needs more hits than
    /// are available.
    pub fn ensure_results_read(&self, number: Option<u64>) -> Result<bool> {
        if self.satisfied(number) {
            return Ok(true);
        }
        if self.all_fetched() {
            return Ok(false);
        }

        let max_process = self.config.process_limit();
        let max_count = self.config.count_limit();
        let clamped = match number {
            None => max_count,
            Some(n) => n.saturating_add(self.config.fetch_hits_min).min(max_count),
        };
        self.requested.raise(clamped.min(max_process), clamped);

        loop {
            if let Some(answer) = self.settled(number) {
                return answer;
            }
            if let Some(mut workers) = self.workers.try_lock_for(self.config.poll_interval) {
                // Someone else may have done the work while we waited.
                if let Some(answer) = self.settled(number) {
                    return answer;
                }
                self.dispatch(&mut workers)?;
                return Ok(self.satisfied(number));
            }
        }
    }

    /// The answer to a request if it can be given without fetching.
    fn settled(&self, number: Option<u64>) -> Option<Result<bool>> {
        if self.satisfied(number) {
            return Some(Ok(true));
        }
        if self.all_fetched() {
            return Some(Ok(false));
        }
        if let Some(failure) = self.failure.lock().as_ref() {
            return Some(Err(failure.replay()));
        }
        // Once storing has stopped, counting further cannot make more hits
        // available, so a request whose counts are already met is answered.
        if self.collector.phase() != Phase::StoringAndCounting && self.requests_met() {
            return Some(Ok(false));
        }
        None
    }

    /// Have the fetchers processed and counted as much as was requested?
    fn requests_met(&self) -> bool {
        let stats = self.collector.stats();
        stats.processed_so_far() >= self.requested.process()
            && stats.counted_so_far() >= self.requested.count()
    }

    /// Is a request for `number` hits already answered by published hits?
    fn satisfied(&self, number: Option<u64>) -> bool {
        match number {
            Some(n) => self.collector.size() as u64 >= n,
            None => self.all_fetched(),
        }
    }

    /// Run all live fetchers until they pause or finish.
    fn dispatch(&self, workers: &mut Vec<SegmentFetcher>) -> Result<()> {
        let threads = self.config.fetch_threads();
        let groups = make_equal_groups(std::mem::take(workers), threads, |w| {
            w.estimated_doc_count()
        });
        debug!(
            "search {}: dispatching {} fetcher groups (requested process={}, count={})",
            self.id,
            groups.len(),
            self.requested.process(),
            self.requested.count()
        );

        let token = self.cancellation.as_ref();
        let results: Vec<(Vec<SegmentFetcher>, Option<HitstreamError>)> = self.pool.install(|| {
            groups
                .into_par_iter()
                .map(|mut group| {
                    let _scope = token.map(CancellationToken::enter);
                    let mut error = None;
                    for worker in group.iter_mut() {
                        if let Err(e) = worker.run() {
                            error.get_or_insert(e);
                        }
                    }
                    (group, error)
                })
                .collect()
        });

        let mut first_error = None;
        for (group, error) in results {
            workers.extend(group.into_iter().filter(|w| !w.is_done()));
            if first_error.is_none() {
                first_error = error;
            }
        }
        trace!("search {}: {} fetchers still live", self.id, workers.len());

        if let Some(error) = first_error {
            let replay = error.replay();
            self.failure.lock().get_or_insert(error);
            return Err(replay);
        }
        if workers.is_empty() || self.collector.phase() == Phase::Done {
            for mut worker in workers.drain(..) {
                worker.abandon();
            }
            self.collector.mark_done();
            self.all_fetched.store(true, Ordering::SeqCst);
            let stats = self.collector.stats();
            debug!(
                "search {}: done, {} hits stored, {} counted",
                self.id,
                stats.processed_so_far(),
                stats.counted_so_far()
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("all_fetched", &self.all_fetched())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hit::Hit;
    use crate::segment::memory::{MemoryQuery, MemorySegment, Script, ScriptStep};

    fn segments(count: usize) -> Vec<SegmentRef> {
        (0..count)
            .map(|i| {
                Arc::new(MemorySegment::empty(format!("s{i}"), (i * 100) as u32, 100)) as SegmentRef
            })
            .collect()
    }

    fn config() -> FetchConfig {
        FetchConfig::default()
            .with_max_threads(2)
            .with_poll_interval(Duration::from_millis(5))
    }

    fn one_hit_per_doc(docs: u32) -> Vec<(u32, u32, u32)> {
        (0..docs).map(|d| (d, 0, 1)).collect()
    }

    #[test]
    fn test_fetches_lazily() {
        let script = Script::new()
            .with_hits("s0", &one_hit_per_doc(100))
            .with_hits("s1", &one_hit_per_doc(100));
        let coordinator = FetchCoordinator::new(
            &segments(2),
            Arc::new(MemoryQuery::Scripted(script)),
            HitFilter::AcceptAll,
            config().with_fetch_hits_min(0),
            None,
        )
        .unwrap();

        assert!(coordinator.ensure_results_read(Some(5)).unwrap());
        let size = coordinator.collector().size();
        assert!(size >= 5);
        assert!(size < 200);
        assert!(!coordinator.all_fetched());

        assert!(coordinator.ensure_results_read(None).unwrap());
        assert_eq!(coordinator.collector().size(), 200);
        assert!(coordinator.all_fetched());
        assert!(coordinator.collector().stats().done());
        assert!(!coordinator.ensure_results_read(Some(201)).unwrap());
    }

    #[test]
    fn test_failure_is_remembered() {
        let script = Script::new().with_segment(
            "s0",
            vec![
                ScriptStep::Hit(Hit::new(0, 0, 1)),
                ScriptStep::Hit(Hit::new(1, 0, 1)),
                ScriptStep::Fail("checksum mismatch".into()),
            ],
        );
        let coordinator = FetchCoordinator::new(
            &segments(1),
            Arc::new(MemoryQuery::Scripted(script)),
            HitFilter::AcceptAll,
            config(),
            None,
        )
        .unwrap();

        let err = coordinator.ensure_results_read(None).unwrap_err();
        assert!(matches!(err, HitstreamError::Segment { .. }));
        assert!(err.to_string().contains("checksum mismatch"));

        // Published hits still answer small requests; larger ones fail again.
        assert!(coordinator.ensure_results_read(Some(1)).unwrap());
        assert!(coordinator.ensure_results_read(Some(2)).is_err());
        assert!(!coordinator.all_fetched());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = FetchCoordinator::new(
            &segments(1),
            Arc::new(MemoryQuery::Scripted(Script::new())),
            HitFilter::AcceptAll,
            config().with_max_threads(0),
            None,
        );
        assert!(matches!(result, Err(HitstreamError::InvalidConfig(_))));
    }
}
