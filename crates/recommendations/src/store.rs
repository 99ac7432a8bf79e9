use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use topicforge_core::{Clock, SystemClock};

use crate::error::FetchError;
use crate::fetcher::RecommendationFetcher;
use crate::record::CacheRecord;

/// Produces a fresh [`CacheRecord`].
///
/// The store calls this at most once per coalesced refresh. Implementations
/// decide which tier answers.
#[async_trait]
pub trait RecordFetcher: Send + Sync + 'static {
    async fn fetch(&self) -> Result<CacheRecord, FetchError>;
}

#[async_trait]
impl<F: RecordFetcher + ?Sized> RecordFetcher for Arc<F> {
    async fn fetch(&self) -> Result<CacheRecord, FetchError> {
        (**self).fetch().await
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<CacheRecord>, FetchError>>>;

struct InFlight {
    ticket: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct StoreState {
    record: Option<Arc<CacheRecord>>,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

/// Per-session recommendation cache.
///
/// - A fresh record is served without calling the fetcher.
/// - Concurrent refreshes share one in-flight fetch; every waiter receives the
///   same `Arc<CacheRecord>` (or the same error).
/// - A failed refresh leaves the previous record in place.
/// - `invalidate` drops the record and detaches any in-flight fetch, whose
///   result is then delivered to its own waiters but never stored.
///
/// The lock is never held across an `.await`.
pub struct RecommendationStore<F: RecordFetcher = RecommendationFetcher> {
    fetcher: Arc<F>,
    clock: Arc<dyn Clock>,
    state: Mutex<StoreState>,
}

impl<F: RecordFetcher> RecommendationStore<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            clock: Arc::new(SystemClock),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The current record if it is still fresh, without triggering a fetch.
    pub fn peek(&self) -> Option<Arc<CacheRecord>> {
        let state = self.state.lock();
        state
            .record
            .as_ref()
            .filter(|record| record.is_fresh(self.clock.now()))
            .cloned()
    }

    /// True while a refresh is running and still attached to this store.
    pub fn is_refreshing(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    /// Serve recommendations.
    ///
    /// Without `force`, a fresh record is returned as-is. Otherwise the caller
    /// joins the running refresh or starts one. `force` still joins a refresh
    /// that is already in flight instead of starting a second one.
    pub async fn get(&self, force: bool) -> Result<Arc<CacheRecord>, FetchError> {
        let (ticket, future) = {
            let mut state = self.state.lock();

            if !force {
                if let Some(record) = &state.record {
                    if record.is_fresh(self.clock.now()) {
                        debug!(entries = record.len(), "recommendation cache hit");
                        return Ok(Arc::clone(record));
                    }
                }
            }

            match &state.in_flight {
                Some(in_flight) => {
                    debug!(ticket = in_flight.ticket, "joining in-flight recommendation fetch");
                    (in_flight.ticket, in_flight.future.clone())
                }
                None => {
                    state.next_ticket += 1;
                    let ticket = state.next_ticket;
                    let fetcher = Arc::clone(&self.fetcher);
                    let future = async move { fetcher.fetch().await.map(Arc::new) }
                        .boxed()
                        .shared();
                    state.in_flight = Some(InFlight {
                        ticket,
                        future: future.clone(),
                    });
                    debug!(ticket, force, "starting recommendation fetch");
                    (ticket, future)
                }
            }
        };

        let result = future.await;
        self.settle(ticket, &result);
        result
    }

    /// Drop the cached record. The next `get` fetches. Idempotent.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        let had_record = state.record.take().is_some();
        let detached = state.in_flight.take().map(|f| f.ticket);
        debug!(had_record, ?detached, "recommendation cache invalidated");
    }

    /// Record the outcome of fetch `ticket` if it is still the attached one.
    ///
    /// Every waiter calls this; only the first to arrive finds a matching
    /// ticket, so the record is written once.
    fn settle(&self, ticket: u64, result: &Result<Arc<CacheRecord>, FetchError>) {
        let mut state = self.state.lock();
        let attached = state.in_flight.as_ref().is_some_and(|f| f.ticket == ticket);
        if !attached {
            return;
        }
        state.in_flight = None;

        match result {
            Ok(record) => {
                info!(
                    ticket,
                    entries = record.len(),
                    degraded = record.degraded(),
                    "recommendation record replaced"
                );
                state.record = Some(Arc::clone(record));
            }
            Err(err) => {
                warn!(
                    error = %err,
                    kept_previous = state.record.is_some(),
                    "recommendation refresh failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{RecommendationEntry, SubjectSummary, Tier};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use topicforge_core::{ManualClock, SubjectId};

    /// Scripted fetcher. Each call pops the next answer; `gate` lets a test
    /// hold the fetch open until it has lined up concurrent callers.
    struct ScriptedFetcher {
        clock: ManualClock,
        answers: Mutex<VecDeque<Result<Vec<u64>, FetchError>>>,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedFetcher {
        fn new(clock: ManualClock, answers: Vec<Result<Vec<u64>, FetchError>>) -> Self {
            Self {
                clock,
                answers: Mutex::new(answers.into()),
                calls: AtomicUsize::new(0),
                gate: None,
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<CacheRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let answer = self
                .answers
                .lock()
                .pop_front()
                .unwrap_or(Err(FetchError::EmptyResult));
            answer.map(|ids| {
                let entries = ids
                    .into_iter()
                    .map(|id| RecommendationEntry {
                        subject: SubjectSummary::new(SubjectId(id), format!("subject {id}")),
                        score: id as f64,
                        reasons: vec!["match".to_string()],
                        tier: Tier::Personalized,
                    })
                    .collect();
                CacheRecord::new(entries, self.clock.now(), Duration::seconds(120))
            })
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    }

    fn store(fetcher: ScriptedFetcher, clock: &ManualClock) -> Arc<RecommendationStore<ScriptedFetcher>> {
        Arc::new(RecommendationStore::new(fetcher).with_clock(Arc::new(clock.clone())))
    }

    #[tokio::test]
    async fn fresh_record_is_served_without_refetch() {
        let clock = clock();
        let store = store(ScriptedFetcher::new(clock.clone(), vec![Ok(vec![1, 2])]), &clock);

        let first = store.get(false).await.unwrap();
        clock.advance(Duration::seconds(119));
        let second = store.get(false).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn expired_record_triggers_exactly_one_refetch() {
        let clock = clock();
        let store = store(
            ScriptedFetcher::new(clock.clone(), vec![Ok(vec![1]), Ok(vec![2])]),
            &clock,
        );

        store.get(false).await.unwrap();
        clock.advance(Duration::seconds(121));

        let refreshed = store.get(false).await.unwrap();
        let again = store.get(false).await.unwrap();

        assert_eq!(refreshed.entries()[0].subject_id(), SubjectId(2));
        assert!(Arc::ptr_eq(&refreshed, &again));
        assert_eq!(store.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_fetch() {
        let clock = clock();
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(clock.clone(), vec![Ok(vec![5, 3])]).gated(gate.clone());
        let store = store(fetcher, &clock);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get(false).await })
            })
            .collect();

        while store.fetcher().calls() == 0 {
            tokio::task::yield_now().await;
        }
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let mut records = Vec::new();
        for handle in handles {
            records.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(store.fetcher().calls(), 1);
        assert!(records.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(Arc::ptr_eq(&records[0], &store.peek().unwrap()));
    }

    #[tokio::test]
    async fn forced_get_joins_the_running_fetch() {
        let clock = clock();
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(clock.clone(), vec![Ok(vec![7]), Ok(vec![8])])
            .gated(gate.clone());
        let store = store(fetcher, &clock);

        let plain = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get(false).await })
        };
        while store.fetcher().calls() == 0 {
            tokio::task::yield_now().await;
        }
        let forced = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get(true).await })
        };
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        let plain = plain.await.unwrap().unwrap();
        let forced = forced.await.unwrap().unwrap();

        assert_eq!(store.fetcher().calls(), 1);
        assert!(Arc::ptr_eq(&plain, &forced));
        assert_eq!(forced.entries()[0].subject_id(), SubjectId(7));
    }

    #[tokio::test]
    async fn peek_hides_expired_records() {
        let clock = clock();
        let store = store(ScriptedFetcher::new(clock.clone(), vec![Ok(vec![1])]), &clock);

        let record = store.get(false).await.unwrap();
        clock.advance(Duration::seconds(119));
        assert!(Arc::ptr_eq(&record, &store.peek().unwrap()));

        clock.advance(Duration::seconds(2));
        assert!(store.peek().is_none());
        assert_eq!(store.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn forced_refresh_failure_keeps_previous_record() {
        let clock = clock();
        let store = store(
            ScriptedFetcher::new(
                clock.clone(),
                vec![Ok(vec![1]), Err(FetchError::network("unreachable"))],
            ),
            &clock,
        );

        let original = store.get(false).await.unwrap();
        let err = store.get(true).await.unwrap_err();

        assert_eq!(err, FetchError::network("unreachable"));
        assert!(Arc::ptr_eq(&original, &store.peek().unwrap()));
        assert!(!store.is_refreshing());
    }

    #[tokio::test]
    async fn failure_with_no_record_leaves_store_empty() {
        let clock = clock();
        let store = store(
            ScriptedFetcher::new(clock.clone(), vec![Err(FetchError::EmptyResult), Ok(vec![4])]),
            &clock,
        );

        assert!(store.get(false).await.is_err());
        assert!(store.peek().is_none());

        let record = store.get(false).await.unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(store.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_is_idempotent_and_forces_next_fetch() {
        let clock = clock();
        let store = store(
            ScriptedFetcher::new(clock.clone(), vec![Ok(vec![1]), Ok(vec![2])]),
            &clock,
        );

        store.get(false).await.unwrap();
        store.invalidate();
        store.invalidate();
        assert!(store.peek().is_none());

        let record = store.get(false).await.unwrap();
        assert_eq!(record.entries()[0].subject_id(), SubjectId(2));
        assert_eq!(store.fetcher().calls(), 2);
    }

    #[tokio::test]
    async fn result_of_fetch_detached_by_invalidate_is_not_stored() {
        let clock = clock();
        let gate = Arc::new(Notify::new());
        let fetcher = ScriptedFetcher::new(clock.clone(), vec![Ok(vec![9])]).gated(gate.clone());
        let store = store(fetcher, &clock);

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.get(false).await })
        };
        while store.fetcher().calls() == 0 {
            tokio::task::yield_now().await;
        }

        store.invalidate();
        assert!(!store.is_refreshing());
        gate.notify_one();

        let delivered = waiter.await.unwrap().unwrap();
        assert_eq!(delivered.entries()[0].subject_id(), SubjectId(9));
        assert!(store.peek().is_none());
    }
}
