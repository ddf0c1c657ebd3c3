//! # Scheduler: concurrency-limited admission with a priority backlog.
//!
//! Every load goes through [`Scheduler::request`]. The scheduler owns the cache store,
//! the in-flight map, the backlog and the metrics, all behind one mutex that is never
//! held across an `.await`.
//!
//! ## Request flow
//! ```text
//! request(name, location, priority)
//!   ├─► cache hit?            → Ok(from_cache), cache_hits += 1
//!   ├─► already in flight?    → await the existing shared load
//!   └─► spawn load task, register it in flight, await it
//!
//! load task:
//!   admit ── current < max or critical ──► current += 1
//!     │
//!     └── otherwise ──► push backlog, publish LoadQueued, wait for the admit signal
//!     └── destroyed while waiting ──► errors += 1, Err(Destroyed)
//!   load_with_retry(host, …)        (a host panic becomes Err(Failed))
//!   complete (under lock):
//!     ├─ current -= 1
//!     ├─ drop in-flight entry (only if it is still ours)
//!     ├─ Ok  → loaded set, cache put, metrics
//!     ├─ Err → errors += 1
//!     └─ while capacity: pop best backlog entry, current += 1, signal it
//! ```
//!
//! ## Rules
//! - Non-critical loads never push the in-flight count past `max_concurrent`.
//! - `critical` is admitted immediately and may exceed the cap.
//! - The backlog yields the highest priority first, FIFO within a tier.
//! - The completer reserves the slot **before** waking a backlog entry, so a fresh request
//!   cannot slip in between.
//! - Loads run on their own tokio task: a caller dropping its future never stalls a load.
//! - Every admitted load goes through `complete`, even when the host panics.
//! - Every completion re-checks state: the backlog may have grown and `destroy` may have
//!   reset everything while the load was running.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::{
    core::{
        cache::{CacheEntry, CacheStore},
        config::Config,
        loader::{LoadParams, LoadReport, LoadTarget, load_with_retry},
        registry::ModuleRegistry,
    },
    error::LoadError,
    events::{Bus, Event, EventKind},
    policies::Priority,
    units::{HostRef, UnitHandle},
};

/// Result of a successful request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Logical module name.
    pub module: String,
    /// True if answered from the cache store without any host work.
    pub from_cache: bool,
    /// The active unit.
    pub handle: UnitHandle,
}

/// Read-only view of the scheduler counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Loads that completed successfully, including those finished after `destroy`.
    pub modules_loaded: u64,
    /// Bytes fetched by successful loads (reported size or registry estimate).
    pub total_bytes: u64,
    /// Requests answered from the cache store.
    pub cache_hits: u64,
    /// Failed loads, unknown module names and requests rejected by `destroy`.
    pub errors: u64,
    /// Running average of request-to-completion time, in milliseconds.
    pub average_load_time_ms: f64,
    /// Number of names in the loaded set.
    pub loaded_count: usize,
    /// Live entries in the cache store.
    pub cache_size: usize,
    /// Requests waiting in the backlog for a slot.
    pub queue_size: usize,
    /// Loads holding an admission slot right now.
    pub current_loads: usize,
    /// Registered bytes that were never fetched.
    pub estimated_bytes_saved: u64,
}

type SharedLoad = Shared<BoxFuture<'static, Result<LoadOutcome, LoadError>>>;

/// Identity of one spawned load.
struct Ticket {
    name: String,
    location: String,
    generation: u64,
    epoch: u64,
}

struct InFlight {
    generation: u64,
    load: SharedLoad,
}

struct BacklogEntry {
    name: String,
    priority: Priority,
    seq: u64,
    admit: oneshot::Sender<()>,
}

impl PartialEq for BacklogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BacklogEntry {}

impl PartialOrd for BacklogEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BacklogEntry {
    /// Max-heap order: higher priority first, then lower `seq` (earlier submission).
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct Counters {
    modules_loaded: u64,
    total_bytes: u64,
    cache_hits: u64,
    errors: u64,
    average_load_time_ms: f64,
}

impl Counters {
    fn record_load(&mut self, elapsed: Duration, bytes: u64) {
        self.modules_loaded += 1;
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        let n = self.modules_loaded as f64;
        let ms = elapsed.as_secs_f64() * 1000.0;
        self.average_load_time_ms = (self.average_load_time_ms * (n - 1.0) + ms) / n;
    }
}

struct State {
    cache: CacheStore,
    in_flight: HashMap<String, InFlight>,
    backlog: BinaryHeap<BacklogEntry>,
    loaded: Vec<String>,
    current_loads: usize,
    counters: Counters,
    next_seq: u64,
    next_generation: u64,
    /// Bumped by `destroy`; loads started in an older epoch do not populate state.
    epoch: u64,
}

enum Step {
    Hit(UnitHandle),
    Wait(SharedLoad),
}

/// Concurrency-limited, priority-ordered loader of code units.
pub struct Scheduler {
    limit: Option<usize>,
    params: LoadParams,
    registry: Arc<ModuleRegistry>,
    host: HostRef,
    bus: Bus,
    state: Mutex<State>,
}

impl Scheduler {
    pub fn new(cfg: &Config, registry: Arc<ModuleRegistry>, host: HostRef, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            limit: cfg.concurrency_limit(),
            params: LoadParams {
                timeout: cfg.timeout(),
                retry_attempts: cfg.retry_attempts,
                backoff: cfg.backoff,
            },
            registry,
            host,
            bus,
            state: Mutex::new(State {
                cache: CacheStore::new(cfg.cache_ttl, cfg.cache_capacity, cfg.cache_enabled),
                in_flight: HashMap::new(),
                backlog: BinaryHeap::new(),
                loaded: Vec::new(),
                current_loads: 0,
                counters: Counters::default(),
                next_seq: 0,
                next_generation: 0,
                epoch: 0,
            }),
        })
    }

    /// Requests the unit at `location` under the logical `name`.
    ///
    /// Resolves once the unit is active (or found in the cache). Concurrent requests for
    /// the same name share one load and observe the same result; the priority of the
    /// first one wins.
    pub async fn request(
        self: &Arc<Self>,
        name: &str,
        location: &str,
        priority: Priority,
    ) -> Result<LoadOutcome, LoadError> {
        let step = {
            let mut st = self.state();
            if let Some(handle) = st.cache.get(name).map(|e| e.handle.clone()) {
                st.counters.cache_hits += 1;
                Step::Hit(handle)
            } else if let Some(flight) = st.in_flight.get(name) {
                Step::Wait(flight.load.clone())
            } else {
                Step::Wait(self.spawn_load(&mut st, name, location, priority))
            }
        };

        match step {
            Step::Hit(handle) => {
                self.bus.publish(
                    Event::new(EventKind::CacheHit)
                        .with_module(name)
                        .with_priority(priority),
                );
                Ok(LoadOutcome {
                    module: name.to_string(),
                    from_cache: true,
                    handle,
                })
            }
            Step::Wait(load) => load.await,
        }
    }

    /// Snapshot of counters and queue state.
    pub fn metrics(&self) -> MetricsSnapshot {
        let st = self.state();
        MetricsSnapshot {
            modules_loaded: st.counters.modules_loaded,
            total_bytes: st.counters.total_bytes,
            cache_hits: st.counters.cache_hits,
            errors: st.counters.errors,
            average_load_time_ms: st.counters.average_load_time_ms,
            loaded_count: st.loaded.len(),
            cache_size: st.cache.len(),
            queue_size: st.backlog.len(),
            current_loads: st.current_loads,
            estimated_bytes_saved: self
                .registry
                .total_estimated_size()
                .saturating_sub(st.counters.total_bytes),
        }
    }

    /// Names of every module loaded since start (or the last `destroy`), in load order.
    pub fn loaded_modules(&self) -> Vec<String> {
        self.state().loaded.clone()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.state().loaded.iter().any(|n| n == name)
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.state().in_flight.contains_key(name)
    }

    /// Counts a failure that never reached the load path (e.g. an unknown name).
    pub fn record_error(&self) {
        self.state().counters.errors += 1;
    }

    /// Empties the cache store. Loaded names are kept.
    pub fn clear_cache(&self) {
        self.state().cache.clear();
    }

    /// Drops loaded names, in-flight entries, the cache and the backlog.
    ///
    /// Backlog waiters fail with [`LoadError::Destroyed`]. Loads already handed to the host
    /// keep running and still release their slot, but no longer touch the cache or the
    /// loaded set. Counters are kept.
    pub fn destroy(&self) {
        let mut st = self.state();
        st.loaded.clear();
        st.in_flight.clear();
        st.cache.clear();
        st.backlog.clear();
        st.epoch += 1;
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn has_capacity(&self, st: &State) -> bool {
        self.limit.is_none_or(|max| st.current_loads < max)
    }

    /// Spawns the load task and registers it in flight. Caller holds the lock.
    fn spawn_load(
        self: &Arc<Self>,
        st: &mut State,
        name: &str,
        location: &str,
        priority: Priority,
    ) -> SharedLoad {
        let generation = st.next_generation;
        st.next_generation += 1;
        let ticket = Ticket {
            name: name.to_string(),
            location: location.to_string(),
            generation,
            epoch: st.epoch,
        };

        let me = Arc::clone(self);
        let join = tokio::spawn(async move { me.perform(ticket, priority).await });

        let loc = location.to_string();
        let load = join
            .map(move |res| match res {
                Ok(outcome) => outcome,
                Err(e) => Err(LoadError::failed(loc, format!("load task aborted: {e}"))),
            })
            .boxed()
            .shared();

        st.in_flight.insert(
            name.to_string(),
            InFlight {
                generation,
                load: load.clone(),
            },
        );
        load
    }

    async fn perform(self: Arc<Self>, ticket: Ticket, priority: Priority) -> Result<LoadOutcome, LoadError> {
        let started = Instant::now();
        if let Err(e) = self.admit(&ticket.name, &ticket.location, priority).await {
            tracing::debug!(module = %ticket.name, err = %e, "queued load rejected");
            self.record_error();
            self.forget(&ticket);
            return Err(e);
        }

        let target = LoadTarget {
            module: &ticket.name,
            location: &ticket.location,
            priority,
        };
        let load = load_with_retry(self.host.as_ref(), target, self.params, &self.bus);
        let (attempts, result) = match AssertUnwindSafe(load).catch_unwind().await {
            Ok(LoadReport { attempts, result }) => (Some(attempts), result),
            Err(_) => {
                tracing::error!(module = %ticket.name, location = %ticket.location, "host panicked while loading");
                (None, Err(LoadError::failed(&ticket.location, "host panicked")))
            }
        };
        self.complete(&ticket, started.elapsed(), attempts, result)
    }

    /// Waits for an admission slot. On return the slot is held by the caller.
    async fn admit(&self, name: &str, location: &str, priority: Priority) -> Result<(), LoadError> {
        let rx = {
            let mut st = self.state();
            if priority.bypasses_cap() || self.has_capacity(&st) {
                st.current_loads += 1;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                let seq = st.next_seq;
                st.next_seq += 1;
                st.backlog.push(BacklogEntry {
                    name: name.to_string(),
                    priority,
                    seq,
                    admit: tx,
                });
                Some(rx)
            }
        };

        let Some(rx) = rx else { return Ok(()) };
        self.bus.publish(
            Event::new(EventKind::LoadQueued)
                .with_module(name)
                .with_location(location)
                .with_priority(priority),
        );
        rx.await.map_err(|_| LoadError::Destroyed)
    }

    fn complete(
        &self,
        ticket: &Ticket,
        elapsed: Duration,
        attempts: Option<u32>,
        result: Result<UnitHandle, LoadError>,
    ) -> Result<LoadOutcome, LoadError> {
        let (name, location) = (ticket.name.as_str(), ticket.location.as_str());
        let mut st = self.state();
        st.current_loads = st.current_loads.saturating_sub(1);
        if st.in_flight.get(name).is_some_and(|f| f.generation == ticket.generation) {
            st.in_flight.remove(name);
        }
        let current = st.epoch == ticket.epoch;

        let (event, outcome) = match result {
            Ok(handle) => {
                let bytes = handle
                    .bytes()
                    .unwrap_or_else(|| self.registry.estimated_size(location));
                st.counters.record_load(elapsed, bytes);
                if current {
                    if !st.loaded.iter().any(|n| n == name) {
                        st.loaded.push(name.to_string());
                    }
                    st.cache
                        .put(name, CacheEntry::new(name, handle.clone(), elapsed));
                }
                let ev = Event::new(EventKind::LoadSucceeded)
                    .with_module(name)
                    .with_location(location)
                    .with_elapsed(elapsed)
                    .with_bytes(bytes);
                let outcome = LoadOutcome {
                    module: name.to_string(),
                    from_cache: false,
                    handle,
                };
                (ev, Ok(outcome))
            }
            Err(e) => {
                st.counters.errors += 1;
                tracing::warn!(module = name, location, err = %e, "module load failed");
                let ev = Event::new(EventKind::LoadFailed)
                    .with_module(name)
                    .with_location(location)
                    .with_reason(e.to_string());
                (ev, Err(e))
            }
        };

        self.admit_backlog(&mut st);
        drop(st);

        if current {
            self.bus.publish(match attempts {
                Some(n) => event.with_attempt(n),
                None => event,
            });
        }
        outcome
    }

    /// Hands freed slots to the best backlog entries.
    fn admit_backlog(&self, st: &mut State) {
        while self.has_capacity(st) {
            let Some(next) = st.backlog.pop() else { break };
            st.current_loads += 1;
            if next.admit.send(()).is_err() {
                tracing::debug!(module = %next.name, "backlog waiter went away");
                st.current_loads -= 1;
            }
        }
    }

    fn forget(&self, ticket: &Ticket) {
        let mut st = self.state();
        if st
            .in_flight
            .get(&ticket.name)
            .is_some_and(|f| f.generation == ticket.generation)
        {
            st.in_flight.remove(&ticket.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitHost;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tokio::sync::Notify;

    /// Host whose loads finish only when the test releases them.
    #[derive(Default)]
    struct GatedHost {
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        started: Mutex<Vec<String>>,
        failing: Mutex<HashSet<String>>,
    }

    impl GatedHost {
        fn gate(&self, location: &str) -> Arc<Notify> {
            self.gates
                .lock()
                .unwrap()
                .entry(location.to_string())
                .or_default()
                .clone()
        }

        fn release(&self, location: &str) {
            self.gate(location).notify_one();
        }

        fn fail(&self, location: &str) {
            self.failing.lock().unwrap().insert(location.to_string());
        }

        fn started(&self) -> Vec<String> {
            self.started.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl UnitHost for GatedHost {
        fn find_active(&self, _location: &str) -> Option<UnitHandle> {
            None
        }

        async fn inject(&self, location: &str) -> Result<UnitHandle, LoadError> {
            self.started.lock().unwrap().push(location.to_string());
            let gate = self.gate(location);
            gate.notified().await;
            if self.failing.lock().unwrap().contains(location) {
                return Err(LoadError::failed(location, "boom"));
            }
            Ok(UnitHandle::new(location))
        }
    }

    /// Host that takes a fixed time per load and records its peak concurrency.
    struct TimedHost {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl TimedHost {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl UnitHost for TimedHost {
        fn find_active(&self, _location: &str) -> Option<UnitHandle> {
            None
        }

        async fn inject(&self, location: &str) -> Result<UnitHandle, LoadError> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let now = self.active.fetch_add(1, AtomicOrdering::SeqCst) + 1;
            self.peak.fetch_max(now, AtomicOrdering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, AtomicOrdering::SeqCst);
            Ok(UnitHandle::new(location))
        }
    }

    fn scheduler(max_concurrent: usize, host: HostRef) -> Arc<Scheduler> {
        let cfg = Config {
            max_concurrent,
            ..Config::default()
        };
        Scheduler::new(&cfg, Arc::new(ModuleRegistry::default()), host, Bus::new(256))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..2_000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not reached");
    }

    fn spawn_request(
        s: &Arc<Scheduler>,
        name: &'static str,
        priority: Priority,
    ) -> tokio::task::JoinHandle<Result<LoadOutcome, LoadError>> {
        let s = Arc::clone(s);
        tokio::spawn(async move { s.request(name, &format!("/js/{name}.js"), priority).await })
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_is_never_exceeded() {
        let host = TimedHost::new(Duration::from_millis(100));
        let s = scheduler(3, host.clone());

        let names = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let prios = [Priority::Low, Priority::Normal, Priority::High];
        let reqs = names.iter().enumerate().map(|(i, n)| {
            let s = Arc::clone(&s);
            async move { s.request(n, &format!("/js/{n}.js"), prios[i % 3]).await }
        });
        let results = futures::future::join_all(reqs).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(host.calls.load(AtomicOrdering::SeqCst), 8);
        assert!(host.peak.load(AtomicOrdering::SeqCst) <= 3);
        assert_eq!(s.metrics().current_loads, 0);
        assert_eq!(s.metrics().modules_loaded, 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_requests_share_one_load() {
        let host = TimedHost::new(Duration::from_millis(50));
        let s = scheduler(4, host.clone());

        let (a, b) = tokio::join!(
            s.request("mbti", "/js/mbti-test.js", Priority::Normal),
            s.request("mbti", "/js/mbti-test.js", Priority::High),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(host.calls.load(AtomicOrdering::SeqCst), 1);
        assert!(!s.is_in_flight("mbti"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_request_hits_cache() {
        let host = TimedHost::new(Duration::from_millis(10));
        let s = scheduler(4, host.clone());

        let first = s.request("tarot", "/js/tarot.js", Priority::Normal).await.unwrap();
        let second = s.request("tarot", "/js/tarot.js", Priority::Normal).await.unwrap();

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(host.calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(s.metrics().cache_hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_entry_reloads() {
        let host = TimedHost::new(Duration::from_millis(10));
        let s = scheduler(4, host.clone());

        s.request("tarot", "/js/tarot.js", Priority::Normal).await.unwrap();
        tokio::time::advance(Duration::from_secs(60 * 60 * 24 + 1)).await;
        let again = s.request("tarot", "/js/tarot.js", Priority::Normal).await.unwrap();

        assert!(!again.from_cache);
        assert_eq!(host.calls.load(AtomicOrdering::SeqCst), 2);
        assert_eq!(s.metrics().cache_hits, 0);
    }

    #[tokio::test]
    async fn test_critical_bypasses_saturated_cap() {
        let host = Arc::new(GatedHost::default());
        let s = scheduler(1, host.clone());

        let normal = spawn_request(&s, "fortune", Priority::Normal);
        wait_until(|| host.started().len() == 1).await;

        let critical = spawn_request(&s, "main", Priority::Critical);
        wait_until(|| host.started().len() == 2).await;

        assert_eq!(s.metrics().current_loads, 2);
        assert_eq!(s.metrics().queue_size, 0);

        host.release("/js/fortune.js");
        host.release("/js/main.js");
        assert!(normal.await.unwrap().is_ok());
        assert!(critical.await.unwrap().is_ok());
        assert_eq!(s.metrics().current_loads, 0);
    }

    #[tokio::test]
    async fn test_backlog_drains_by_priority_then_fifo() {
        let host = Arc::new(GatedHost::default());
        let s = scheduler(1, host.clone());

        let blocker = spawn_request(&s, "x", Priority::Normal);
        wait_until(|| host.started().len() == 1).await;

        let a = spawn_request(&s, "a", Priority::Normal);
        wait_until(|| s.metrics().queue_size == 1).await;
        let b = spawn_request(&s, "b", Priority::High);
        wait_until(|| s.metrics().queue_size == 2).await;
        let c = spawn_request(&s, "c", Priority::Normal);
        wait_until(|| s.metrics().queue_size == 3).await;

        for loc in ["/js/a.js", "/js/b.js", "/js/c.js", "/js/x.js"] {
            host.release(loc);
        }
        for h in [blocker, a, b, c] {
            assert!(h.await.unwrap().is_ok());
        }

        assert_eq!(
            host.started(),
            ["/js/x.js", "/js/b.js", "/js/a.js", "/js/c.js"]
        );
    }

    #[tokio::test]
    async fn test_high_priority_page_module_jumps_ahead() {
        let host = Arc::new(GatedHost::default());
        let s = scheduler(1, host.clone());

        let mbti = spawn_request(&s, "mbti", Priority::Normal);
        wait_until(|| host.started().len() == 1).await;

        let fortune = spawn_request(&s, "fortune", Priority::High);
        wait_until(|| s.metrics().queue_size == 1).await;
        let tarot = spawn_request(&s, "tarot", Priority::Normal);
        wait_until(|| s.metrics().queue_size == 2).await;

        host.release("/js/mbti.js");
        wait_until(|| host.started().len() == 2).await;
        assert_eq!(host.started()[1], "/js/fortune.js");
        assert_eq!(s.metrics().current_loads, 1);
        assert_eq!(s.metrics().queue_size, 1);

        host.release("/js/fortune.js");
        host.release("/js/tarot.js");
        for h in [mbti, fortune, tarot] {
            assert!(h.await.unwrap().is_ok());
        }
        assert_eq!(host.started()[2], "/js/tarot.js");
    }

    #[tokio::test]
    async fn test_failure_releases_slot_for_backlog() {
        let host = Arc::new(GatedHost::default());
        host.fail("/js/broken.js");
        let s = scheduler(1, host.clone());

        let broken = spawn_request(&s, "broken", Priority::Normal);
        wait_until(|| host.started().len() == 1).await;
        let next = spawn_request(&s, "zodiac", Priority::Low);
        wait_until(|| s.metrics().queue_size == 1).await;

        host.release("/js/zodiac.js");
        host.release("/js/broken.js");

        let err = broken.await.unwrap().unwrap_err();
        assert_eq!(err.as_label(), "load_failed");
        assert!(next.await.unwrap().is_ok());

        let m = s.metrics();
        assert_eq!(m.errors, 1);
        assert_eq!(m.modules_loaded, 1);
        assert_eq!(s.loaded_modules(), ["zodiac"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_rejects_and_clears_in_flight() {
        let host: HostRef = crate::units::HostFn::arc(|_location: String| async move {
            std::future::pending::<Result<UnitHandle, LoadError>>().await
        });
        let s = scheduler(4, host);

        let err = s
            .request("manseryeok", "/js/manseryeok-database.js", Priority::Normal)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::Timeout { timeout, .. } if timeout == Duration::from_secs(10)));
        assert!(!s.is_in_flight("manseryeok"));
        assert_eq!(s.metrics().current_loads, 0);
        assert_eq!(s.metrics().errors, 1);
    }

    #[tokio::test]
    async fn test_destroy_fails_backlog_waiters() {
        let host = Arc::new(GatedHost::default());
        let s = scheduler(1, host.clone());

        let running = spawn_request(&s, "fortune", Priority::Normal);
        wait_until(|| host.started().len() == 1).await;
        let queued = spawn_request(&s, "tarot", Priority::Normal);
        wait_until(|| s.metrics().queue_size == 1).await;

        s.destroy();
        assert_eq!(queued.await.unwrap().unwrap_err(), LoadError::Destroyed);
        assert!(!s.is_in_flight("fortune"));
        assert_eq!(s.metrics().errors, 1);

        host.release("/js/fortune.js");
        assert!(running.await.unwrap().is_ok());
        // finished after destroy: slot released, state untouched
        assert_eq!(s.metrics().current_loads, 0);
        assert!(s.loaded_modules().is_empty());
        assert_eq!(s.metrics().cache_size, 0);
        assert_eq!(s.metrics().errors, 1);
    }

    #[tokio::test]
    async fn test_host_panic_releases_slot_and_in_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let host: HostRef = crate::units::HostFn::arc(move |location: String| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, AtomicOrdering::SeqCst);
                if location.contains("boom") {
                    panic!("adapter exploded");
                }
                Ok(UnitHandle::new(location))
            }
        });
        let s = scheduler(1, host);
        let mut rx = s.bus.subscribe();

        let err = s.request("boom", "/js/boom.js", Priority::Normal).await.unwrap_err();
        assert_eq!(err.as_label(), "load_failed");

        let m = s.metrics();
        assert_eq!(m.current_loads, 0);
        assert_eq!(m.errors, 1);
        assert!(!s.is_in_flight("boom"));

        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|ev| ev.kind == EventKind::LoadFailed)
            .unwrap();
        assert_eq!(failed.module.as_deref(), Some("boom"));
        assert_eq!(failed.attempt, None);

        // the slot is free again and the failure is not memoized
        let next = tokio::time::timeout(
            Duration::from_secs(5),
            s.request("tarot", "/js/tarot.js", Priority::Normal),
        )
        .await
        .unwrap();
        assert!(next.is_ok());
        assert!(s.request("boom", "/js/boom.js", Priority::Normal).await.is_err());
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
        assert_eq!(s.metrics().errors, 2);
    }

    #[tokio::test]
    async fn test_failed_event_carries_attempt_count() {
        let host = Arc::new(GatedHost::default());
        host.fail("/js/broken.js");
        let s = scheduler(2, host.clone());
        let mut rx = s.bus.subscribe();

        let broken = spawn_request(&s, "broken", Priority::Normal);
        wait_until(|| host.started().len() == 1).await;
        host.release("/js/broken.js");
        assert!(broken.await.unwrap().is_err());

        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|ev| ev.kind == EventKind::LoadFailed)
            .unwrap();
        assert_eq!(failed.attempt, Some(1));
        assert_eq!(failed.location.as_deref(), Some("/js/broken.js"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_metrics_track_bytes_and_average() {
        let registry = ModuleRegistry::builder()
            .sized_module("a", "/js/a.js", 1_000)
            .sized_module("b", "/js/b.js", 3_000)
            .build();
        let host = TimedHost::new(Duration::from_millis(100));
        let s = Scheduler::new(&Config::default(), Arc::new(registry), host, Bus::new(16));

        s.request("a", "/js/a.js", Priority::Normal).await.unwrap();

        let m = s.metrics();
        assert_eq!(m.modules_loaded, 1);
        assert_eq!(m.total_bytes, 1_000);
        assert_eq!(m.estimated_bytes_saved, 3_000);
        assert!((m.average_load_time_ms - 100.0).abs() < 1.0);
        assert_eq!(m.loaded_count, 1);
        assert_eq!(m.cache_size, 1);
    }
}
