//! Prefetch scheduler
//!
//! Opportunistically warms the page cache before the user commits to a
//! navigation, without competing with foreground work. Three triggers feed
//! it: viewport visibility (queued, drained with bounded concurrency),
//! hover dwell, and touch-start (both fetch immediately, bypassing the
//! queue and its bound — a documented asymmetry, not a bug). Prefetching
//! is strictly best-effort: failures are swallowed, nothing is retried,
//! and an in-flight fetch is never cancelled even if its target stops
//! being relevant.

use crate::config::{ConnectionProfile, PrefetchConfig};
use crate::fetch::PageFetcher;
use crate::state::RouterState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type WatchRegistry = Mutex<HashMap<u64, String>>;

/// Token for a watched link
///
/// Dropping the token detaches the watch; visibility reports against a
/// detached watch are ignored. Re-initialization after a content swap
/// replaces the whole token set, so stale observers cannot leak.
pub struct Subscription {
    id: u64,
    registry: Weak<WatchRegistry>,
}

impl Subscription {
    /// Identifier the host reports visibility against
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().expect("watch lock poisoned").remove(&self.id);
        }
    }
}

#[derive(Default)]
struct PrefetchCounters {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Scheduler statistics snapshot
#[derive(Debug, Clone)]
pub struct PrefetchStats {
    /// Prefetching permitted by the connection profile
    pub enabled: bool,
    /// Triggers are armed (deferred start has elapsed)
    pub armed: bool,
    /// Prefetches completed successfully
    pub completed: u64,
    /// Prefetches that failed (and were swallowed)
    pub failed: u64,
    /// Paths queued for background fetch
    pub pending: usize,
    /// Fetches currently in flight
    pub in_flight: usize,
}

struct Inner {
    state: Arc<RouterState>,
    fetcher: Arc<dyn PageFetcher>,
    config: PrefetchConfig,
    /// Connection gating, checked once at construction
    enabled: bool,
    /// Deferred start: triggers are ignored until this flips
    armed: AtomicBool,
    next_watch: AtomicU64,
    watches: Arc<WatchRegistry>,
    /// Active hover dwell timers by path
    dwell: Mutex<HashMap<String, JoinHandle<()>>>,
    counters: PrefetchCounters,
}

/// Background prefetch scheduler
///
/// Cheap to clone; clones share the same queue, timers, and counters.
#[derive(Clone)]
pub struct PrefetchScheduler {
    inner: Arc<Inner>,
}

impl PrefetchScheduler {
    /// Build a scheduler; the connection profile is consulted once here
    pub fn new(
        state: Arc<RouterState>,
        fetcher: Arc<dyn PageFetcher>,
        config: PrefetchConfig,
        connection: &ConnectionProfile,
    ) -> Self {
        let enabled = connection.allows_prefetch();
        if !enabled {
            info!("prefetch disabled by connection profile");
        }

        Self {
            inner: Arc::new(Inner {
                state,
                fetcher,
                config,
                enabled,
                armed: AtomicBool::new(false),
                next_watch: AtomicU64::new(1),
                watches: Arc::new(Mutex::new(HashMap::new())),
                dwell: Mutex::new(HashMap::new()),
                counters: PrefetchCounters::default(),
            }),
        }
    }

    /// Arm the triggers after the startup deferral
    ///
    /// Deferral stands in for an idle callback: background observation must
    /// not delay the host's first paint or first interaction.
    pub fn start(&self) {
        if !self.inner.enabled {
            return;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(inner.config.startup_deferral).await;
            inner.armed.store(true, Ordering::Release);
            debug!("prefetch triggers armed");
        });
    }

    /// Register a watch for an eligible link, returning its token
    pub fn watch(&self, path: impl Into<String>) -> Subscription {
        let id = self.inner.next_watch.fetch_add(1, Ordering::Relaxed);
        self.inner
            .watches
            .lock()
            .expect("watch lock poisoned")
            .insert(id, path.into());
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner.watches),
        }
    }

    /// Register watches for a batch of eligible links
    pub fn watch_links<I>(&self, paths: I) -> Vec<Subscription>
    where
        I: IntoIterator<Item = String>,
    {
        paths.into_iter().map(|p| self.watch(p)).collect()
    }

    /// Viewport trigger: a watched link became visible
    pub fn visible(&self, watch_id: u64) {
        let path = self
            .inner
            .watches
            .lock()
            .expect("watch lock poisoned")
            .get(&watch_id)
            .cloned();
        match path {
            Some(path) => self.link_visible(&path),
            None => debug!(watch_id, "visibility report for detached watch"),
        }
    }

    /// Viewport trigger by path: queue the link and schedule a drain
    pub fn link_visible(&self, path: &str) {
        if !self.inner.ready() || path == self.inner.state.location() {
            return;
        }
        if self.inner.state.try_enqueue(path) {
            debug!(%path, "queued for prefetch");
            schedule_drain(&self.inner);
        }
    }

    /// Hover trigger: start the dwell timer; the fetch fires only if the
    /// pointer stays for the full dwell
    pub fn hover_start(&self, path: &str) {
        if !self.inner.ready() {
            return;
        }

        let inner = self.inner.clone();
        let dwell_path = path.to_string();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.config.hover_dwell).await;
            inner
                .dwell
                .lock()
                .expect("dwell lock poisoned")
                .remove(&dwell_path);
            immediate_prefetch(&inner, &dwell_path);
        });

        let mut dwell = self.inner.dwell.lock().expect("dwell lock poisoned");
        if let Some(previous) = dwell.insert(path.to_string(), timer) {
            previous.abort();
        }
    }

    /// Hover trigger: the pointer left before the dwell elapsed
    pub fn hover_end(&self, path: &str) {
        let mut dwell = self.inner.dwell.lock().expect("dwell lock poisoned");
        if let Some(timer) = dwell.remove(path) {
            timer.abort();
        }
    }

    /// Touch trigger: fetch immediately, no dwell
    pub fn touch_start(&self, path: &str) {
        if !self.inner.ready() {
            return;
        }
        immediate_prefetch(&self.inner, path);
    }

    /// Abort dwell timers and detach all watches
    pub fn shutdown(&self) {
        let mut dwell = self.inner.dwell.lock().expect("dwell lock poisoned");
        for (_, timer) in dwell.drain() {
            timer.abort();
        }
        self.inner
            .watches
            .lock()
            .expect("watch lock poisoned")
            .clear();
        self.inner.armed.store(false, Ordering::Release);
    }

    /// Statistics snapshot
    pub fn stats(&self) -> PrefetchStats {
        PrefetchStats {
            enabled: self.inner.enabled,
            armed: self.inner.armed.load(Ordering::Acquire),
            completed: self.inner.counters.completed.load(Ordering::Relaxed),
            failed: self.inner.counters.failed.load(Ordering::Relaxed),
            pending: self.inner.state.pending_len(),
            in_flight: self.inner.state.in_flight_len(),
        }
    }
}

impl Inner {
    fn ready(&self) -> bool {
        self.enabled && self.armed.load(Ordering::Acquire)
    }
}

/// Immediate-fetch path shared by hover and touch: bypasses the queue (and
/// therefore the concurrency bound) but not the cache/in-flight
/// eligibility check
fn immediate_prefetch(inner: &Arc<Inner>, path: &str) {
    if path == inner.state.location() {
        return;
    }
    if inner.state.try_begin_prefetch(path) {
        spawn_fetch(inner, path.to_string());
    }
}

fn schedule_drain(inner: &Arc<Inner>) {
    let inner = inner.clone();
    tokio::spawn(async move {
        tokio::time::sleep(inner.config.drain_deferral).await;
        drain_now(&inner);
    });
}

/// Pull eligible paths off the queue up to the concurrency bound and fetch
/// each; the pending-to-in-flight move is atomic in the ledger
fn drain_now(inner: &Arc<Inner>) {
    for path in inner.state.drain(inner.config.max_concurrent) {
        spawn_fetch(inner, path);
    }
}

fn spawn_fetch(inner: &Arc<Inner>, path: String) {
    let inner = inner.clone();
    tokio::spawn(async move {
        match inner.fetcher.fetch_page(&path).await {
            Ok(payload) => {
                inner.state.cache.put(path.as_str(), payload);
                inner.counters.completed.fetch_add(1, Ordering::Relaxed);
                debug!(%path, "prefetched");
            }
            Err(e) => {
                // best-effort: never surfaces to the user
                inner.counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!(%path, error = %e, "prefetch failed, swallowed");
            }
        }
        inner.state.finish_fetch(&path);
        if inner.state.pending_len() > 0 {
            drain_now(&inner);
        }
    });
}
