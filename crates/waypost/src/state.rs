//! Shared router state
//!
//! One explicit state object — page cache, fetch ledger, current location,
//! navigating flag — constructed by the composition root and passed by
//! `Arc` to the components that need it. The pending and in-flight sets
//! live together in a single `FetchLedger` behind one lock, so every
//! membership check and its corresponding mutation happen in one
//! synchronous critical section; the lock is never held across an await.

use crate::cache::PageCache;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};

/// Navigation state machine flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// No user-initiated navigation in progress
    Idle,
    /// A user-initiated navigation is in progress
    Navigating,
}

/// Pending FIFO queue plus in-flight set, guarded as one unit
///
/// Invariant: a path is never in `pending` and `in_flight` at the same
/// time. Paths move from pending to in-flight atomically during a drain
/// or when a hover/touch fetch upgrades a queued path.
#[derive(Debug, Default)]
struct FetchLedger {
    pending: VecDeque<String>,
    pending_set: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Shared state for the whole subsystem
pub struct RouterState {
    /// Page payload cache
    pub cache: PageCache,
    ledger: Mutex<FetchLedger>,
    location: RwLock<String>,
    navigating: AtomicBool,
}

impl RouterState {
    /// Create state positioned at the given initial path
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            cache: PageCache::new(),
            ledger: Mutex::new(FetchLedger::default()),
            location: RwLock::new(initial_path.into()),
            navigating: AtomicBool::new(false),
        }
    }

    /// Current location path
    pub fn location(&self) -> String {
        self.location.read().expect("location lock poisoned").clone()
    }

    /// Record a completed transition to a new location
    pub fn set_location(&self, path: &str) {
        *self.location.write().expect("location lock poisoned") = path.to_string();
    }

    /// Try to enter the `Navigating` state; false if already navigating
    pub fn try_begin_navigation(&self) -> bool {
        self.navigating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Return to `Idle`
    pub fn end_navigation(&self) {
        self.navigating.store(false, Ordering::Release);
    }

    /// Current navigation state
    pub fn nav_state(&self) -> NavState {
        if self.navigating.load(Ordering::Acquire) {
            NavState::Navigating
        } else {
            NavState::Idle
        }
    }

    /// Queue a path for background fetch if it is eligible: not cached,
    /// not already pending, not in flight. Returns whether it was queued.
    pub fn try_enqueue(&self, path: &str) -> bool {
        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");
        if self.cache.contains(path)
            || ledger.pending_set.contains(path)
            || ledger.in_flight.contains(path)
        {
            return false;
        }
        ledger.pending.push_back(path.to_string());
        ledger.pending_set.insert(path.to_string());
        true
    }

    /// Claim a path for an immediate (hover/touch) prefetch if it is
    /// eligible: not cached, not in flight. A queued path is upgraded —
    /// removed from pending as it enters in-flight. Returns whether the
    /// caller should fetch.
    pub fn try_begin_prefetch(&self, path: &str) -> bool {
        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");
        if self.cache.contains(path) || ledger.in_flight.contains(path) {
            return false;
        }
        if ledger.pending_set.remove(path) {
            ledger.pending.retain(|p| p != path);
        }
        ledger.in_flight.insert(path.to_string());
        true
    }

    /// Mark a foreground navigation fetch as in flight
    ///
    /// Navigation always proceeds with its own fetch; membership here only
    /// stops the scheduler from duplicating it. Returns whether the path
    /// was newly marked.
    pub fn begin_navigation_fetch(&self, path: &str) -> bool {
        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");
        if ledger.pending_set.remove(path) {
            ledger.pending.retain(|p| p != path);
        }
        ledger.in_flight.insert(path.to_string())
    }

    /// Remove a path from the in-flight set after its fetch completes
    pub fn finish_fetch(&self, path: &str) {
        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");
        ledger.in_flight.remove(path);
    }

    /// Pull up to `max - |in_flight|` paths off the pending queue in FIFO
    /// order, moving each into the in-flight set. Paths that got cached
    /// while queued are silently dropped.
    pub fn drain(&self, max: usize) -> Vec<String> {
        let mut ledger = self.ledger.lock().expect("ledger lock poisoned");
        let available = max.saturating_sub(ledger.in_flight.len());
        let mut claimed = Vec::new();

        while claimed.len() < available {
            let Some(path) = ledger.pending.pop_front() else {
                break;
            };
            ledger.pending_set.remove(&path);
            if self.cache.contains(&path) {
                continue;
            }
            ledger.in_flight.insert(path.clone());
            claimed.push(path);
        }

        claimed
    }

    /// Number of queued paths
    pub fn pending_len(&self) -> usize {
        self.ledger.lock().expect("ledger lock poisoned").pending.len()
    }

    /// Number of in-flight fetches
    pub fn in_flight_len(&self) -> usize {
        self.ledger.lock().expect("ledger lock poisoned").in_flight.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_is_deduplicated() {
        let state = RouterState::new("/");

        assert!(state.try_enqueue("/blog"));
        assert!(!state.try_enqueue("/blog"));
        assert_eq!(state.pending_len(), 1);
    }

    #[test]
    fn cached_paths_are_never_enqueued() {
        let state = RouterState::new("/");
        state.cache.put("/blog", "payload");

        assert!(!state.try_enqueue("/blog"));
    }

    #[test]
    fn in_flight_paths_are_never_enqueued() {
        let state = RouterState::new("/");

        assert!(state.try_begin_prefetch("/blog"));
        assert!(!state.try_enqueue("/blog"));
    }

    #[test]
    fn prefetch_upgrade_preserves_mutual_exclusion() {
        let state = RouterState::new("/");
        state.try_enqueue("/blog");

        assert!(state.try_begin_prefetch("/blog"));
        // moved, not duplicated
        assert_eq!(state.pending_len(), 0);
        assert_eq!(state.in_flight_len(), 1);
    }

    #[test]
    fn drain_respects_bound_and_fifo() {
        let state = RouterState::new("/");
        for path in ["/a", "/b", "/c", "/d", "/e"] {
            state.try_enqueue(path);
        }

        let claimed = state.drain(3);
        assert_eq!(claimed, vec!["/a", "/b", "/c"]);
        assert_eq!(state.in_flight_len(), 3);
        assert_eq!(state.pending_len(), 2);

        // nothing available while three are in flight
        assert!(state.drain(3).is_empty());

        state.finish_fetch("/a");
        assert_eq!(state.drain(3), vec!["/d"]);
    }

    #[test]
    fn drain_skips_paths_cached_while_queued() {
        let state = RouterState::new("/");
        state.try_enqueue("/a");
        state.try_enqueue("/b");
        state.cache.put("/a", "payload");

        assert_eq!(state.drain(3), vec!["/b"]);
        assert_eq!(state.pending_len(), 0);
    }

    #[test]
    fn navigation_guard_is_exclusive() {
        let state = RouterState::new("/");

        assert!(state.try_begin_navigation());
        assert!(!state.try_begin_navigation());
        assert_eq!(state.nav_state(), NavState::Navigating);

        state.end_navigation();
        assert!(state.try_begin_navigation());
    }

    #[test]
    fn navigation_fetch_upgrades_queued_path() {
        let state = RouterState::new("/");
        state.try_enqueue("/blog");

        assert!(state.begin_navigation_fetch("/blog"));
        assert_eq!(state.pending_len(), 0);
        assert_eq!(state.in_flight_len(), 1);

        state.finish_fetch("/blog");
        assert_eq!(state.in_flight_len(), 0);
    }
}
