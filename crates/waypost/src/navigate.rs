//! Navigation controller
//!
//! Two-state machine (`Idle` / `Navigating`) driving user-initiated and
//! history-initiated page transitions: cache lookup, network fallback,
//! history updates, content patching. A foreground fetch failure never
//! surfaces as an error — the controller requests a hard navigation from
//! the host instead, so the user always reaches the destination.
//!
//! The pop path deliberately bypasses the navigating guard: a back/forward
//! during an in-flight programmatic navigation races the two loads with no
//! defined winner (last completion wins the shell). The source behavior is
//! preserved and pinned by a test rather than fixed with a lock.

use crate::document::{DocumentShell, PageDocument};
use crate::fetch::PageFetcher;
use crate::history::{History, HistoryRecord};
use crate::patch::ContentPatcher;
use crate::state::RouterState;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The link is not the router's to handle; host performs its default
    NotIntercepted,
    /// Dropped: already at the target, or another navigation in progress
    Skipped,
    /// Soft navigation completed
    Completed {
        /// Payload came from the page cache, no network request issued
        from_cache: bool,
    },
    /// Soft navigation failed; the host must hard-navigate to the path
    HardFallback {
        /// Target path for the hard navigation
        path: String,
    },
}

/// Drives page transitions
pub struct NavigationController {
    state: Arc<RouterState>,
    fetcher: Arc<dyn PageFetcher>,
    patcher: Arc<ContentPatcher>,
    shell: Arc<Mutex<DocumentShell>>,
    history: Mutex<History>,
}

impl NavigationController {
    /// Build a controller; the initial location becomes the seed history
    /// entry (replaced, not pushed)
    pub fn new(
        state: Arc<RouterState>,
        fetcher: Arc<dyn PageFetcher>,
        patcher: Arc<ContentPatcher>,
        shell: Arc<Mutex<DocumentShell>>,
    ) -> Self {
        let mut history = History::new();
        history.replace(state.location());
        Self {
            state,
            fetcher,
            patcher,
            shell,
            history: Mutex::new(history),
        }
    }

    /// User-initiated navigation to a normalized path
    pub async fn navigate(&self, path: &str) -> NavigationOutcome {
        if path == self.state.location() {
            debug!(%path, "already at target, navigation skipped");
            return NavigationOutcome::Skipped;
        }
        if !self.state.try_begin_navigation() {
            debug!(%path, "navigation in progress, second navigation dropped");
            return NavigationOutcome::Skipped;
        }

        self.shell.lock().expect("shell lock poisoned").loading = true;
        self.history.lock().expect("history lock poisoned").push(path);

        let outcome = self.load_page(path, true).await;

        self.shell.lock().expect("shell lock poisoned").loading = false;
        self.state.end_navigation();
        outcome
    }

    /// History-initiated navigation from a pop record
    ///
    /// Does not check or set the navigating flag.
    pub async fn pop(&self, record: &HistoryRecord) -> NavigationOutcome {
        debug!(path = %record.path, "history pop");
        self.load_page(&record.path, false).await
    }

    /// Load a page into the shell: cache hit, else fetch-and-cache, else
    /// hard fallback
    pub async fn load_page(&self, path: &str, push_state: bool) -> NavigationOutcome {
        debug!(%path, push_state, "loading page");

        let (payload, from_cache) = match self.state.cache.get(path) {
            Some(payload) => (payload, true),
            None => {
                self.state.begin_navigation_fetch(path);
                let fetched = self.fetcher.fetch_page(path).await;
                self.state.finish_fetch(path);

                match fetched {
                    Ok(text) => (self.state.cache.put(path, text), false),
                    Err(e) => {
                        warn!(%path, error = %e, "navigation fetch failed, hard fallback");
                        return self.hard_fallback(path);
                    }
                }
            }
        };

        let doc = match PageDocument::parse(&payload) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(%path, error = %e, "payload unparseable, hard fallback");
                return self.hard_fallback(path);
            }
        };

        self.patcher.apply(&self.shell, &doc, path).await;

        {
            let mut shell = self.shell.lock().expect("shell lock poisoned");
            if !path.contains('#') {
                shell.reset_scroll();
            }
            shell.overlay.close_all();
        }
        self.state.set_location(path);

        NavigationOutcome::Completed { from_cache }
    }

    fn hard_fallback(&self, path: &str) -> NavigationOutcome {
        self.shell
            .lock()
            .expect("shell lock poisoned")
            .hard_navigate(path);
        NavigationOutcome::HardFallback {
            path: path.to_string(),
        }
    }

    /// Move the history cursor back; the host feeds the record to `pop`
    pub fn back(&self) -> Option<HistoryRecord> {
        self.history.lock().expect("history lock poisoned").back()
    }

    /// Move the history cursor forward; the host feeds the record to `pop`
    pub fn forward(&self) -> Option<HistoryRecord> {
        self.history.lock().expect("history lock poisoned").forward()
    }

    /// Number of history entries
    pub fn history_len(&self) -> usize {
        self.history.lock().expect("history lock poisoned").len()
    }

    /// Record the history cursor points at
    pub fn current_record(&self) -> Option<HistoryRecord> {
        self.history
            .lock()
            .expect("history lock poisoned")
            .current()
            .cloned()
    }
}
