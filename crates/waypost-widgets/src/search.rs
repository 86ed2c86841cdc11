//! Full-text search overlay
//!
//! Debounces keystrokes by 300 ms and issues at most one query for a burst
//! of typing. Clearing the input clears the results without a request.

use crate::api::{encode_query, ApiClient};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;
use waypost::{PageContext, Widget};

/// Keystroke debounce before a query is issued
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    /// Target URL
    #[serde(rename = "URL")]
    pub url: String,
    /// Result title
    #[serde(rename = "Title")]
    pub title: String,
    /// Content kind, e.g. `post`
    #[serde(rename = "Type")]
    pub kind: String,
    /// Match snippet
    #[serde(rename = "Snippet", default)]
    pub snippet: String,
}

#[derive(Debug, Default)]
struct SearchState {
    open: bool,
    query: String,
    results: Vec<SearchResult>,
    searching: bool,
    wired: bool,
}

struct Inner {
    api: Arc<dyn ApiClient>,
    state: Mutex<SearchState>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

/// The search overlay collaborator
#[derive(Clone)]
pub struct SearchOverlay {
    inner: Arc<Inner>,
}

impl SearchOverlay {
    /// Build the overlay over an API client
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(SearchState::default()),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Open the overlay
    pub fn open(&self) {
        self.inner.state.lock().expect("search state poisoned").open = true;
    }

    /// Close the overlay, clearing query and results
    pub fn close(&self) {
        let mut state = self.inner.state.lock().expect("search state poisoned");
        state.open = false;
        state.query.clear();
        state.results.clear();
    }

    /// Whether the overlay is open
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().expect("search state poisoned").open
    }

    /// Record a keystroke: restart the debounce timer, or clear results
    /// immediately when the query is empty
    pub fn set_query(&self, query: &str) {
        let query = query.trim().to_string();
        {
            let mut state = self.inner.state.lock().expect("search state poisoned");
            state.query = query.clone();
            if query.is_empty() {
                state.results.clear();
                state.searching = false;
            } else {
                state.searching = true;
            }
        }

        let mut timer = self.inner.timer.lock().expect("search timer poisoned");
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        if query.is_empty() {
            return;
        }

        let overlay = self.clone();
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            overlay.run_search(&query).await;
        }));
    }

    /// Current results
    pub fn results(&self) -> Vec<SearchResult> {
        self.inner
            .state
            .lock()
            .expect("search state poisoned")
            .results
            .clone()
    }

    /// Whether a query is pending or in flight
    pub fn is_searching(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("search state poisoned")
            .searching
    }

    async fn run_search(&self, query: &str) {
        let path = format!("/api/search?q={}", encode_query(query));
        let results = match self.inner.api.get_json(&path).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "search failed");
                Vec::new()
            }
        };

        let mut state = self.inner.state.lock().expect("search state poisoned");
        // a newer keystroke may have superseded this query
        if state.query == query {
            state.results = results;
            state.searching = false;
        }
    }
}

#[async_trait]
impl Widget for SearchOverlay {
    fn name(&self) -> &str {
        "search-overlay"
    }

    async fn initialize(&mut self, _page: &PageContext) {
        let mut state = self.inner.state.lock().expect("search state poisoned");
        if state.wired {
            return;
        }
        state.wired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticApiClient;
    use serde_json::json;

    fn api_with_hits(query: &str) -> Arc<StaticApiClient> {
        let api = Arc::new(StaticApiClient::new());
        api.on_get(
            format!("/api/search?q={}", encode_query(query)),
            json!([{
                "URL": "/blog/post-1",
                "Title": "Post one",
                "Type": "post",
                "Snippet": "…matched…"
            }]),
        );
        api
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_issues_one_query() {
        let api = api_with_hits("rust");
        let overlay = SearchOverlay::new(api.clone());
        overlay.open();

        overlay.set_query("ru");
        tokio::time::sleep(Duration::from_millis(100)).await;
        overlay.set_query("rus");
        tokio::time::sleep(Duration::from_millis(100)).await;
        overlay.set_query("rust");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(api.recorded_gets().len(), 1);
        let results = overlay.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].url, "/blog/post-1");
        assert!(!overlay.is_searching());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_clears_without_request() {
        let api = api_with_hits("rust");
        let overlay = SearchOverlay::new(api.clone());
        overlay.open();

        overlay.set_query("rust");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(overlay.results().len(), 1);

        overlay.set_query("");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(overlay.results().is_empty());
        assert_eq!(api.recorded_gets().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_renders_no_results() {
        let api = Arc::new(StaticApiClient::new());
        let overlay = SearchOverlay::new(api);
        overlay.open();

        overlay.set_query("anything");
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(overlay.results().is_empty());
        assert!(!overlay.is_searching());
    }

    #[tokio::test(start_paused = true)]
    async fn close_resets_state() {
        let api = api_with_hits("rust");
        let overlay = SearchOverlay::new(api);
        overlay.open();
        overlay.set_query("rust");
        tokio::time::sleep(Duration::from_millis(400)).await;

        overlay.close();
        assert!(!overlay.is_open());
        assert!(overlay.results().is_empty());
    }
}
