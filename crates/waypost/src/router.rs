//! Router composition root
//!
//! Owns construction and teardown of the whole subsystem: the shared state
//! object, the prefetch scheduler, the content patcher, and the navigation
//! controller. The host drives it with `LinkEvent`s (or the per-trigger
//! methods) and reads the live `DocumentShell` back out; nothing in here is
//! ambient global state.

use crate::classify::{AnchorMeta, LinkClassifier};
use crate::config::RouterConfig;
use crate::document::{DocumentShell, PageDocument};
use crate::fetch::PageFetcher;
use crate::history::HistoryRecord;
use crate::navigate::{NavigationController, NavigationOutcome};
use crate::patch::{recompute_active_nav, ContentPatcher};
use crate::scheduler::{PrefetchScheduler, PrefetchStats};
use crate::state::{NavState, RouterState};
use crate::widget::Widget;
use crate::{CacheStats, Result};
use std::sync::{Arc, Mutex};
use tracing::info;

/// A host-reported link interaction
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// Link activated
    Click {
        /// Raw href
        href: String,
        /// Anchor attributes
        anchor: AnchorMeta,
    },
    /// A watched link entered the viewport
    Visible {
        /// Watch id from `watched_links`
        watch: u64,
    },
    /// Pointer entered a link
    HoverStart {
        /// Raw href
        href: String,
        /// Anchor attributes
        anchor: AnchorMeta,
    },
    /// Pointer left a link
    HoverEnd {
        /// Raw href
        href: String,
    },
    /// Touch began on a link
    TouchStart {
        /// Raw href
        href: String,
        /// Anchor attributes
        anchor: AnchorMeta,
    },
    /// Browser back/forward landed on a history record
    Pop {
        /// Record recovered from the history entry
        record: HistoryRecord,
    },
}

/// Snapshot of subsystem state
#[derive(Debug, Clone)]
pub struct RouterStats {
    /// Page cache statistics
    pub cache: CacheStats,
    /// Prefetch scheduler statistics
    pub prefetch: PrefetchStats,
    /// Navigation state machine flag
    pub nav_state: NavState,
    /// History entries
    pub history_len: usize,
}

/// The navigation and prefetch subsystem
pub struct Router {
    classifier: LinkClassifier,
    state: Arc<RouterState>,
    scheduler: PrefetchScheduler,
    patcher: Arc<ContentPatcher>,
    controller: NavigationController,
    shell: Arc<Mutex<DocumentShell>>,
    /// Parsed landing page, kept for arming the initial watches
    initial_doc: PageDocument,
}

impl Router {
    /// Build the subsystem positioned on the landing page
    ///
    /// `initial_markup` is the full payload the landing page was served
    /// with; its parse seeds the shell and the initial link watches. The
    /// connection profile in `config` is consulted once, here.
    pub fn new(
        config: RouterConfig,
        fetcher: Arc<dyn PageFetcher>,
        initial_path: &str,
        initial_markup: &str,
        widgets: Vec<Box<dyn Widget>>,
    ) -> Result<Self> {
        let classifier = LinkClassifier::new(&config.origin)?;
        let initial_doc = PageDocument::parse(initial_markup)?;

        let mut shell = DocumentShell::from_document(&initial_doc);
        recompute_active_nav(&mut shell.nav_links, initial_path);
        let shell = Arc::new(Mutex::new(shell));

        let state = Arc::new(RouterState::new(initial_path));
        let scheduler = PrefetchScheduler::new(
            state.clone(),
            fetcher.clone(),
            config.prefetch.clone(),
            &config.connection,
        );
        let patcher = Arc::new(ContentPatcher::new(
            classifier.clone(),
            scheduler.clone(),
            Arc::new(tokio::sync::Mutex::new(widgets)),
        ));
        let controller =
            NavigationController::new(state.clone(), fetcher, patcher.clone(), shell.clone());

        info!(origin = %config.origin, path = %initial_path, "router constructed");

        Ok(Self {
            classifier,
            state,
            scheduler,
            patcher,
            controller,
            shell,
            initial_doc,
        })
    }

    /// Begin observing: defer-start the scheduler and watch the landing
    /// page's eligible links
    pub fn start(&self) {
        self.scheduler.start();
        self.patcher.rearm(&self.initial_doc);
    }

    /// Dispatch a host event
    ///
    /// Navigation-producing events (click, pop) return their outcome;
    /// prefetch triggers return `None`.
    pub async fn handle(&self, event: LinkEvent) -> Option<NavigationOutcome> {
        match event {
            LinkEvent::Click { href, anchor } => Some(self.on_click(&anchor, &href).await),
            LinkEvent::Pop { record } => Some(self.on_pop(&record).await),
            LinkEvent::Visible { watch } => {
                self.scheduler.visible(watch);
                None
            }
            LinkEvent::HoverStart { href, anchor } => {
                if self.classifier.should_intercept(&anchor, &href) {
                    self.scheduler.hover_start(&self.classifier.normalize(&href));
                }
                None
            }
            LinkEvent::HoverEnd { href } => {
                self.scheduler.hover_end(&self.classifier.normalize(&href));
                None
            }
            LinkEvent::TouchStart { href, anchor } => {
                if self.classifier.should_intercept(&anchor, &href) {
                    self.scheduler.touch_start(&self.classifier.normalize(&href));
                }
                None
            }
        }
    }

    /// Intercepted link activation: classify, then navigate
    pub async fn on_click(&self, anchor: &AnchorMeta, href: &str) -> NavigationOutcome {
        if !self.classifier.should_intercept(anchor, href) {
            return NavigationOutcome::NotIntercepted;
        }
        self.controller
            .navigate(&self.classifier.normalize(href))
            .await
    }

    /// History pop: load the record's path, bypassing the navigating guard
    pub async fn on_pop(&self, record: &HistoryRecord) -> NavigationOutcome {
        self.controller.pop(record).await
    }

    /// Programmatic navigation to a normalized path
    pub async fn navigate(&self, path: &str) -> NavigationOutcome {
        self.controller.navigate(path).await
    }

    /// Move the history cursor back; feed the record to `on_pop`
    pub fn back(&self) -> Option<HistoryRecord> {
        self.controller.back()
    }

    /// Move the history cursor forward; feed the record to `on_pop`
    pub fn forward(&self) -> Option<HistoryRecord> {
        self.controller.forward()
    }

    /// Current location path
    pub fn current_path(&self) -> String {
        self.state.location()
    }

    /// Handle on the live document the host renders from
    pub fn shell(&self) -> Arc<Mutex<DocumentShell>> {
        self.shell.clone()
    }

    /// Current (path, watch id) pairs for the host's visibility observer
    pub fn watched_links(&self) -> Vec<(String, u64)> {
        self.patcher.watched_links()
    }

    /// Statistics snapshot
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            cache: self.state.cache.stats(),
            prefetch: self.scheduler.stats(),
            nav_state: self.state.nav_state(),
            history_len: self.controller.history_len(),
        }
    }

    /// Tear down: abort dwell timers, detach all watches
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
        self.patcher.detach();
        info!("router shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefetchConfig;
    use crate::fetch::testing::page_markup;
    use crate::fetch::StaticFetcher;
    use std::time::Duration;

    fn router(fetcher: Arc<StaticFetcher>) -> Router {
        let config = RouterConfig::new("https://site.example").with_prefetch(
            PrefetchConfig::default().with_startup_deferral(Duration::ZERO),
        );
        let router = Router::new(
            config,
            fetcher,
            "/",
            &page_markup("/"),
            Vec::new(),
        )
        .unwrap();
        router.start();
        router
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn visible_then_click_serves_from_cache() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("/blog/linked", page_markup("/blog/linked"));
        let router = router(fetcher.clone());
        settle().await;

        let (_, watch) = router
            .watched_links()
            .into_iter()
            .find(|(path, _)| path == "/blog/linked")
            .unwrap();
        router.handle(LinkEvent::Visible { watch }).await;
        settle().await;
        assert_eq!(fetcher.calls(), 1);

        let outcome = router
            .handle(LinkEvent::Click {
                href: "/blog/linked".into(),
                anchor: AnchorMeta::default(),
            })
            .await;

        assert_eq!(
            outcome,
            Some(NavigationOutcome::Completed { from_cache: true })
        );
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(router.current_path(), "/blog/linked");

        let shell = router.shell();
        let shell = shell.lock().unwrap();
        assert_eq!(shell.title, "blog-linked");
        assert_eq!(shell.active_nav(), vec!["/blog"]);
    }

    #[tokio::test(start_paused = true)]
    async fn ineligible_click_is_not_intercepted() {
        let fetcher = Arc::new(StaticFetcher::new());
        let router = router(fetcher.clone());
        settle().await;

        let outcome = router
            .handle(LinkEvent::Click {
                href: "/report.pdf".into(),
                anchor: AnchorMeta::default().with_target("_blank"),
            })
            .await;

        assert_eq!(outcome, Some(NavigationOutcome::NotIntercepted));
        assert_eq!(router.stats().history_len, 1);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hover_events_route_through_the_dwell_timer() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("/docs", page_markup("/docs"));
        let router = router(fetcher.clone());
        settle().await;

        // hover-out before the dwell elapses cancels the fetch
        router
            .handle(LinkEvent::HoverStart {
                href: "https://site.example/docs".into(),
                anchor: AnchorMeta::default(),
            })
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        router
            .handle(LinkEvent::HoverEnd {
                href: "https://site.example/docs".into(),
            })
            .await;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fetcher.calls(), 0);

        // a full dwell fetches once, keyed by the normalized path
        router
            .handle(LinkEvent::HoverStart {
                href: "https://site.example/docs".into(),
                anchor: AnchorMeta::default(),
            })
            .await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(fetcher.calls(), 1);
        assert!(router.stats().cache.entries == 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pop_event_restores_previous_page() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("/", page_markup("/"));
        fetcher.insert("/blog", page_markup("/blog"));
        let router = router(fetcher.clone());
        settle().await;

        router.navigate("/blog").await;
        assert_eq!(router.current_path(), "/blog");

        // the landing page was never cached, so the pop refetches it
        let record = router.back().unwrap();
        let outcome = router.handle(LinkEvent::Pop { record }).await;

        assert_eq!(
            outcome,
            Some(NavigationOutcome::Completed { from_cache: false })
        );
        assert_eq!(router.current_path(), "/");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_prefetching() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("/blog/linked", page_markup("/blog/linked"));
        let router = router(fetcher.clone());
        settle().await;

        let watched = router.watched_links();
        assert!(!watched.is_empty());

        router.shutdown();
        assert!(router.watched_links().is_empty());

        let (_, watch) = watched[0].clone();
        router.handle(LinkEvent::Visible { watch }).await;
        settle().await;
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_reflect_activity() {
        let fetcher = Arc::new(StaticFetcher::new());
        fetcher.insert("/blog", page_markup("/blog"));
        let router = router(fetcher.clone());
        settle().await;

        router.navigate("/blog").await;
        let stats = router.stats();

        assert_eq!(stats.cache.entries, 1);
        assert_eq!(stats.history_len, 2);
        assert_eq!(stats.nav_state, NavState::Idle);
        assert!(stats.prefetch.enabled);
    }
}
