//! Content patching after a successful page load
//!
//! Applies a parsed page to the live shell: swaps the main-content region,
//! updates the head patch targets, recomputes active-nav highlighting,
//! re-initializes collaborator widgets, and re-arms the scheduler's watch
//! subscriptions over the newly inserted links. Everything outside those
//! regions (header, footer, scripts) is left untouched.

use crate::classify::LinkClassifier;
use crate::document::{DocumentShell, NavLink, PageDocument};
use crate::scheduler::{PrefetchScheduler, Subscription};
use crate::widget::{PageContext, Widget};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Recompute active-nav highlighting for a new path
///
/// A link is active iff its target equals the path exactly, or the target
/// is not the root path and the new path starts with it. Links are visited
/// in document order; every qualifying link is marked.
pub fn recompute_active_nav(links: &mut [NavLink], path: &str) {
    for link in links.iter_mut() {
        link.active =
            link.href == path || (link.href != "/" && path.starts_with(link.href.as_str()));
    }
}

/// Patches the live shell from parsed page payloads
pub struct ContentPatcher {
    classifier: LinkClassifier,
    scheduler: PrefetchScheduler,
    widgets: Arc<tokio::sync::Mutex<Vec<Box<dyn Widget>>>>,
    /// Watches over the current page's links; replaced wholesale on re-arm
    subscriptions: Mutex<Vec<(String, Subscription)>>,
}

impl ContentPatcher {
    /// Build a patcher
    pub fn new(
        classifier: LinkClassifier,
        scheduler: PrefetchScheduler,
        widgets: Arc<tokio::sync::Mutex<Vec<Box<dyn Widget>>>>,
    ) -> Self {
        Self {
            classifier,
            scheduler,
            widgets,
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Apply a parsed page to the shell for the given path
    pub async fn apply(&self, shell: &Mutex<DocumentShell>, doc: &PageDocument, path: &str) {
        {
            let mut shell = shell.lock().expect("shell lock poisoned");
            if let Some(main) = &doc.main_html {
                shell.main_html = main.clone();
            }
            if let Some(title) = &doc.title {
                shell.title = title.clone();
            }
            if let Some(canonical) = &doc.canonical {
                shell.canonical = Some(canonical.clone());
            }
            if let Some(description) = &doc.description {
                shell.description = Some(description.clone());
            }
            recompute_active_nav(&mut shell.nav_links, path);
        }

        let ctx = PageContext::new(path);
        {
            let mut widgets = self.widgets.lock().await;
            for widget in widgets.iter_mut() {
                debug!(widget = widget.name(), path = %ctx.path, "re-initializing widget");
                widget.initialize(&ctx).await;
            }
        }

        self.rearm(doc);
    }

    /// Replace the watch set with subscriptions over the page's eligible
    /// links; the old tokens drop here, detaching their watches
    pub fn rearm(&self, doc: &PageDocument) {
        let watched: Vec<(String, Subscription)> = doc
            .links
            .iter()
            .filter(|a| self.classifier.should_intercept(&a.meta, &a.href))
            .map(|a| {
                let path = self.classifier.normalize(&a.href);
                let sub = self.scheduler.watch(path.clone());
                (path, sub)
            })
            .collect();

        debug!(links = watched.len(), "re-armed link watches");
        *self.subscriptions.lock().expect("subscription lock poisoned") = watched;
    }

    /// Snapshot of the current watches as (path, watch id) pairs, for the
    /// host to wire its visibility observer
    pub fn watched_links(&self) -> Vec<(String, u64)> {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .iter()
            .map(|(path, sub)| (path.clone(), sub.id()))
            .collect()
    }

    /// Drop all watches
    pub fn detach(&self) {
        self.subscriptions
            .lock()
            .expect("subscription lock poisoned")
            .clear();
    }
}
