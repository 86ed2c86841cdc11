//! Reaction bar
//!
//! Per-post emoji reactions. Initialization is keyed by the post slug: a
//! content swap onto the same post skips the refetch, a different post
//! reloads counts and the user's own reactions. Toggling requires a
//! session; callers route `Unauthorized` into the sign-in overlay.

use crate::api::ApiClient;
use crate::{Result, WidgetError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;
use waypost::{PageContext, Widget};

/// Aggregate for one emoji on a post
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReactionCount {
    /// The emoji
    pub emoji: String,
    /// Total reactions
    pub count: u64,
    /// Names of (some of) the reacting users
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Default)]
struct ReactionState {
    initialized_for: Option<String>,
    counts: HashMap<String, ReactionCount>,
    user_reactions: Vec<String>,
    logged_in: bool,
}

struct Inner {
    api: Arc<dyn ApiClient>,
    state: Mutex<ReactionState>,
}

/// The reaction bar collaborator
#[derive(Clone)]
pub struct Reactions {
    inner: Arc<Inner>,
}

impl Reactions {
    /// Build the reaction bar over an API client
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(ReactionState::default()),
            }),
        }
    }

    /// Count for an emoji on the current post
    pub fn count(&self, emoji: &str) -> u64 {
        self.inner
            .state
            .lock()
            .expect("reaction state poisoned")
            .counts
            .get(emoji)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Whether the signed-in user has reacted with this emoji
    pub fn is_active(&self, emoji: &str) -> bool {
        self.inner
            .state
            .lock()
            .expect("reaction state poisoned")
            .user_reactions
            .iter()
            .any(|e| e == emoji)
    }

    /// Hover tooltip for an emoji button
    pub fn tooltip_for(&self, emoji: &str) -> String {
        let state = self.inner.state.lock().expect("reaction state poisoned");
        state
            .counts
            .get(emoji)
            .map(|c| tooltip(&c.users, c.count))
            .unwrap_or_default()
    }

    /// Toggle the user's reaction; `Unauthorized` means sign-in is needed
    pub async fn toggle(&self, emoji: &str) -> Result<bool> {
        let (slug, logged_in) = {
            let state = self.inner.state.lock().expect("reaction state poisoned");
            (state.initialized_for.clone(), state.logged_in)
        };
        let Some(slug) = slug else {
            return Err(WidgetError::Unauthorized);
        };
        if !logged_in {
            return Err(WidgetError::Unauthorized);
        }

        let reply = self
            .inner
            .api
            .post_json("/api/reactions", &json!({"post": slug, "emoji": emoji}))
            .await?;
        let added = reply
            .get("added")
            .and_then(|a| a.as_bool())
            .unwrap_or(false);

        {
            let mut state = self.inner.state.lock().expect("reaction state poisoned");
            if added {
                state.user_reactions.push(emoji.to_string());
            } else {
                state.user_reactions.retain(|e| e != emoji);
            }
        }
        self.refresh_counts(&slug).await;
        Ok(added)
    }

    async fn refresh_counts(&self, slug: &str) {
        let path = format!("/api/reactions?post={}", crate::api::encode_query(slug));
        match self.inner.api.get_json(&path).await {
            Ok(value) => {
                let counts: Vec<ReactionCount> =
                    serde_json::from_value(value).unwrap_or_default();
                let mut state = self.inner.state.lock().expect("reaction state poisoned");
                state.counts = counts.into_iter().map(|c| (c.emoji.clone(), c)).collect();
            }
            Err(e) => debug!(error = %e, "reaction counts fetch failed"),
        }
    }

    async fn refresh_user(&self, slug: &str) {
        let path = format!(
            "/api/reactions/user?post={}",
            crate::api::encode_query(slug)
        );
        match self.inner.api.get_json(&path).await {
            Ok(value) => {
                let reactions: Vec<String> = serde_json::from_value(value).unwrap_or_default();
                let mut state = self.inner.state.lock().expect("reaction state poisoned");
                state.user_reactions = reactions;
                state.logged_in = true;
            }
            Err(e) if e.needs_sign_in() => {
                let mut state = self.inner.state.lock().expect("reaction state poisoned");
                state.logged_in = false;
            }
            Err(e) => debug!(error = %e, "user reactions fetch failed"),
        }
    }
}

/// Tooltip text for a reaction button, e.g. "ada, grace and 3 others"
pub fn tooltip(users: &[String], count: u64) -> String {
    if count == 0 || users.is_empty() {
        return String::new();
    }
    if count == 1 {
        return users[0].clone();
    }
    if count == 2 && users.len() >= 2 {
        return format!("{} and {}", users[0], users[1]);
    }
    if count == 3 && users.len() == 3 {
        return format!("{}, {} and {}", users[0], users[1], users[2]);
    }

    let others = count.saturating_sub(users.len() as u64);
    if others > 0 {
        let extra = others + if users.len() > 2 { 1 } else { 0 };
        return format!("{} and {} others", users[..2.min(users.len())].join(", "), extra);
    }
    format!(
        "{} and {}",
        users[..users.len() - 1].join(", "),
        users[users.len() - 1]
    )
}

#[async_trait]
impl Widget for Reactions {
    fn name(&self) -> &str {
        "reactions"
    }

    async fn initialize(&mut self, page: &PageContext) {
        let Some(slug) = page.slug.clone() else {
            return;
        };

        {
            let mut state = self.inner.state.lock().expect("reaction state poisoned");
            if state.initialized_for.as_deref() == Some(slug.as_str()) {
                return;
            }
            *state = ReactionState {
                initialized_for: Some(slug.clone()),
                ..Default::default()
            };
        }

        self.refresh_counts(&slug).await;
        self.refresh_user(&slug).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StaticApiClient;

    fn api_for_post(slug: &str) -> Arc<StaticApiClient> {
        let api = Arc::new(StaticApiClient::new());
        api.on_get(
            format!("/api/reactions?post={slug}"),
            json!([{"emoji": "🚀", "count": 2, "users": ["ada", "grace"]}]),
        );
        api.on_get(format!("/api/reactions/user?post={slug}"), json!(["🚀"]));
        api
    }

    #[tokio::test]
    async fn initialize_loads_counts_and_user_state() {
        let api = api_for_post("post-1");
        let mut reactions = Reactions::new(api);

        reactions.initialize(&PageContext::new("/blog/post-1")).await;

        assert_eq!(reactions.count("🚀"), 2);
        assert!(reactions.is_active("🚀"));
        assert_eq!(reactions.tooltip_for("🚀"), "ada and grace");
    }

    #[tokio::test]
    async fn reinit_same_slug_skips_refetch() {
        let api = api_for_post("post-1");
        let mut reactions = Reactions::new(api.clone());
        let page = PageContext::new("/blog/post-1");

        reactions.initialize(&page).await;
        let fetches = api.recorded_gets().len();
        reactions.initialize(&page).await;

        assert_eq!(api.recorded_gets().len(), fetches);
    }

    #[tokio::test]
    async fn reinit_different_slug_refetches() {
        let api = api_for_post("post-1");
        api.on_get("/api/reactions?post=post-2", json!([]));
        api.on_get("/api/reactions/user?post=post-2", json!([]));
        let mut reactions = Reactions::new(api.clone());

        reactions.initialize(&PageContext::new("/blog/post-1")).await;
        reactions.initialize(&PageContext::new("/blog/post-2")).await;

        assert_eq!(reactions.count("🚀"), 0);
        assert_eq!(api.recorded_gets().len(), 4);
    }

    #[tokio::test]
    async fn toggle_requires_sign_in() {
        let api = api_for_post("post-1");
        api.require_sign_in("/api/reactions/user?post=post-1");
        let mut reactions = Reactions::new(api);
        reactions.initialize(&PageContext::new("/blog/post-1")).await;

        let err = reactions.toggle("🚀").await.unwrap_err();
        assert!(err.needs_sign_in());
    }

    #[tokio::test]
    async fn toggle_posts_and_updates_state() {
        let api = api_for_post("post-1");
        api.on_post("/api/reactions", json!({"added": true}));
        let mut reactions = Reactions::new(api.clone());
        reactions.initialize(&PageContext::new("/blog/post-1")).await;

        let added = reactions.toggle("✨").await.unwrap();
        assert!(added);
        assert!(reactions.is_active("✨"));

        let posts = api.recorded_posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].1["post"], "post-1");
        assert_eq!(posts[0].1["emoji"], "✨");
    }

    #[test]
    fn tooltip_phrasing() {
        let users = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

        assert_eq!(tooltip(&[], 0), "");
        assert_eq!(tooltip(&users(&["ada"]), 1), "ada");
        assert_eq!(tooltip(&users(&["ada", "grace"]), 2), "ada and grace");
        assert_eq!(
            tooltip(&users(&["ada", "grace", "lin"]), 3),
            "ada, grace and lin"
        );
        assert_eq!(
            tooltip(&users(&["ada", "grace", "lin"]), 6),
            "ada, grace and 4 others"
        );
    }
}
