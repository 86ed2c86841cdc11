//! Comment thread
//!
//! Slug-keyed fetch-then-render of a post's comments, plus the signed-in
//! user's submit/edit/delete operations. Session state comes from
//! `/api/me`; a 401 leaves the form disabled with a sign-in prompt.

use crate::api::{encode_query, ApiClient, User};
use crate::{Result, WidgetError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tracing::debug;
use waypost::{PageContext, Widget};

/// One comment on a post
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment id
    pub id: i64,
    /// Author's user id
    pub user_id: i64,
    /// Author's display name
    pub user_name: String,
    /// Author's avatar URL
    #[serde(default)]
    pub user_avatar: Option<String>,
    /// Markdown source
    pub content: String,
    /// Rendered HTML
    pub content_html: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last-update timestamp (RFC 3339)
    pub updated_at: String,
}

impl Comment {
    /// Whether the comment has been edited since posting
    pub fn is_edited(&self) -> bool {
        self.updated_at != self.created_at
    }
}

#[derive(Debug, Default)]
struct CommentState {
    initialized_for: Option<String>,
    comments: Vec<Comment>,
    user: Option<User>,
}

struct Inner {
    api: Arc<dyn ApiClient>,
    state: Mutex<CommentState>,
}

/// The comment thread collaborator
#[derive(Clone)]
pub struct Comments {
    inner: Arc<Inner>,
}

impl Comments {
    /// Build the thread over an API client
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(CommentState::default()),
            }),
        }
    }

    /// Comments, newest first
    pub fn comments(&self) -> Vec<Comment> {
        self.inner
            .state
            .lock()
            .expect("comment state poisoned")
            .comments
            .clone()
    }

    /// Signed-in user, if any
    pub fn user(&self) -> Option<User> {
        self.inner
            .state
            .lock()
            .expect("comment state poisoned")
            .user
            .clone()
    }

    /// Whether the form accepts input
    pub fn can_comment(&self) -> bool {
        self.user().is_some()
    }

    /// Submit a new comment; it lands at the top of the thread
    pub async fn submit(&self, content: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(WidgetError::Decode("empty comment".into()));
        }
        let slug = self.current_slug()?;

        let reply = self
            .inner
            .api
            .post_json("/api/comments", &json!({"post": slug, "content": content}))
            .await?;
        let comment: Comment = serde_json::from_value(reply)?;

        let mut state = self.inner.state.lock().expect("comment state poisoned");
        state.comments.insert(0, comment.clone());
        Ok(comment)
    }

    /// Replace a comment's content
    pub async fn update(&self, id: i64, content: &str) -> Result<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(WidgetError::Decode("empty comment".into()));
        }

        let reply = self
            .inner
            .api
            .put_json(&format!("/api/comments/{id}"), &json!({"content": content}))
            .await?;
        let updated: Comment = serde_json::from_value(reply)?;

        let mut state = self.inner.state.lock().expect("comment state poisoned");
        if let Some(existing) = state.comments.iter_mut().find(|c| c.id == id) {
            *existing = updated.clone();
        }
        Ok(updated)
    }

    /// Delete a comment
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.inner
            .api
            .delete_json(&format!("/api/comments/{id}"))
            .await?;

        let mut state = self.inner.state.lock().expect("comment state poisoned");
        state.comments.retain(|c| c.id != id);
        Ok(())
    }

    fn current_slug(&self) -> Result<String> {
        self.inner
            .state
            .lock()
            .expect("comment state poisoned")
            .initialized_for
            .clone()
            .ok_or_else(|| WidgetError::Decode("no post context".into()))
    }

    async fn check_auth(&self) {
        match self.inner.api.get_json("/api/me").await {
            Ok(value) => {
                let user = serde_json::from_value(value).ok();
                self.inner
                    .state
                    .lock()
                    .expect("comment state poisoned")
                    .user = user;
            }
            Err(e) if e.needs_sign_in() => {}
            Err(e) => debug!(error = %e, "auth check failed"),
        }
    }

    async fn fetch_comments(&self, slug: &str) {
        let path = format!("/api/comments?post={}", encode_query(slug));
        match self.inner.api.get_json(&path).await {
            Ok(value) => {
                let comments: Vec<Comment> = serde_json::from_value(value).unwrap_or_default();
                self.inner
                    .state
                    .lock()
                    .expect("comment state poisoned")
                    .comments = comments;
            }
            Err(e) => debug!(error = %e, "comments fetch failed"),
        }
    }
}

#[async_trait]
impl Widget for Comments {
    fn name(&self) -> &str {
        "comments"
    }

    async fn initialize(&mut self, page: &PageContext) {
        let Some(slug) = page.slug.clone() else {
            return;
        };

        {
            let mut state = self.inner.state.lock().expect("comment state poisoned");
            if state.initialized_for.as_deref() == Some(slug.as_str()) {
                return;
            }
            *state = CommentState {
                initialized_for: Some(slug.clone()),
                ..Default::default()
            };
        }

        self.check_auth().await;
        self.fetch_comments(&slug).await;
    }
}
