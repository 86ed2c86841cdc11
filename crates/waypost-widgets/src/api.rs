//! JSON API client seam
//!
//! Every widget is a fetch-then-render component over the site's JSON API:
//! one GET or POST per interaction, no concurrency coordination. The trait
//! keeps widgets testable without a server.

use crate::{Result, WidgetError};
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Mutex;
use tracing::debug;

/// Signed-in user as reported by `/api/me`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Stable user id
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email, if the provider shares it
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar URL
    #[serde(default)]
    pub avatar: Option<String>,
}

impl User {
    /// Single-character initial for avatar placeholders
    pub fn initial(&self) -> char {
        self.name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }
}

/// JSON API seam between widgets and the site backend
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// GET a JSON endpoint
    async fn get_json(&self, path: &str) -> Result<Value>;

    /// POST a JSON body, returning the JSON response
    async fn post_json(&self, path: &str, body: &Value) -> Result<Value>;

    /// PUT a JSON body, returning the JSON response
    async fn put_json(&self, path: &str, body: &Value) -> Result<Value>;

    /// DELETE a resource, returning the JSON response
    async fn delete_json(&self, path: &str) -> Result<Value>;
}

/// HTTP API client
pub struct HttpApiClient {
    client: Client,
    base_url: String,
}

impl HttpApiClient {
    /// Build a client for the given site base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| WidgetError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn decode(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => Err(WidgetError::Unauthorized),
            s if s.is_success() => {
                let text = response.text().await?;
                Ok(serde_json::from_str(&text)?)
            }
            s => Err(WidgetError::Http {
                status: s.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "api get");
        Self::decode(self.client.get(&url).send().await?).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "api post");
        Self::decode(self.client.post(&url).json(body).send().await?).await
    }

    async fn put_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "api put");
        Self::decode(self.client.put(&url).json(body).send().await?).await
    }

    async fn delete_json(&self, path: &str) -> Result<Value> {
        let url = self.url(path);
        debug!(%url, "api delete");
        Self::decode(self.client.delete(&url).send().await?).await
    }
}

/// In-memory API client for tests
///
/// GET responses come from a path-keyed map; POSTs are recorded and
/// answered from a second map. Paths absent from both maps yield a 404.
pub struct StaticApiClient {
    gets: DashMap<String, Value>,
    post_replies: DashMap<String, Value>,
    put_replies: DashMap<String, Value>,
    delete_replies: DashMap<String, Value>,
    unauthorized: DashMap<String, ()>,
    get_log: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
    deletes: Mutex<Vec<String>>,
}

impl StaticApiClient {
    /// Create an empty client
    pub fn new() -> Self {
        Self {
            gets: DashMap::new(),
            post_replies: DashMap::new(),
            put_replies: DashMap::new(),
            delete_replies: DashMap::new(),
            unauthorized: DashMap::new(),
            get_log: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    /// Register a GET response
    pub fn on_get(&self, path: impl Into<String>, value: Value) {
        self.gets.insert(path.into(), value);
    }

    /// Register a POST response
    pub fn on_post(&self, path: impl Into<String>, value: Value) {
        self.post_replies.insert(path.into(), value);
    }

    /// Register a PUT response
    pub fn on_put(&self, path: impl Into<String>, value: Value) {
        self.put_replies.insert(path.into(), value);
    }

    /// Register a DELETE response
    pub fn on_delete(&self, path: impl Into<String>, value: Value) {
        self.delete_replies.insert(path.into(), value);
    }

    /// Make a path answer 401
    pub fn require_sign_in(&self, path: impl Into<String>) {
        self.unauthorized.insert(path.into(), ());
    }

    /// Recorded POST bodies, oldest first
    pub fn recorded_posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().expect("post log poisoned").clone()
    }

    /// Paths GET has been called with, oldest first
    pub fn recorded_gets(&self) -> Vec<String> {
        self.get_log.lock().expect("get log poisoned").clone()
    }

    /// Paths DELETE has been called with, oldest first
    pub fn recorded_deletes(&self) -> Vec<String> {
        self.deletes.lock().expect("delete log poisoned").clone()
    }
}

impl Default for StaticApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiClient for StaticApiClient {
    async fn get_json(&self, path: &str) -> Result<Value> {
        self.get_log
            .lock()
            .expect("get log poisoned")
            .push(path.to_string());
        if self.unauthorized.contains_key(path) {
            return Err(WidgetError::Unauthorized);
        }
        self.gets
            .get(path)
            .map(|v| v.clone())
            .ok_or_else(|| WidgetError::Http {
                status: 404,
                message: path.to_string(),
            })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        if self.unauthorized.contains_key(path) {
            return Err(WidgetError::Unauthorized);
        }
        self.posts
            .lock()
            .expect("post log poisoned")
            .push((path.to_string(), body.clone()));
        self.post_replies
            .get(path)
            .map(|v| v.clone())
            .ok_or_else(|| WidgetError::Http {
                status: 404,
                message: path.to_string(),
            })
    }

    async fn put_json(&self, path: &str, body: &Value) -> Result<Value> {
        if self.unauthorized.contains_key(path) {
            return Err(WidgetError::Unauthorized);
        }
        self.posts
            .lock()
            .expect("post log poisoned")
            .push((path.to_string(), body.clone()));
        self.put_replies
            .get(path)
            .map(|v| v.clone())
            .ok_or_else(|| WidgetError::Http {
                status: 404,
                message: path.to_string(),
            })
    }

    async fn delete_json(&self, path: &str) -> Result<Value> {
        if self.unauthorized.contains_key(path) {
            return Err(WidgetError::Unauthorized);
        }
        self.deletes
            .lock()
            .expect("delete log poisoned")
            .push(path.to_string());
        self.delete_replies
            .get(path)
            .map(|v| v.clone())
            .ok_or_else(|| WidgetError::Http {
                status: 404,
                message: path.to_string(),
            })
    }
}

/// Percent-encode a path for use in a query string
pub(crate) fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn static_client_serves_and_records() {
        let api = StaticApiClient::new();
        api.on_get("/api/me", json!({"id": 1, "name": "Ada"}));
        api.on_post("/api/reactions", json!({"added": true}));

        let me = api.get_json("/api/me").await.unwrap();
        assert_eq!(me["name"], "Ada");

        let reply = api
            .post_json("/api/reactions", &json!({"post": "p", "emoji": "x"}))
            .await
            .unwrap();
        assert_eq!(reply["added"], true);
        assert_eq!(api.recorded_posts().len(), 1);
    }

    #[tokio::test]
    async fn unregistered_paths_are_not_found() {
        let api = StaticApiClient::new();
        let err = api.get_json("/api/absent").await.unwrap_err();
        assert!(matches!(err, WidgetError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn unauthorized_paths_need_sign_in() {
        let api = StaticApiClient::new();
        api.require_sign_in("/api/me");

        let err = api.get_json("/api/me").await.unwrap_err();
        assert!(err.needs_sign_in());
    }

    #[test]
    fn user_initial() {
        let user = User {
            id: 1,
            name: "ada".into(),
            email: None,
            avatar: None,
        };
        assert_eq!(user.initial(), 'A');
    }

    #[test]
    fn query_encoding() {
        assert_eq!(encode_query("/blog/post-1"), "%2Fblog%2Fpost-1");
    }
}
