//! Sign-in overlay
//!
//! Presents the configured auth providers and builds the provider links
//! other widgets send users through when an action needs a session. The
//! provider list is loaded lazily on first open and then kept.

use crate::api::{encode_query, ApiClient};
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;
use waypost::{PageContext, Widget};

/// An auth provider offered by the site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Provider {
    /// Provider id, e.g. `github`
    pub id: String,
    /// Display name
    pub name: String,
}

#[derive(Debug, Default)]
struct LoginState {
    open: bool,
    redirect: Option<String>,
    providers: Option<Vec<Provider>>,
    wired: bool,
}

struct Inner {
    api: Arc<dyn ApiClient>,
    state: Mutex<LoginState>,
}

/// The sign-in overlay collaborator
#[derive(Clone)]
pub struct LoginOverlay {
    inner: Arc<Inner>,
}

impl LoginOverlay {
    /// Build the overlay over an API client
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(LoginState::default()),
            }),
        }
    }

    /// Open the overlay, remembering where to send the user afterwards;
    /// loads the provider list on first open
    pub async fn open(&self, redirect: impl Into<String>) -> Result<()> {
        let needs_providers = {
            let mut state = self.inner.state.lock().expect("login state poisoned");
            state.open = true;
            state.redirect = Some(redirect.into());
            state.providers.is_none()
        };

        if needs_providers {
            let value = self.inner.api.get_json("/api/auth/providers").await?;
            let providers = parse_providers(&value);
            debug!(count = providers.len(), "loaded auth providers");
            let mut state = self.inner.state.lock().expect("login state poisoned");
            state.providers = Some(providers);
        }
        Ok(())
    }

    /// Close the overlay
    pub fn close(&self) {
        self.inner.state.lock().expect("login state poisoned").open = false;
    }

    /// Whether the overlay is open
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().expect("login state poisoned").open
    }

    /// Loaded providers, if the overlay has been opened
    pub fn providers(&self) -> Option<Vec<Provider>> {
        self.inner
            .state
            .lock()
            .expect("login state poisoned")
            .providers
            .clone()
    }

    /// Auth entry link for a provider, carrying the stored redirect
    pub fn provider_link(&self, provider: &Provider) -> String {
        let state = self.inner.state.lock().expect("login state poisoned");
        let redirect = state.redirect.as_deref().unwrap_or("/");
        format!("/auth/{}?redirect={}", provider.id, encode_query(redirect))
    }
}

fn parse_providers(value: &Value) -> Vec<Provider> {
    value
        .get("providers")
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default()
}

#[async_trait]
impl Widget for LoginOverlay {
    fn name(&self) -> &str {
        "login-overlay"
    }

    async fn initialize(&mut self, _page: &PageContext) {
        // the overlay lives in the shell, not the swapped content; wiring
        // happens once and later swaps are no-ops
        let mut state = self.inner.state.lock().expect("login state poisoned");
        if state.wired {
            return;
        }
        state.wired = true;
    }
}
