//! Profile menu
//!
//! Hydrates the header with the signed-in user from `/api/me`. When the
//! session endpoint answers 401 the sign-in button stays as rendered; that
//! is the normal signed-out case, not an error.

use crate::api::{ApiClient, User};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;
use waypost::{PageContext, Widget};

#[derive(Debug, Default)]
struct ProfileState {
    user: Option<User>,
    open: bool,
    hydrated: bool,
}

struct Inner {
    api: Arc<dyn ApiClient>,
    state: Mutex<ProfileState>,
}

/// The profile menu collaborator
#[derive(Clone)]
pub struct ProfileMenu {
    inner: Arc<Inner>,
}

impl ProfileMenu {
    /// Build the menu over an API client
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(ProfileState::default()),
            }),
        }
    }

    /// Signed-in user, if any
    pub fn user(&self) -> Option<User> {
        self.inner
            .state
            .lock()
            .expect("profile state poisoned")
            .user
            .clone()
    }

    /// Toggle the dropdown, returning the new open state
    pub fn toggle(&self) -> bool {
        let mut state = self.inner.state.lock().expect("profile state poisoned");
        state.open = !state.open;
        state.open
    }

    /// Close the dropdown
    pub fn close(&self) {
        self.inner.state.lock().expect("profile state poisoned").open = false;
    }

    /// Whether the dropdown is open
    pub fn is_open(&self) -> bool {
        self.inner.state.lock().expect("profile state poisoned").open
    }

    /// Sign-out link carrying the current path as redirect
    pub fn sign_out_link(&self, current_path: &str) -> String {
        format!(
            "/auth/logout?redirect={}",
            crate::api::encode_query(current_path)
        )
    }

    async fn hydrate(&self) {
        match self.inner.api.get_json("/api/me").await {
            Ok(value) => {
                let user: Option<User> = serde_json::from_value(value).ok();
                let mut state = self.inner.state.lock().expect("profile state poisoned");
                state.user = user;
            }
            Err(e) if e.needs_sign_in() => {
                debug!("no session, keeping sign-in button");
            }
            Err(e) => {
                debug!(error = %e, "profile hydration failed");
            }
        }
    }
}

#[async_trait]
impl Widget for ProfileMenu {
    fn name(&self) -> &str {
        "profile-menu"
    }

    async fn initialize(&mut self, _page: &PageContext) {
        let hydrated = {
            let mut state = self.inner.state.lock().expect("profile state poisoned");
            let was = state.hydrated;
            state.hydrated = true;
            was
        };
        if hydrated {
            return;
        }
        self.hydrate().await;
    }
}
