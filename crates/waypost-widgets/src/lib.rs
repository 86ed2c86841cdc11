//! Collaborator Widgets for Waypost
//!
//! Reference implementations of the external collaborators the navigation
//! engine re-initializes after every content swap: the sign-in overlay,
//! full-text search overlay, reaction bar, comment thread, and profile
//! menu. Each is a simple fetch-then-render component over the site's JSON
//! API — one request per interaction, no concurrency coordination — and
//! each keeps its own slug-keyed idempotency state so repeated
//! initialization is a no-op.
//!
//! All five implement [`waypost::Widget`]; hand clones to the router's
//! registry and keep your own for driving user interactions:
//!
//! ```no_run
//! use std::sync::Arc;
//! use waypost::Widget;
//! use waypost_widgets::{HttpApiClient, LoginOverlay, ProfileMenu, Reactions};
//!
//! let api: Arc<dyn waypost_widgets::ApiClient> =
//!     Arc::new(HttpApiClient::new("https://site.example").unwrap());
//! let reactions = Reactions::new(api.clone());
//! let widgets: Vec<Box<dyn Widget>> = vec![
//!     Box::new(reactions.clone()),
//!     Box::new(LoginOverlay::new(api.clone())),
//!     Box::new(ProfileMenu::new(api)),
//! ];
//! # drop(widgets);
//! ```

mod api;
mod comments;
mod error;
mod login;
mod profile;
mod reactions;
mod search;

pub use api::{ApiClient, HttpApiClient, StaticApiClient, User};
pub use comments::{Comment, Comments};
pub use error::{Result, WidgetError};
pub use login::{LoginOverlay, Provider};
pub use profile::ProfileMenu;
pub use reactions::{tooltip, ReactionCount, Reactions};
pub use search::{SearchOverlay, SearchResult, SEARCH_DEBOUNCE};
