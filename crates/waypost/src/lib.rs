//! Client-Side Navigation and Prefetch Engine
//!
//! Waypost intercepts in-site link activation, swaps page content without
//! a full reload, and speculatively fetches likely-next pages in the
//! background to hide network latency:
//!
//! - **Link interception**: classify every activation, handle in-site
//!   navigations, leave everything else to the host
//! - **Soft navigation**: cache-first page loads patched into the live
//!   shell, with a hard-navigation fallback on any failure
//! - **Speculative prefetch**: viewport, hover-dwell, and touch triggers
//!   warming the cache with bounded-concurrency background fetches
//! - **History consistency**: push/replace records and pop handling under
//!   asynchronous, possibly out-of-order completions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Router                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  Host events ──> Link Classifier ──┬──> Navigation Controller   │
//! │  (click, hover,                    │         │        │          │
//! │   touch, visible,                  │         │        ↓          │
//! │   pop)                             │         │   History         │
//! │                                    │         ↓                   │
//! │                                    └──> Prefetch Scheduler       │
//! │                                         (queue, dwell, bound≤3)  │
//! │                                              │                   │
//! │                              ┌───────────────┴───────┐           │
//! │                              ↓                       ↓           │
//! │                         Page Cache  <───────  Page Fetcher       │
//! │                              │                                   │
//! │                              ↓                                   │
//! │                       Content Patcher ──> Document Shell         │
//! │                              │            (title, main, nav)     │
//! │                              └──> widget re-init + watch re-arm  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod cache;
mod classify;
mod config;
mod document;
mod error;
mod fetch;
mod history;
mod navigate;
mod patch;
mod router;
mod scheduler;
mod state;
mod widget;

pub use cache::{CacheStats, PageCache};
pub use classify::{AnchorMeta, LinkClassifier};
pub use config::{ConnectionClass, ConnectionProfile, FetchConfig, PrefetchConfig, RouterConfig};
pub use document::{DocumentShell, NavLink, OverlayState, PageDocument, ParsedAnchor};
pub use error::{Result, RouterError};
pub use fetch::{HttpFetcher, PageFetcher, StaticFetcher};
pub use history::{History, HistoryRecord};
pub use navigate::{NavigationController, NavigationOutcome};
pub use patch::{recompute_active_nav, ContentPatcher};
pub use router::{LinkEvent, Router, RouterStats};
pub use scheduler::{PrefetchScheduler, PrefetchStats, Subscription};
pub use state::{NavState, RouterState};
pub use widget::{PageContext, Widget};

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        AnchorMeta, LinkEvent, NavigationOutcome, PageFetcher, Result, Router, RouterConfig,
        Widget,
    };
}
