//! Collaborator widget seam
//!
//! External widgets (sign-in overlay, search overlay, comments, reactions,
//! profile menu) are fetch-then-render components owned elsewhere. The core
//! only knows that each exposes an idempotent (re-)initialization entry
//! point, invoked after every content swap. Idempotency is the widget's
//! own responsibility: it keys off the stable identity of the content it
//! represents and skips re-init when that identity is unchanged.

use async_trait::async_trait;

/// Context handed to widgets on (re-)initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    /// Normalized path of the page that was just swapped in
    pub path: String,
    /// Stable content identity: the last non-empty path segment
    pub slug: Option<String>,
}

impl PageContext {
    /// Build a context for a path, deriving the slug
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let slug = path
            .split(['?', '#'])
            .next()
            .unwrap_or(&path)
            .trim_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { path, slug }
    }
}

/// An external collaborator widget
///
/// `initialize` must be safe to call repeatedly; the router calls it after
/// every content swap. Failures are the widget's to handle — the router
/// never inspects the result.
#[async_trait]
pub trait Widget: Send + Sync {
    /// Widget name, for logging
    fn name(&self) -> &str;

    /// (Re-)initialize for the given page
    async fn initialize(&mut self, page: &PageContext);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_last_segment() {
        assert_eq!(
            PageContext::new("/blog/post-1").slug.as_deref(),
            Some("post-1")
        );
        assert_eq!(PageContext::new("/docs/").slug.as_deref(), Some("docs"));
    }

    #[test]
    fn root_has_no_slug() {
        assert!(PageContext::new("/").slug.is_none());
        assert!(PageContext::new("").slug.is_none());
    }

    #[test]
    fn slug_ignores_query_and_fragment() {
        assert_eq!(
            PageContext::new("/blog?sort=oldest").slug.as_deref(),
            Some("blog")
        );
        assert_eq!(
            PageContext::new("/blog/post-1#comments").slug.as_deref(),
            Some("post-1")
        );
    }
}
