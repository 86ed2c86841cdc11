//! Link classification: which anchors the router handles
//!
//! The classifier is a pure predicate over an anchor's attributes and its
//! href. It is the single gate in front of both navigation interception and
//! prefetch eligibility; anything it rejects is left to the host's default
//! handling.

use crate::{Result, RouterError};
use url::Url;

/// Attributes of an anchor that affect interception
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorMeta {
    /// Anchor carries a download attribute
    pub download: bool,
    /// Anchor target window, if any
    pub target: Option<String>,
    /// Anchor or an ancestor carries the router opt-out marker
    pub opt_out: bool,
}

impl AnchorMeta {
    /// Mark the anchor as a download link
    pub fn with_download(mut self) -> Self {
        self.download = true;
        self
    }

    /// Set the anchor target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Mark the anchor (or an ancestor) as opted out of the router
    pub fn with_opt_out(mut self) -> Self {
        self.opt_out = true;
        self
    }
}

/// Path segments that always bypass the router
const GUARDED_SEGMENTS: [&str; 2] = ["/auth/", "/api/"];

/// Pure predicate deciding whether a link is handled by the router
#[derive(Debug, Clone)]
pub struct LinkClassifier {
    origin: Url,
}

impl LinkClassifier {
    /// Build a classifier for the given site origin
    pub fn new(origin: &str) -> Result<Self> {
        let origin = Url::parse(origin)?;
        if origin.cannot_be_a_base() {
            return Err(RouterError::InvalidUrl(format!(
                "origin must be an absolute URL: {origin}"
            )));
        }
        Ok(Self { origin })
    }

    /// Whether the router should intercept activation of this link
    ///
    /// Pure and synchronous. Returns false for empty or fragment-only
    /// hrefs, cross-origin absolutes, non-navigational schemes, download
    /// links, external-window targets, opted-out anchors, and auth/API
    /// endpoints.
    pub fn should_intercept(&self, anchor: &AnchorMeta, href: &str) -> bool {
        if href.is_empty() || href.starts_with('#') {
            return false;
        }
        if href.starts_with("mailto:") || href.starts_with("tel:") {
            return false;
        }
        if href.starts_with("http") && !self.is_same_origin(href) {
            return false;
        }
        if anchor.download {
            return false;
        }
        if anchor.target.as_deref() == Some("_blank") {
            return false;
        }
        if anchor.opt_out {
            return false;
        }
        if GUARDED_SEGMENTS.iter().any(|s| href.contains(s)) {
            return false;
        }
        true
    }

    /// Reduce an intercepted href to the normalized path used as cache and
    /// history key: same-origin absolutes lose their origin prefix,
    /// site-relative paths pass through unchanged
    pub fn normalize(&self, href: &str) -> String {
        if href.starts_with("http") {
            if let Ok(url) = Url::parse(href) {
                let mut path = url.path().to_string();
                if let Some(query) = url.query() {
                    path.push('?');
                    path.push_str(query);
                }
                if let Some(fragment) = url.fragment() {
                    path.push('#');
                    path.push_str(fragment);
                }
                return path;
            }
        }
        href.to_string()
    }

    fn is_same_origin(&self, href: &str) -> bool {
        match Url::parse(href) {
            Ok(url) => url.origin() == self.origin.origin(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> LinkClassifier {
        LinkClassifier::new("https://site.example").unwrap()
    }

    #[test]
    fn intercepts_site_relative_paths() {
        let c = classifier();
        assert!(c.should_intercept(&AnchorMeta::default(), "/blog/post-1"));
        assert!(c.should_intercept(&AnchorMeta::default(), "/"));
    }

    #[test]
    fn rejects_empty_and_fragment_only() {
        let c = classifier();
        assert!(!c.should_intercept(&AnchorMeta::default(), ""));
        assert!(!c.should_intercept(&AnchorMeta::default(), "#section"));
    }

    #[test]
    fn rejects_cross_origin_absolutes() {
        let c = classifier();
        assert!(!c.should_intercept(&AnchorMeta::default(), "https://other-origin.example/x"));
        assert!(c.should_intercept(&AnchorMeta::default(), "https://site.example/x"));
    }

    #[test]
    fn rejects_non_navigational_schemes() {
        let c = classifier();
        assert!(!c.should_intercept(&AnchorMeta::default(), "mailto:a@b.com"));
        assert!(!c.should_intercept(&AnchorMeta::default(), "tel:+15551234"));
    }

    #[test]
    fn rejects_download_and_blank_target() {
        let c = classifier();
        assert!(!c.should_intercept(&AnchorMeta::default().with_download(), "/file.pdf"));
        assert!(!c.should_intercept(&AnchorMeta::default().with_target("_blank"), "/blog"));
        assert!(c.should_intercept(&AnchorMeta::default().with_target("_self"), "/blog"));
    }

    #[test]
    fn rejects_opted_out_anchors() {
        let c = classifier();
        assert!(!c.should_intercept(&AnchorMeta::default().with_opt_out(), "/blog"));
    }

    #[test]
    fn rejects_guarded_endpoints() {
        let c = classifier();
        assert!(!c.should_intercept(&AnchorMeta::default(), "/api/reactions?post=x"));
        assert!(!c.should_intercept(&AnchorMeta::default(), "/auth/github?redirect=%2F"));
    }

    #[test]
    fn normalize_strips_same_origin_prefix() {
        let c = classifier();
        assert_eq!(c.normalize("https://site.example/blog/post-1"), "/blog/post-1");
        assert_eq!(c.normalize("/blog/post-1"), "/blog/post-1");
        assert_eq!(
            c.normalize("https://site.example/blog?sort=oldest"),
            "/blog?sort=oldest"
        );
    }

    #[test]
    fn rejects_relative_origin() {
        assert!(LinkClassifier::new("not a url").is_err());
    }
}
