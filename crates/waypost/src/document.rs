//! Page document model
//!
//! `PageDocument` is the offline representation parsed from a full page
//! payload: the patch targets (title, canonical link, meta description,
//! main-content region) plus every anchor in document order. Parsing walks
//! the markup with a lenient streaming reader; the main region's inner
//! markup is captured by re-emitting its events through a writer, never by
//! scraping text.
//!
//! `DocumentShell` is the live document the patcher mutates: the patch
//! targets, the persistent site-nav links, and the host-visible flags
//! (overlay state, scroll, loading, pending hard navigation).

use crate::classify::AnchorMeta;
use crate::{Result, RouterError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

/// An anchor found in a page payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAnchor {
    /// Raw href as written in the markup
    pub href: String,
    /// Interception-relevant attributes, opt-out inherited from ancestors
    pub meta: AnchorMeta,
}

/// Offline representation of a fetched page
#[derive(Debug, Clone, Default)]
pub struct PageDocument {
    /// Page title text
    pub title: Option<String>,
    /// Canonical link target
    pub canonical: Option<String>,
    /// Meta description content
    pub description: Option<String>,
    /// Inner markup of the main-content region
    pub main_html: Option<String>,
    /// Hrefs of site-nav links, document order
    pub nav_links: Vec<String>,
    /// Every anchor in the payload, document order
    pub links: Vec<ParsedAnchor>,
}

/// Marker attribute opting an element and its subtree out of the router
const OPT_OUT_ATTR: &str = "data-no-router";

/// Id of the mutable main-content region
const MAIN_REGION_ID: &str = "main-content";

/// Class naming the persistent site-nav region
const SITE_NAV_CLASS: &str = "site-nav";

/// HTML void elements: a start tag with no matching end tag
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

struct Frame {
    opt_out: bool,
}

impl PageDocument {
    /// Parse a full page payload
    ///
    /// Lenient about the tag-soup nature of real pages: end-tag names are
    /// not verified and unknown constructs are skipped, but a payload the
    /// reader cannot tokenize at all is an error.
    pub fn parse(markup: &str) -> Result<Self> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().check_end_names = false;

        let mut doc = PageDocument::default();
        let mut stack: Vec<Frame> = Vec::new();
        let mut main_writer: Option<Writer<Vec<u8>>> = None;
        let mut main_depth: Option<usize> = None;
        let mut nav_depth: Option<usize> = None;
        let mut in_title = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| RouterError::Document(e.to_string()))?;

            match event {
                Event::Eof => break,

                Event::Start(e) => {
                    let name = local_name(&e);
                    let parent_opt_out = stack.last().map(|f| f.opt_out).unwrap_or(false);
                    let opt_out = parent_opt_out || has_attr(&e, OPT_OUT_ATTR);

                    match name.as_str() {
                        "title" => in_title = true,
                        "a" => doc.collect_anchor(&e, opt_out, nav_depth.is_some()),
                        "link" => doc.collect_canonical(&e),
                        "meta" => doc.collect_description(&e),
                        _ => {}
                    }

                    let is_main_boundary = main_depth.is_none()
                        && attr(&e, "id").as_deref() == Some(MAIN_REGION_ID);
                    let is_nav_boundary = nav_depth.is_none()
                        && name == "nav"
                        && attr(&e, "class")
                            .map(|c| c.split_whitespace().any(|cls| cls == SITE_NAV_CLASS))
                            .unwrap_or(false);

                    if let Some(writer) = main_writer.as_mut() {
                        write_event(writer, Event::Start(e))?;
                    }

                    // void elements never get a matching end tag; keeping
                    // them off the stack keeps boundary depths honest
                    if VOID_ELEMENTS.contains(&name.as_str()) {
                        continue;
                    }

                    stack.push(Frame { opt_out });

                    if is_main_boundary {
                        main_depth = Some(stack.len() - 1);
                        main_writer = Some(Writer::new(Vec::new()));
                    }
                    if is_nav_boundary {
                        nav_depth = Some(stack.len() - 1);
                    }
                }

                Event::Empty(e) => {
                    let name = local_name(&e);
                    let parent_opt_out = stack.last().map(|f| f.opt_out).unwrap_or(false);
                    let opt_out = parent_opt_out || has_attr(&e, OPT_OUT_ATTR);

                    match name.as_str() {
                        "a" => doc.collect_anchor(&e, opt_out, nav_depth.is_some()),
                        "link" => doc.collect_canonical(&e),
                        "meta" => doc.collect_description(&e),
                        _ => {}
                    }

                    if let Some(writer) = main_writer.as_mut() {
                        write_event(writer, Event::Empty(e))?;
                    }
                }

                Event::End(e) => {
                    if in_title && local_end_name(e.name().as_ref()) == "title" {
                        in_title = false;
                    }

                    if stack.is_empty() {
                        continue;
                    }
                    stack.pop();

                    if main_depth == Some(stack.len()) {
                        main_depth = None;
                        if let Some(writer) = main_writer.take() {
                            let inner = writer.into_inner();
                            doc.main_html = Some(
                                String::from_utf8(inner)
                                    .map_err(|e| RouterError::Document(e.to_string()))?,
                            );
                        }
                    } else if let Some(writer) = main_writer.as_mut() {
                        write_event(writer, Event::End(e))?;
                    }

                    if nav_depth == Some(stack.len()) {
                        nav_depth = None;
                    }
                }

                Event::Text(t) => {
                    if in_title {
                        let text = t
                            .unescape()
                            .map(|c| c.into_owned())
                            .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned());
                        let title = doc.title.get_or_insert_with(String::new);
                        title.push_str(&text);
                    }
                    if let Some(writer) = main_writer.as_mut() {
                        write_event(writer, Event::Text(t))?;
                    }
                }

                Event::CData(t) => {
                    if let Some(writer) = main_writer.as_mut() {
                        write_event(writer, Event::CData(t))?;
                    }
                }

                Event::Comment(c) => {
                    if let Some(writer) = main_writer.as_mut() {
                        write_event(writer, Event::Comment(c))?;
                    }
                }

                // prolog noise: declarations, doctypes, processing instructions
                _ => {}
            }
        }

        if let Some(title) = doc.title.as_mut() {
            let trimmed = title.trim().to_string();
            *title = trimmed;
        }

        Ok(doc)
    }

    fn collect_anchor(&mut self, e: &BytesStart<'_>, opt_out: bool, in_nav: bool) {
        let Some(href) = attr(e, "href") else {
            return;
        };

        let meta = AnchorMeta {
            download: has_attr(e, "download"),
            target: attr(e, "target"),
            opt_out,
        };

        if in_nav {
            self.nav_links.push(href.clone());
        }
        self.links.push(ParsedAnchor { href, meta });
    }

    fn collect_canonical(&mut self, e: &BytesStart<'_>) {
        if attr(e, "rel").as_deref() == Some("canonical") {
            if let Some(href) = attr(e, "href") {
                self.canonical = Some(href);
            }
        }
    }

    fn collect_description(&mut self, e: &BytesStart<'_>) {
        if attr(e, "name").as_deref() == Some("description") {
            if let Some(content) = attr(e, "content") {
                self.description = Some(content);
            }
        }
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn local_end_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().with_checks(false).find_map(|a| {
        let a = a.ok()?;
        if a.key.as_ref().eq_ignore_ascii_case(name.as_bytes()) {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn has_attr(e: &BytesStart<'_>, name: &str) -> bool {
    e.attributes()
        .with_checks(false)
        .filter_map(|a| a.ok())
        .any(|a| a.key.as_ref().eq_ignore_ascii_case(name.as_bytes()))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| RouterError::Document(e.to_string()))
}

/// A site-nav link with its highlight state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    /// Link target path
    pub href: String,
    /// Whether the link is highlighted for the current page
    pub active: bool,
}

impl NavLink {
    /// Create an inactive nav link
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            active: false,
        }
    }
}

/// Mobile overlay/menu state, closed on every navigation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlayState {
    /// Mobile nav menu open
    pub menu_open: bool,
    /// Post sidebar open
    pub sidebar_open: bool,
}

impl OverlayState {
    /// Whether anything is open
    pub fn any_open(&self) -> bool {
        self.menu_open || self.sidebar_open
    }

    /// Close everything
    pub fn close_all(&mut self) {
        self.menu_open = false;
        self.sidebar_open = false;
    }
}

/// The live document the patcher mutates
///
/// The shell (header, nav, footer) persists across soft navigations; only
/// the fields here change.
#[derive(Debug, Clone, Default)]
pub struct DocumentShell {
    /// Current page title
    pub title: String,
    /// Current canonical link target
    pub canonical: Option<String>,
    /// Current meta description
    pub description: Option<String>,
    /// Inner markup of the main-content region
    pub main_html: String,
    /// Persistent site-nav links with highlight state
    pub nav_links: Vec<NavLink>,
    /// Mobile overlay/menu state
    pub overlay: OverlayState,
    /// Vertical scroll position
    pub scroll_y: u32,
    /// A user-initiated navigation is in progress
    pub loading: bool,
    /// Hard navigation the host must perform, set on soft-navigation failure
    pub pending_hard_navigation: Option<String>,
}

impl DocumentShell {
    /// Build the initial shell from the landing page's parsed document
    pub fn from_document(doc: &PageDocument) -> Self {
        Self {
            title: doc.title.clone().unwrap_or_default(),
            canonical: doc.canonical.clone(),
            description: doc.description.clone(),
            main_html: doc.main_html.clone().unwrap_or_default(),
            nav_links: doc.nav_links.iter().map(NavLink::new).collect(),
            ..Default::default()
        }
    }

    /// Request a full browser navigation to `path`
    pub fn hard_navigate(&mut self, path: &str) {
        self.pending_hard_navigation = Some(path.to_string());
    }

    /// Take the pending hard navigation, if any
    pub fn take_hard_navigation(&mut self) -> Option<String> {
        self.pending_hard_navigation.take()
    }

    /// Reset scroll to the top of the page
    pub fn reset_scroll(&mut self) {
        self.scroll_y = 0;
    }

    /// Hrefs of the currently active nav links, document order
    pub fn active_nav(&self) -> Vec<&str> {
        self.nav_links
            .iter()
            .filter(|l| l.active)
            .map(|l| l.href.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> &'static str {
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<title> Blog — Example </title>
<link rel="stylesheet" href="/css/main.css"/>
<link rel="canonical" href="https://site.example/blog"/>
<meta name="description" content="Posts about things"/>
</head>
<body>
<header>
<nav class="site-nav">
<a href="/">Home</a>
<a href="/blog">Blog</a>
<a href="/docs">Docs</a>
</nav>
<div data-no-router="true"><a href="/auth/logout">Sign out</a></div>
</header>
<div id="main-content">
<h1>Blog</h1>
<p>Latest <em>posts</em>.</p>
<a href="/blog/post-1">Post one</a>
<a href="/files/a.zip" download="a.zip">Download</a>
<a href="https://other.example/x" target="_blank">Elsewhere</a>
</div>
<footer><a href="#top">Back to top</a></footer>
</body>
</html>"##
    }

    #[test]
    fn parses_patch_targets() {
        let doc = PageDocument::parse(fixture()).unwrap();

        assert_eq!(doc.title.as_deref(), Some("Blog — Example"));
        assert_eq!(doc.canonical.as_deref(), Some("https://site.example/blog"));
        assert_eq!(doc.description.as_deref(), Some("Posts about things"));
    }

    #[test]
    fn captures_main_region_inner_markup() {
        let doc = PageDocument::parse(fixture()).unwrap();
        let main = doc.main_html.unwrap();

        assert!(main.contains("<h1>Blog</h1>"));
        assert!(main.contains("<em>posts</em>"));
        // boundary tags are not part of the captured region
        assert!(!main.contains("main-content"));
        assert!(!main.contains("<footer>"));
    }

    #[test]
    fn collects_nav_links_in_document_order() {
        let doc = PageDocument::parse(fixture()).unwrap();
        assert_eq!(doc.nav_links, vec!["/", "/blog", "/docs"]);
    }

    #[test]
    fn collects_anchor_attributes() {
        let doc = PageDocument::parse(fixture()).unwrap();

        let download = doc.links.iter().find(|l| l.href == "/files/a.zip").unwrap();
        assert!(download.meta.download);

        let blank = doc
            .links
            .iter()
            .find(|l| l.href == "https://other.example/x")
            .unwrap();
        assert_eq!(blank.meta.target.as_deref(), Some("_blank"));
    }

    #[test]
    fn opt_out_is_inherited_from_ancestors() {
        let doc = PageDocument::parse(fixture()).unwrap();

        let logout = doc.links.iter().find(|l| l.href == "/auth/logout").unwrap();
        assert!(logout.meta.opt_out);

        let post = doc.links.iter().find(|l| l.href == "/blog/post-1").unwrap();
        assert!(!post.meta.opt_out);
    }

    #[test]
    fn tolerates_unclosed_void_elements() {
        let markup = concat!(
            "<html><head>",
            "<meta name=\"description\" content=\"d\">",
            "<link rel=\"canonical\" href=\"/x\">",
            "</head><body>",
            "<div id=\"main-content\"><p>Hi<br>there</p><img src=\"/i.png\"></div>",
            "<footer>after</footer>",
            "</body></html>"
        );
        let doc = PageDocument::parse(markup).unwrap();

        assert_eq!(doc.description.as_deref(), Some("d"));
        assert_eq!(doc.canonical.as_deref(), Some("/x"));

        let main = doc.main_html.unwrap();
        assert!(main.contains("there"));
        assert!(main.contains("img"));
        assert!(!main.contains("footer"));
    }

    #[test]
    fn missing_regions_parse_to_none() {
        let doc = PageDocument::parse("<html><body><p>bare</p></body></html>").unwrap();

        assert!(doc.title.is_none());
        assert!(doc.main_html.is_none());
        assert!(doc.nav_links.is_empty());
    }

    #[test]
    fn shell_from_document() {
        let doc = PageDocument::parse(fixture()).unwrap();
        let shell = DocumentShell::from_document(&doc);

        assert_eq!(shell.title, "Blog — Example");
        assert_eq!(shell.nav_links.len(), 3);
        assert!(shell.active_nav().is_empty());
        assert!(!shell.loading);
    }

    #[test]
    fn overlay_close_all() {
        let mut overlay = OverlayState {
            menu_open: true,
            sidebar_open: true,
        };
        assert!(overlay.any_open());

        overlay.close_all();
        assert!(!overlay.any_open());
    }
}
