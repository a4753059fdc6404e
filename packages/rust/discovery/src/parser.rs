//! Sitemap XML parser.
//!
//! Handles the two document shapes defined by <https://www.sitemaps.org/>:
//! - `<sitemapindex>`: a list of child sitemaps
//! - `<urlset>`: a list of page URLs
//!
//! Only `<loc>` values are needed, so extraction is regex based rather than a
//! full XML parse. Stylesheet processing instructions are stripped first.

use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index listing child sitemap URLs.
    Index(Vec<String>),
    /// A URL set listing page URLs.
    UrlSet(Vec<String>),
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches `<?xml-stylesheet ... ?>` processing instructions.
static STYLESHEET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\?xml-stylesheet.*?\?>").expect("stylesheet regex")
});

/// Matches `<loc>url</loc>`, optionally wrapped in CDATA.
static LOC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<loc>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</loc>").expect("loc regex")
});

/// Matches the opening `<sitemapindex` element, with or without a prefix.
static INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:[A-Za-z0-9_]+:)?sitemapindex[\s>]").expect("sitemapindex regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a sitemap document into its `<loc>` entries.
pub fn parse_sitemap(content: &str) -> SitemapDocument {
    let cleaned = STYLESHEET_RE.replace_all(content, "");

    let locs: Vec<String> = LOC_RE
        .captures_iter(&cleaned)
        .map(|caps| unescape(caps[1].trim()))
        .filter(|loc| !loc.is_empty())
        .collect();

    if INDEX_RE.is_match(&cleaned) {
        SitemapDocument::Index(locs)
    } else {
        SitemapDocument::UrlSet(locs)
    }
}

/// Pick the child sitemap holding posts from an index.
///
/// Prefers the first child whose URL contains `post-sitemap`, otherwise the
/// first child.
pub fn select_post_sitemap(children: &[String]) -> Option<&str> {
    children
        .iter()
        .find(|c| c.contains("post-sitemap"))
        .or_else(|| children.first())
        .map(String::as_str)
}

/// Pick a representative post URL from a URL set.
///
/// Skips blog index pages (`/blog` or `/blog/`); if every URL is an index
/// page, falls back to the first one.
pub fn select_recent_post(urls: &[String]) -> Option<&str> {
    urls.iter()
        .find(|u| !is_blog_index(u))
        .or_else(|| urls.first())
        .map(String::as_str)
}

fn is_blog_index(url: &str) -> bool {
    url.ends_with("/blog") || url.ends_with("/blog/")
}

/// Undo the XML entity escaping allowed inside `<loc>`.
fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
