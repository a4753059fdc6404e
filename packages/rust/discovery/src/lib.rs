//! Sitemap-based discovery of a site's recent posts.
//!
//! Given any URL on a site, [`SitemapFetcher`] reads `<origin>/sitemap.xml`,
//! follows a sitemap index one level down (preferring the `post-sitemap`
//! child), and picks a post URL that is not a blog index page.

mod parser;

use std::time::Duration;

use async_trait::async_trait;
use outreach_providers::{SiteContentFetcher, build_client};
use outreach_shared::{OutreachError, Result};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::{SitemapDocument, parse_sitemap, select_post_sitemap, select_recent_post};

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// SitemapFetcher
// ---------------------------------------------------------------------------

/// Finds a recent post on a site through its XML sitemap.
pub struct SitemapFetcher {
    client: Client,
}

impl SitemapFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }

    /// Fetch and parse one sitemap document. `None` when it does not exist.
    async fn fetch_document(&self, url: &str) -> Result<Option<SitemapDocument>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OutreachError::Provider(format!("{url}: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!(%url, "no sitemap");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(OutreachError::Provider(format!("{url}: HTTP {status}")));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(OutreachError::validation(format!(
                    "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| OutreachError::Provider(format!("{url}: failed to read body: {e}")))?;

        Ok(Some(parse_sitemap(&body)))
    }
}

#[async_trait]
impl SiteContentFetcher for SitemapFetcher {
    #[instrument(skip_all, fields(site = %site_url))]
    async fn recent_post(&self, site_url: &str) -> Result<Option<String>> {
        let url = Url::parse(site_url)
            .map_err(|e| OutreachError::validation(format!("invalid site URL {site_url}: {e}")))?;
        let sitemap_url = format!("{}/sitemap.xml", origin_url(&url)?);

        let urls = match self.fetch_document(&sitemap_url).await? {
            None => return Ok(None),
            Some(SitemapDocument::UrlSet(urls)) => urls,
            Some(SitemapDocument::Index(children)) => {
                let Some(child) = select_post_sitemap(&children) else {
                    return Ok(None);
                };
                debug!(%child, "following sitemap index");
                match self.fetch_document(child).await? {
                    Some(SitemapDocument::UrlSet(urls)) => urls,
                    _ => return Ok(None),
                }
            }
        };

        let post = select_recent_post(&urls).map(str::to_string);
        info!(candidates = urls.len(), found = post.is_some(), "sitemap scanned");
        Ok(post)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract the origin (scheme + host + port) from a URL.
fn origin_url(url: &Url) -> Result<String> {
    let scheme = url.scheme();
    let host = url
        .host_str()
        .ok_or_else(|| OutreachError::validation(format!("URL has no host: {url}")))?;

    match url.port() {
        Some(port) => Ok(format!("{scheme}://{host}:{port}")),
        None => Ok(format!("{scheme}://{host}")),
    }
}
