//! Site content capability.

use async_trait::async_trait;
use outreach_shared::Result;

/// Finds a representative recent post for a website.
#[async_trait]
pub trait SiteContentFetcher: Send + Sync {
    /// Return the URL of a recent post on `site_url`, if one can be found.
    async fn recent_post(&self, site_url: &str) -> Result<Option<String>>;
}
