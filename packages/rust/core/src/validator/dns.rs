//! MX record lookup.

use std::time::Duration;

use async_trait::async_trait;
use outreach_shared::{OutreachError, Result};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;

/// Resolves the mail exchange for a domain.
#[async_trait]
pub trait MxResolver: Send + Sync {
    /// The preferred MX host, or `None` when the domain has no MX record.
    async fn lookup_mx(&self, domain: &str) -> Result<Option<String>>;
}

/// System DNS resolver with a bounded lookup time.
pub struct DnsMxResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsMxResolver {
    pub fn new(timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
            timeout,
        }
    }
}

#[async_trait]
impl MxResolver for DnsMxResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Option<String>> {
        let lookup = match tokio::time::timeout(self.timeout, self.resolver.mx_lookup(domain)).await
        {
            Err(_) => {
                return Err(OutreachError::Provider(format!(
                    "{domain}: DNS lookup timed out"
                )));
            }
            Ok(Err(e)) => {
                if matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                    return Ok(None);
                }
                return Err(OutreachError::Provider(format!("{domain}: {e}")));
            }
            Ok(Ok(lookup)) => lookup,
        };

        let host = lookup
            .iter()
            .min_by_key(|mx| mx.preference())
            .map(|mx| mx.exchange().to_utf8().trim_end_matches('.').to_string())
            .filter(|h| !h.is_empty());

        tracing::debug!(%domain, mx = ?host, "MX lookup complete");
        Ok(host)
    }
}
