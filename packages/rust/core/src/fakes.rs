//! In-memory provider fakes shared by the unit tests in this crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use outreach_providers::{
    ContactFinder, DeliveryReceipt, EmailDeliveryProvider, GenerativeTextProvider, OutgoingEmail,
    SearchProvider, SiteContentFetcher, TextRequest,
};
use outreach_shared::{OutreachError, Result, SearchHit, SenderProfile};
use serde_json::Value;

use crate::validator::{MxResolver, SmtpOutcome, SmtpProbe};

pub fn profile() -> SenderProfile {
    SenderProfile {
        sender_name: "Jordan Reyes".into(),
        blog_name: "Ruck Report".into(),
        blog_url: "https://ruckreport.example".into(),
        leverage_statement: "I publish weekly field-tested gear reviews".into(),
    }
}

pub fn hit(link: &str) -> SearchHit {
    SearchHit {
        title: format!("Title for {link}"),
        link: link.into(),
        snippet: format!("Snippet for {link}"),
        position: 1,
    }
}

// ---------------------------------------------------------------------------
// Generative text
// ---------------------------------------------------------------------------

/// Answers prompts by substring match, recording every prompt it sees.
#[derive(Default)]
pub struct FakeLlm {
    text: Vec<(String, std::result::Result<String, String>)>,
    json: Option<std::result::Result<Value, String>>,
    pub prompts: Mutex<Vec<String>>,
    pub requests: Mutex<Vec<TextRequest>>,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` to any prompt containing `needle`.
    pub fn on(mut self, needle: &str, reply: &str) -> Self {
        self.text.push((needle.into(), Ok(reply.into())));
        self
    }

    /// Fail any prompt containing `needle`.
    pub fn fail_on(mut self, needle: &str) -> Self {
        self.text.push((needle.into(), Err("quota exceeded".into())));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.json = Some(Ok(value));
        self
    }

    pub fn json_fails(mut self) -> Self {
        self.json = Some(Err("malformed".into()));
        self
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeTextProvider for FakeLlm {
    async fn complete(&self, request: &TextRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.requests.lock().unwrap().push(request.clone());
        for (needle, reply) in &self.text {
            if request.prompt.contains(needle.as_str()) {
                return reply.clone().map_err(OutreachError::Provider);
            }
        }
        Err(OutreachError::Provider("no scripted reply".into()))
    }

    async fn complete_json(&self, request: &TextRequest, _schema: &Value) -> Result<Value> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match &self.json {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(e)) => Err(OutreachError::parse(e.clone())),
            None => Err(OutreachError::Provider("no scripted json".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Returns scripted hits per query; unknown queries return nothing.
#[derive(Default)]
pub struct FakeSearch {
    hits: HashMap<String, Vec<SearchHit>>,
    failing: Vec<String>,
    misconfigured: bool,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, query: &str, links: &[&str]) -> Self {
        self.hits
            .insert(query.into(), links.iter().map(|l| hit(l)).collect());
        self
    }

    pub fn failing(mut self, query: &str) -> Self {
        self.failing.push(query.into());
        self
    }

    /// Every query fails with a configuration error.
    pub fn misconfigured(mut self) -> Self {
        self.misconfigured = true;
        self
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, _num_results: u32) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.into());
        if self.misconfigured {
            return Err(OutreachError::config("SERPER_API_KEY is not set"));
        }
        if self.failing.iter().any(|q| q == query) {
            return Err(OutreachError::Provider(format!("{query}: HTTP 500")));
        }
        Ok(self.hits.get(query).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Site content
// ---------------------------------------------------------------------------

/// Returns a fixed post per site, or an error for sites marked broken. Records lookups.
#[derive(Default)]
pub struct FakeContent {
    posts: HashMap<String, String>,
    broken: Vec<String>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, site: &str, post: &str) -> Self {
        self.posts.insert(site.into(), post.into());
        self
    }

    pub fn broken(mut self, site: &str) -> Self {
        self.broken.push(site.into());
        self
    }
}

#[async_trait]
impl SiteContentFetcher for FakeContent {
    async fn recent_post(&self, site_url: &str) -> Result<Option<String>> {
        self.lookups.lock().unwrap().push(site_url.into());
        if self.broken.iter().any(|s| s == site_url) {
            return Err(OutreachError::Provider(format!("{site_url}: timed out")));
        }
        Ok(self.posts.get(site_url).cloned())
    }
}

// ---------------------------------------------------------------------------
// Delivery and contacts
// ---------------------------------------------------------------------------

/// Records deliveries; recipients listed in `rejecting` fail.
#[derive(Default)]
pub struct FakeDelivery {
    rejecting: Vec<String>,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

impl FakeDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, to: &str) -> Self {
        self.rejecting.push(to.into());
        self
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailDeliveryProvider for FakeDelivery {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt> {
        self.sent.lock().unwrap().push(email.clone());
        if self.rejecting.contains(&email.to) {
            return Err(OutreachError::Provider("SendGrid error (500): down".into()));
        }
        Ok(DeliveryReceipt {
            success: true,
            status_code: 202,
            message: "msg-1".into(),
        })
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Derives `editor@<host>` for every site unless the site is listed as unknown.
#[derive(Default)]
pub struct FakeContacts {
    unknown: Vec<String>,
    pub lookups: Mutex<Vec<String>>,
}

impl FakeContacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown(mut self, site: &str) -> Self {
        self.unknown.push(site.into());
        self
    }
}

#[async_trait]
impl ContactFinder for FakeContacts {
    async fn find_contact_email(&self, site_url: &str) -> Result<Option<String>> {
        self.lookups.lock().unwrap().push(site_url.into());
        if self.unknown.iter().any(|s| s == site_url) {
            return Ok(None);
        }
        let host = site_url
            .split("://")
            .nth(1)
            .unwrap_or(site_url)
            .trim_end_matches('/');
        Ok(Some(format!("editor@{host}")))
    }
}

// ---------------------------------------------------------------------------
// DNS and SMTP
// ---------------------------------------------------------------------------

/// Resolves every domain to `mx.<domain>` except those listed as dead.
#[derive(Default)]
pub struct StubMx {
    dead: Vec<String>,
    erroring: Vec<String>,
}

impl StubMx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dead(mut self, domain: &str) -> Self {
        self.dead.push(domain.into());
        self
    }

    pub fn erroring(mut self, domain: &str) -> Self {
        self.erroring.push(domain.into());
        self
    }
}

#[async_trait]
impl MxResolver for StubMx {
    async fn lookup_mx(&self, domain: &str) -> Result<Option<String>> {
        if self.erroring.iter().any(|d| d == domain) {
            return Err(OutreachError::Provider("DNS lookup timed out".into()));
        }
        if self.dead.iter().any(|d| d == domain) {
            return Ok(None);
        }
        Ok(Some(format!("mx.{domain}")))
    }
}

/// Returns a fixed SMTP outcome and counts probes.
pub struct StubProbe {
    outcome: std::result::Result<SmtpOutcome, String>,
    pub probes: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubProbe {
    pub fn new(outcome: SmtpOutcome) -> Self {
        Self {
            outcome: Ok(outcome),
            probes: Arc::default(),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.into()),
            probes: Arc::default(),
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }
}

#[async_trait]
impl SmtpProbe for StubProbe {
    async fn probe(&self, mx_host: &str, _sender: &str, recipient: &str) -> Result<SmtpOutcome> {
        self.probes
            .lock()
            .unwrap()
            .push((mx_host.into(), recipient.into()));
        self.outcome.clone().map_err(OutreachError::Provider)
    }
}
