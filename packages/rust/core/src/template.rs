//! Personalized outreach email bodies.
//!
//! The body is a fixed template in which exactly one sentence varies: how the
//! target site's readers benefit from the sender's blog. The model is asked
//! to fill in only that sentence. Whatever it returns, only that sentence is
//! kept and re-assembled into the template.

use std::collections::HashMap;
use std::sync::Arc;

use outreach_providers::{GenerativeTextProvider, SiteContentFetcher, TextRequest};
use outreach_shared::{EmailDraft, OutreachError, Prospect, Result, SenderProfile};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Context used when the target site has no discoverable recent post.
const NO_RECENT_POST: &str =
    "No recent post could be found on this site; use the site address and general topic instead.";

const GREETING: &str = "Hi there,";
const SAMPLE_LEAD: &str = "Here's a sample of my most recent work:";
const COLLABORATION_LINE: &str = "I wanted to see if we could talk about collaborating together via link exchange and/or contributing to a guest post on your site.";
const SIGN_OFF: &str = "Let me know what you think.";

// ---------------------------------------------------------------------------
// Fixed template
// ---------------------------------------------------------------------------

/// Subject line for every draft from `profile`.
pub fn subject_for(profile: &SenderProfile) -> String {
    format!("Collaboration opportunity with {}", profile.sender_name)
}

fn introduction(profile: &SenderProfile) -> String {
    format!(
        "My name is {} and I am the founder of {}.",
        profile.sender_name, profile.blog_name
    )
}

fn signature(profile: &SenderProfile) -> String {
    format!(
        "Best,\n\n{}\n{} | {}",
        profile.sender_name, profile.blog_name, profile.blog_url
    )
}

/// Render the fixed template around one benefit sentence.
pub fn assemble_body(profile: &SenderProfile, benefit_sentence: &str, recent_work_url: &str) -> String {
    let benefit = benefit_sentence.trim();
    let stop = if benefit.ends_with(['.', '!', '?']) { "" } else { "." };
    format!(
        "{GREETING}\n\n{}\n\n{benefit}{stop} {SAMPLE_LEAD} {recent_work_url}\n\n{COLLABORATION_LINE}\n\n{SIGN_OFF}\n\n{}",
        introduction(profile),
        signature(profile)
    )
}

/// The prompt sent to the model for one target site.
pub fn build_prompt(
    site_url: &str,
    recent_post: Option<&str>,
    recent_work_url: &str,
    profile: &SenderProfile,
) -> String {
    let context = recent_post.unwrap_or(NO_RECENT_POST);
    let template = assemble_body(
        profile,
        "[ONE sentence on how their readers benefit from my blog]",
        recent_work_url,
    );

    format!(
        "You are a professional outreach specialist. Write an outreach email to the owner of \
         the blog at {site_url}.\n\n\
         A recent post from their site:\n{context}\n\n\
         About my blog:\nName: {blog_name}\nURL: {blog_url}\nWhat I offer: {leverage}\n\n\
         Use this template EXACTLY:\n\n{template}\n\n\
         IMPORTANT:\n\
         1. Replace ONLY the bracketed placeholder with one sentence, grounded in their recent post, \
         describing how their readers would benefit from my blog.\n\
         2. Keep every other line of the template exactly as shown, including \
         \"I am the founder of {blog_name}\" and the signature.\n\
         3. Return only the email body, no subject line.",
        blog_name = profile.blog_name,
        blog_url = profile.blog_url,
        leverage = profile.leverage_statement,
    )
}

// ---------------------------------------------------------------------------
// TemplateMaker
// ---------------------------------------------------------------------------

pub struct TemplateMaker {
    llm: Arc<dyn GenerativeTextProvider>,
    content: Arc<dyn SiteContentFetcher>,
    /// Sender's recent work URL, keyed by `blog_url`.
    work_urls: Mutex<HashMap<String, String>>,
}

impl TemplateMaker {
    pub fn new(llm: Arc<dyn GenerativeTextProvider>, content: Arc<dyn SiteContentFetcher>) -> Self {
        Self {
            llm,
            content,
            work_urls: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `body` carries every fixed piece of the template unchanged.
    pub fn verify_boilerplate(body: &str, profile: &SenderProfile) -> bool {
        let body = body.trim();
        body.starts_with(GREETING)
            && body.contains(&introduction(profile))
            && body.contains(SAMPLE_LEAD)
            && body.contains(COLLABORATION_LINE)
            && body.contains(SIGN_OFF)
            && body.ends_with(&signature(profile))
    }

    /// A recent post on `site_url`, or `None`. Never fails.
    async fn recent_post(&self, site_url: &str) -> Option<String> {
        match self.content.recent_post(site_url).await {
            Ok(post) => post,
            Err(e) => {
                warn!(site = %site_url, error = %e, "recent post lookup failed");
                None
            }
        }
    }

    /// The sender's own most recent post, looked up once per blog.
    async fn recent_work_url(&self, profile: &SenderProfile) -> String {
        let mut cache = self.work_urls.lock().await;
        if let Some(url) = cache.get(&profile.blog_url) {
            return url.clone();
        }
        let url = self
            .recent_post(&profile.blog_url)
            .await
            .unwrap_or_else(|| profile.blog_url.clone());
        cache.insert(profile.blog_url.clone(), url.clone());
        url
    }

    /// Generate the email body for `site_url`.
    ///
    /// The returned body is always the fixed template around the single
    /// sentence found in the model's reply.
    #[instrument(skip_all, fields(site = %site_url))]
    pub async fn create_template(&self, site_url: &str, profile: &SenderProfile) -> Result<String> {
        let recent_post = self.recent_post(site_url).await;
        let recent_work_url = self.recent_work_url(profile).await;
        debug!(recent_post = ?recent_post, %recent_work_url, "template context");

        let prompt = build_prompt(site_url, recent_post.as_deref(), &recent_work_url, profile);
        let text = self.llm.complete(&TextRequest::precise(prompt)).await?;
        let body = text.trim();

        let sentence = extract_benefit_sentence(body, profile).ok_or_else(|| {
            OutreachError::parse("generated email has no personalized sentence")
        })?;
        let assembled = assemble_body(profile, &sentence, &recent_work_url);
        if assembled != body {
            info!("model altered the template, re-assembling");
        }
        Ok(assembled)
    }

    /// Draft a complete email for `prospect` addressed to `recipient`.
    pub async fn draft(
        &self,
        prospect: &Prospect,
        recipient: &str,
        profile: &SenderProfile,
    ) -> Result<EmailDraft> {
        let body = self.create_template(&prospect.url, profile).await?;
        Ok(EmailDraft {
            subject: subject_for(profile),
            body,
            recipient_email: recipient.to_string(),
        })
    }
}

/// Find the personalized sentence in a model reply.
///
/// The paragraph that leads into the work sample wins; otherwise the first
/// paragraph that is not boilerplate. Unfilled `[placeholder]` text never counts.
fn extract_benefit_sentence(body: &str, profile: &SenderProfile) -> Option<String> {
    let fixed = [
        introduction(profile),
        COLLABORATION_LINE.to_string(),
        SIGN_OFF.to_string(),
    ];

    let candidates: Vec<(bool, String)> = body
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter(|p| {
            let lower = p.to_lowercase();
            !(lower.starts_with("hi ")
                || lower.starts_with("hi,")
                || lower.starts_with("hello")
                || lower.starts_with("dear")
                || lower.starts_with("subject:")
                || lower.starts_with("best")
                || lower.starts_with("my name is"))
        })
        .filter(|p| !fixed.iter().any(|f| p.contains(f.as_str())))
        .filter(|p| !p.starts_with(&profile.sender_name) && !p.starts_with(&profile.blog_name))
        .map(|p| match p.find(SAMPLE_LEAD) {
            Some(idx) => (true, p[..idx].trim().to_string()),
            None => (false, p.to_string()),
        })
        .filter(|(_, p)| !p.is_empty() && !p.contains(['[', ']']))
        .collect();

    candidates
        .iter()
        .find(|(lead, _)| *lead)
        .or_else(|| candidates.first())
        .map(|(_, p)| p.clone())
}
