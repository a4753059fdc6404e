//! Core domain types for outreach campaigns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CampaignId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for campaign run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub Uuid);

impl CampaignId {
    /// Generate a new time-sortable campaign identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CampaignId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CampaignId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// The subject a campaign prospects for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl Topic {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Search results and prospects
// ---------------------------------------------------------------------------

/// One organic result returned by a search provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub position: u32,
}

/// A website category paired with the query used to find sites in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryQuery {
    pub category: String,
    pub search_term: String,
}

/// Records which category and search term produced a prospect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub category: String,
    pub search_term: String,
}

impl From<&CategoryQuery> for Provenance {
    fn from(query: &CategoryQuery) -> Self {
        Self {
            category: query.category.clone(),
            search_term: query.search_term.clone(),
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.category, self.search_term)
    }
}

/// A candidate target website discovered for backlink outreach.
///
/// `url` is always `scheme://host[:port]` and unique within one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub provenance: Provenance,
}

// ---------------------------------------------------------------------------
// Sender profile and drafts
// ---------------------------------------------------------------------------

/// Who the outreach is sent on behalf of. Immutable for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    /// Founder name used in the introduction and signature.
    #[serde(default)]
    pub sender_name: String,
    /// Name of the sender's blog.
    #[serde(default)]
    pub blog_name: String,
    /// Public URL of the sender's blog.
    #[serde(default)]
    pub blog_url: String,
    /// What the sender brings to the target's readers.
    #[serde(default)]
    pub leverage_statement: String,
}

/// A drafted outreach email, ready to send or discard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
    pub recipient_email: String,
}

// ---------------------------------------------------------------------------
// Email validation
// ---------------------------------------------------------------------------

/// Detail keys written by the validator, in check order.
pub mod detail_keys {
    pub const SYNTAX_VALID: &str = "syntax_valid";
    pub const DOMAIN_VALID: &str = "domain_valid";
    pub const IS_DISPOSABLE: &str = "is_disposable";
    pub const SMTP_CHECK: &str = "smtp_check";
    pub const SMTP_MESSAGE: &str = "smtp_message";
}

/// A single validation detail: either a check outcome or a descriptive string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetailValue {
    Bool(bool),
    Text(String),
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Outcome of validating one recipient address.
///
/// Only checks that actually ran appear in `details`; `reason` names the
/// first failing check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub email: String,
    pub is_valid: bool,
    pub reason: Option<String>,
    pub details: BTreeMap<String, DetailValue>,
}

impl ValidationResult {
    /// Start an (as yet unproven) result for `email`.
    pub fn pending(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            is_valid: false,
            reason: None,
            details: BTreeMap::new(),
        }
    }

    /// Record a detail value.
    pub fn record(&mut self, key: &str, value: impl Into<DetailValue>) {
        self.details.insert(key.to_string(), value.into());
    }

    /// Mark the result as failed with the given reason.
    pub fn fail(mut self, reason: impl Into<String>) -> Self {
        self.is_valid = false;
        self.reason = Some(reason.into());
        self
    }

    /// Mark the result as passed.
    pub fn pass(mut self) -> Self {
        self.is_valid = true;
        self.reason = None;
        self
    }

    /// Look up a boolean detail.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.details.get(key) {
            Some(DetailValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Campaign results
// ---------------------------------------------------------------------------

/// Terminal status of a campaign run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Completed,
    Failed,
}

/// Terminal state of one selected prospect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProspectState {
    Sent,
    Failed,
    Skipped,
}

/// What happened to one selected prospect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProspectOutcome {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub state: ProspectState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregated statistics for one campaign run.
///
/// `emails_sent + emails_failed == emails_created` holds for every
/// completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignResult {
    pub id: CampaignId,
    pub status: CampaignStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub total_prospects: usize,
    pub selected_prospects: usize,
    pub prospects_skipped: usize,
    pub emails_created: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<ProspectOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CampaignResult {
    /// A run that stopped before any email was attempted.
    pub fn failed(
        id: CampaignId,
        reason: impl Into<String>,
        total_prospects: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: CampaignStatus::Failed,
            reason: Some(reason.into()),
            total_prospects,
            selected_prospects: 0,
            prospects_skipped: 0,
            emails_created: 0,
            emails_sent: 0,
            emails_failed: 0,
            outcomes: Vec::new(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Whether the sent/failed counters add up to the drafted count.
    pub fn counters_balanced(&self) -> bool {
        self.emails_sent + self.emails_failed == self.emails_created
    }
}
