//! End-to-end campaign run: prospects → select → contact → validate → draft → send.
//!
//! Prospects are processed one at a time. A failure at any per-prospect stage
//! is logged and recorded as that prospect's outcome; the loop always moves
//! on to the next prospect.

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use outreach_providers::ContactFinder;
use outreach_shared::{
    CampaignConfig, CampaignId, CampaignResult, CampaignStatus, Prospect, ProspectOutcome,
    ProspectState, Result, SenderProfile, Topic,
};

use crate::prospects::ProspectGenerator;
use crate::sender::EmailSender;
use crate::template::TemplateMaker;
use crate::validator::EmailValidator;

// ---------------------------------------------------------------------------
// Settings and progress
// ---------------------------------------------------------------------------

/// Per-run knobs taken from `[campaign]`.
#[derive(Debug, Clone)]
pub struct CampaignSettings {
    pub max_emails: usize,
    pub validate_recipients: bool,
    pub check_smtp: bool,
}

impl From<&CampaignConfig> for CampaignSettings {
    fn from(config: &CampaignConfig) -> Self {
        Self {
            max_emails: config.max_emails,
            validate_recipients: config.validate_recipients,
            check_smtp: config.check_smtp,
        }
    }
}

/// Progress callback for reporting campaign status.
pub trait CampaignProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a selected prospect is processed.
    fn prospect_started(&self, url: &str, current: usize, total: usize);
    /// Called once a selected prospect reaches a terminal state.
    fn prospect_finished(&self, outcome: &ProspectOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl CampaignProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn prospect_started(&self, _url: &str, _current: usize, _total: usize) {}
    fn prospect_finished(&self, _outcome: &ProspectOutcome) {}
}

// ---------------------------------------------------------------------------
// ControlPanel
// ---------------------------------------------------------------------------

pub struct ControlPanel {
    generator: ProspectGenerator,
    contacts: Arc<dyn ContactFinder>,
    validator: EmailValidator,
    templates: TemplateMaker,
    sender: EmailSender,
    profile: SenderProfile,
    settings: CampaignSettings,
    rng_seed: Option<u64>,
}

impl ControlPanel {
    pub fn new(
        generator: ProspectGenerator,
        contacts: Arc<dyn ContactFinder>,
        validator: EmailValidator,
        templates: TemplateMaker,
        sender: EmailSender,
        profile: SenderProfile,
        settings: CampaignSettings,
    ) -> Self {
        Self {
            generator,
            contacts,
            validator,
            templates,
            sender,
            profile,
            settings,
            rng_seed: None,
        }
    }

    /// Make prospect selection deterministic.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Shuffle and cap the prospect list.
    fn select(&self, mut prospects: Vec<Prospect>) -> Vec<Prospect> {
        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        prospects.shuffle(&mut rng);
        prospects.truncate(self.settings.max_emails);
        prospects
    }

    /// Run one campaign for `topic`.
    ///
    /// Only fatal configuration errors are returned as `Err`; everything else
    /// is reported in the [`CampaignResult`].
    #[instrument(skip_all, fields(title = %topic.title, max_emails = self.settings.max_emails))]
    pub async fn run_outreach_campaign(
        &self,
        topic: &Topic,
        progress: &dyn CampaignProgress,
    ) -> Result<CampaignResult> {
        let id = CampaignId::new();
        let started_at = Utc::now();
        info!(%id, "starting campaign");

        // --- Phase 1: Prospects ---
        progress.phase("Generating prospects");
        let prospects = match self.generator.generate_prospects(topic).await {
            Ok(p) => p,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "prospect generation failed");
                return Ok(CampaignResult::failed(id, e.to_string(), 0, started_at));
            }
        };

        let total_prospects = prospects.len();
        if prospects.is_empty() {
            warn!("no prospects found");
            return Ok(CampaignResult::failed(
                id,
                "No prospects found",
                0,
                started_at,
            ));
        }

        // --- Phase 2: Selection ---
        let selected = self.select(prospects);
        info!(total_prospects, selected = selected.len(), "prospects selected");

        // --- Phase 3: Outreach ---
        progress.phase("Sending outreach");
        let mut result = CampaignResult {
            id,
            status: CampaignStatus::Completed,
            reason: None,
            total_prospects,
            selected_prospects: selected.len(),
            prospects_skipped: 0,
            emails_created: 0,
            emails_sent: 0,
            emails_failed: 0,
            outcomes: Vec::with_capacity(selected.len()),
            started_at,
            finished_at: started_at,
        };

        for (i, prospect) in selected.iter().enumerate() {
            progress.prospect_started(&prospect.url, i + 1, selected.len());
            let outcome = self.process(prospect, &mut result).await;
            progress.prospect_finished(&outcome);
            result.outcomes.push(outcome);
        }

        result.finished_at = Utc::now();
        info!(
            sent = result.emails_sent,
            failed = result.emails_failed,
            skipped = result.prospects_skipped,
            "campaign complete"
        );
        Ok(result)
    }

    /// Take one prospect to a terminal state, updating the counters.
    async fn process(&self, prospect: &Prospect, result: &mut CampaignResult) -> ProspectOutcome {
        let url = prospect.url.clone();
        let skipped = |result: &mut CampaignResult, recipient: Option<String>, detail: String| {
            warn!(%url, %detail, "prospect skipped");
            result.prospects_skipped += 1;
            ProspectOutcome {
                url: url.clone(),
                recipient,
                state: ProspectState::Skipped,
                detail: Some(detail),
            }
        };

        let recipient = match self.contacts.find_contact_email(&prospect.url).await {
            Ok(Some(email)) => email,
            Ok(None) => return skipped(result, None, "no contact found".into()),
            Err(e) => return skipped(result, None, format!("contact lookup failed: {e}")),
        };

        if self.settings.validate_recipients {
            let validation = self
                .validator
                .is_valid_email(&recipient, self.settings.check_smtp)
                .await;
            if !validation.is_valid {
                let reason = validation.reason.unwrap_or_else(|| "invalid".into());
                return skipped(result, Some(recipient), format!("recipient rejected: {reason}"));
            }
        }

        let draft = match self.templates.draft(prospect, &recipient, &self.profile).await {
            Ok(draft) => draft,
            Err(e) => return skipped(result, Some(recipient), format!("draft failed: {e}")),
        };
        result.emails_created += 1;

        let sent = self
            .sender
            .send_email(&draft.recipient_email, &draft.subject, &draft.body)
            .await;

        if sent.is_success() {
            result.emails_sent += 1;
            ProspectOutcome {
                url,
                recipient: Some(recipient),
                state: ProspectState::Sent,
                detail: None,
            }
        } else {
            result.emails_failed += 1;
            ProspectOutcome {
                url,
                recipient: Some(recipient),
                state: ProspectState::Failed,
                detail: sent.reason,
            }
        }
    }
}
