//! Layered recipient address validation.
//!
//! Checks run in order and stop at the first failure:
//! 1. syntax
//! 2. domain has an MX record
//! 3. domain is not a known disposable provider
//! 4. (optional) the mailbox is accepted by the domain's mail server
//!
//! Only checks that ran appear in [`ValidationResult::details`]. A failing
//! check never raises; it produces `is_valid = false` with a reason.

mod dns;
mod smtp;

use std::sync::{Arc, LazyLock};

use outreach_shared::{ValidationResult, detail_keys};
use regex::Regex;
use tracing::{debug, instrument};

pub use dns::{DnsMxResolver, MxResolver};
pub use smtp::{LettreProbe, SmtpOutcome, SmtpProbe};

pub const REASON_SYNTAX: &str = "Invalid email format";
pub const REASON_DOMAIN: &str = "Domain does not exist or has no mail server";
pub const REASON_DISPOSABLE: &str = "Disposable email address";
pub const REASON_NO_MAILBOX: &str = "Email address does not exist";

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email regex")
});

/// Providers that hand out short-lived throwaway inboxes.
const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "tempmail.com",
    "guerrillamail.com",
    "10minutemail.com",
    "yopmail.com",
    "throwawaymail.com",
    "temp-mail.org",
    "fakeinbox.com",
    "sharklasers.com",
    "armyspy.com",
    "cuvox.de",
    "dayrep.com",
    "einrot.com",
    "fleckens.hu",
    "gustr.com",
    "jourrapide.com",
    "rhyta.com",
    "superrito.com",
    "teleworm.us",
    "trashmail.com",
    "mailnesia.com",
    "mailcatch.com",
    "dispostable.com",
    "maildrop.cc",
    "harakirimail.com",
    "getairmail.com",
    "getnada.com",
    "inboxalias.com",
    "tempr.email",
    "spamgourmet.com",
    "mytemp.email",
    "burnermail.io",
    "temp-mail.io",
    "emailondeck.com",
    "mohmal.com",
    "incognitomail.com",
    "tempmailaddress.com",
    "tempail.com",
    "wegwerfemail.de",
    "trashmail.de",
    "emailsensei.com",
];

/// Whether `domain` belongs to a disposable-inbox provider.
pub fn is_disposable(domain: &str) -> bool {
    let domain = domain.trim().to_ascii_lowercase();
    DISPOSABLE_DOMAINS.contains(&domain.as_str())
}

/// Whether `email` has the `local@domain.tld` shape.
pub fn is_valid_syntax(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

// ---------------------------------------------------------------------------
// EmailValidator
// ---------------------------------------------------------------------------

/// Classifies recipient addresses as usable or not.
pub struct EmailValidator {
    resolver: Arc<dyn MxResolver>,
    probe: Arc<dyn SmtpProbe>,
    probe_sender: String,
}

impl EmailValidator {
    pub fn new(
        resolver: Arc<dyn MxResolver>,
        probe: Arc<dyn SmtpProbe>,
        probe_sender: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            probe,
            probe_sender: probe_sender.into(),
        }
    }

    /// Run the ordered checks against `email`.
    #[instrument(skip_all, fields(email = %email, check_smtp))]
    pub async fn is_valid_email(&self, email: &str, check_smtp: bool) -> ValidationResult {
        let email = email.trim();
        let mut result = ValidationResult::pending(email);

        // 1. syntax
        let syntax_ok = is_valid_syntax(email);
        result.record(detail_keys::SYNTAX_VALID, syntax_ok);
        if !syntax_ok {
            return result.fail(REASON_SYNTAX);
        }

        let domain = match email.rsplit_once('@') {
            Some((_, domain)) => domain.to_ascii_lowercase(),
            None => return result.fail(REASON_SYNTAX),
        };

        // 2. MX
        let mx_host = match self.resolver.lookup_mx(&domain).await {
            Ok(Some(host)) => host,
            Ok(None) => {
                result.record(detail_keys::DOMAIN_VALID, false);
                return result.fail(REASON_DOMAIN);
            }
            Err(e) => {
                debug!(error = %e, %domain, "MX lookup failed");
                result.record(detail_keys::DOMAIN_VALID, false);
                return result.fail(REASON_DOMAIN);
            }
        };
        result.record(detail_keys::DOMAIN_VALID, true);

        // 3. disposable
        let disposable = is_disposable(&domain);
        result.record(detail_keys::IS_DISPOSABLE, disposable);
        if disposable {
            return result.fail(REASON_DISPOSABLE);
        }

        if !check_smtp {
            return result.pass();
        }

        // 4. SMTP mailbox probe (best effort)
        match self.probe.probe(&mx_host, &self.probe_sender, email).await {
            Ok(SmtpOutcome::Exists) => {
                result.record(detail_keys::SMTP_CHECK, true);
                result.record(detail_keys::SMTP_MESSAGE, "Email address exists");
                result.pass()
            }
            Ok(SmtpOutcome::DoesNotExist) => {
                result.record(detail_keys::SMTP_CHECK, false);
                result.record(detail_keys::SMTP_MESSAGE, REASON_NO_MAILBOX);
                result.fail(REASON_NO_MAILBOX)
            }
            Ok(SmtpOutcome::Inconclusive(message)) => {
                result.record(detail_keys::SMTP_CHECK, false);
                let reason = format!("Error: {message}");
                result.record(detail_keys::SMTP_MESSAGE, message);
                result.fail(reason)
            }
            Err(e) => {
                result.record(detail_keys::SMTP_CHECK, false);
                result.record(detail_keys::SMTP_MESSAGE, e.to_string());
                result.fail(format!("Error: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{StubMx, StubProbe};
    use outreach_shared::DetailValue;

    fn validator(mx: StubMx, probe: Arc<StubProbe>) -> EmailValidator {
        EmailValidator::new(Arc::new(mx), probe, "verification@example.com")
    }

    fn keys(result: &ValidationResult) -> Vec<&str> {
        result.details.keys().map(String::as_str).collect()
    }

    #[test]
    fn syntax_examples() {
        assert!(is_valid_syntax("jordan.reyes+news@ruck-report.co.uk"));
        assert!(!is_valid_syntax("not-an-email"));
        assert!(!is_valid_syntax("a@b"));
        assert!(!is_valid_syntax("a b@c.com"));
        assert!(!is_valid_syntax("@c.com"));
    }

    #[test]
    fn disposable_match_is_case_insensitive() {
        assert!(is_disposable("Mailinator.COM"));
        assert!(is_disposable("yopmail.com"));
        assert!(!is_disposable("gmail.com"));
        assert!(!is_disposable("sub.mailinator.com.example"));
    }

    #[tokio::test]
    async fn bad_syntax_short_circuits() {
        let probe = Arc::new(StubProbe::new(SmtpOutcome::Exists));
        let result = validator(StubMx::new(), probe.clone())
            .is_valid_email("not-an-email", true)
            .await;

        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(REASON_SYNTAX));
        assert_eq!(keys(&result), vec!["syntax_valid"]);
        assert_eq!(result.flag("syntax_valid"), Some(false));
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn disposable_address_fails_after_mx() {
        let probe = Arc::new(StubProbe::new(SmtpOutcome::Exists));
        let result = validator(StubMx::new(), probe.clone())
            .is_valid_email("user@mailinator.com", true)
            .await;

        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(REASON_DISPOSABLE));
        assert_eq!(
            keys(&result),
            vec!["domain_valid", "is_disposable", "syntax_valid"]
        );
        assert_eq!(result.flag("syntax_valid"), Some(true));
        assert_eq!(result.flag("domain_valid"), Some(true));
        assert_eq!(result.flag("is_disposable"), Some(true));
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn missing_mx_fails_domain_check() {
        let probe = Arc::new(StubProbe::new(SmtpOutcome::Exists));
        let result = validator(StubMx::new().dead("nowhere.example"), probe)
            .is_valid_email("a@nowhere.example", false)
            .await;

        assert_eq!(result.reason.as_deref(), Some(REASON_DOMAIN));
        assert_eq!(result.flag("domain_valid"), Some(false));
        assert!(!result.details.contains_key("is_disposable"));
    }

    #[tokio::test]
    async fn dns_error_is_reported_as_missing_domain() {
        let probe = Arc::new(StubProbe::new(SmtpOutcome::Exists));
        let result = validator(StubMx::new().erroring("slow.example"), probe)
            .is_valid_email("a@slow.example", false)
            .await;

        assert!(!result.is_valid);
        assert_eq!(result.reason.as_deref(), Some(REASON_DOMAIN));
    }

    #[tokio::test]
    async fn passes_without_smtp_by_default() {
        let probe = Arc::new(StubProbe::new(SmtpOutcome::DoesNotExist));
        let result = validator(StubMx::new(), probe.clone())
            .is_valid_email("editor@rucklife.example", false)
            .await;

        assert!(result.is_valid);
        assert!(result.reason.is_none());
        assert!(!result.details.contains_key("smtp_check"));
        assert_eq!(probe.probe_count(), 0);
    }

    #[tokio::test]
    async fn smtp_probe_uses_resolved_mx() {
        let probe = Arc::new(StubProbe::new(SmtpOutcome::Exists));
        let result = validator(StubMx::new(), probe.clone())
            .is_valid_email("editor@rucklife.example", true)
            .await;

        assert!(result.is_valid);
        assert_eq!(result.flag("smtp_check"), Some(true));
        let probes = probe.probes.lock().unwrap().clone();
        assert_eq!(
            probes,
            vec![("mx.rucklife.example".to_string(), "editor@rucklife.example".to_string())]
        );
    }

    #[tokio::test]
    async fn smtp_rejection_and_errors() {
        let rejected = validator(StubMx::new(), Arc::new(StubProbe::new(SmtpOutcome::DoesNotExist)))
            .is_valid_email("ghost@rucklife.example", true)
            .await;
        assert_eq!(rejected.reason.as_deref(), Some(REASON_NO_MAILBOX));
        assert_eq!(rejected.flag("smtp_check"), Some(false));

        let greylisted = validator(
            StubMx::new(),
            Arc::new(StubProbe::new(SmtpOutcome::Inconclusive("451 try again later".into()))),
        )
        .is_valid_email("x@rucklife.example", true)
        .await;
        assert_eq!(greylisted.reason.as_deref(), Some("Error: 451 try again later"));
        assert_eq!(
            greylisted.details.get("smtp_message"),
            Some(&DetailValue::Text("451 try again later".into()))
        );

        let blocked = validator(StubMx::new(), Arc::new(StubProbe::failing("port 25 blocked")))
            .is_valid_email("x@rucklife.example", true)
            .await;
        assert!(!blocked.is_valid);
        assert!(blocked.reason.unwrap().starts_with("Error: "));
    }
}
