//! SMTP mailbox probe.
//!
//! Opens a plain connection to port 25, upgrades with STARTTLS when the
//! server offers it, then issues `MAIL FROM` / `RCPT TO` without sending
//! data. Many servers accept every recipient or refuse probes outright, so
//! the outcome is a hint rather than proof of deliverability.

use std::time::Duration;

use async_trait::async_trait;
use lettre::Address;
use lettre::transport::smtp::client::{SmtpConnection, TlsParameters};
use lettre::transport::smtp::commands::{Mail, Rcpt};
use lettre::transport::smtp::extension::ClientId;
use outreach_shared::{OutreachError, Result};
use tracing::{debug, warn};

const SMTP_PORT: u16 = 25;

/// What the mail server said about a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpOutcome {
    /// `RCPT TO` answered 250.
    Exists,
    /// `RCPT TO` answered 550.
    DoesNotExist,
    /// Anything else: other codes, refused connections, timeouts.
    Inconclusive(String),
}

/// Asks a mail server whether it accepts a recipient.
#[async_trait]
pub trait SmtpProbe: Send + Sync {
    async fn probe(&self, mx_host: &str, sender: &str, recipient: &str) -> Result<SmtpOutcome>;
}

/// Probe built on lettre's blocking SMTP connection.
pub struct LettreProbe {
    timeout: Duration,
}

impl LettreProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SmtpProbe for LettreProbe {
    async fn probe(&self, mx_host: &str, sender: &str, recipient: &str) -> Result<SmtpOutcome> {
        let sender: Address = sender
            .parse()
            .map_err(|e| OutreachError::config(format!("invalid probe sender {sender}: {e}")))?;
        let recipient: Address = recipient
            .parse()
            .map_err(|e| OutreachError::validation(format!("invalid recipient {recipient}: {e}")))?;

        let host = mx_host.to_string();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || probe_blocking(&host, timeout, &sender, &recipient))
            .await
            .map_err(|e| OutreachError::Provider(format!("SMTP probe task failed: {e}")))
    }
}

fn probe_blocking(
    mx_host: &str,
    timeout: Duration,
    sender: &Address,
    recipient: &Address,
) -> SmtpOutcome {
    let helo = ClientId::Domain(sender.domain().to_string());

    let mut conn = match SmtpConnection::connect(
        (mx_host, SMTP_PORT),
        Some(timeout),
        &helo,
        None,
        None,
    ) {
        Ok(conn) => conn,
        Err(e) => {
            warn!(%mx_host, error = %e, "SMTP connection failed");
            return SmtpOutcome::Inconclusive(format!("connection to {mx_host} failed: {e}"));
        }
    };

    if conn.can_starttls() {
        match TlsParameters::new(mx_host.to_string()) {
            Ok(tls) => {
                if let Err(e) = conn.starttls(&tls, &helo) {
                    debug!(%mx_host, error = %e, "STARTTLS failed");
                    return SmtpOutcome::Inconclusive(format!("STARTTLS failed: {e}"));
                }
            }
            Err(e) => debug!(%mx_host, error = %e, "TLS parameters unavailable, staying plaintext"),
        }
    }

    if let Err(e) = conn.command(Mail::new(Some(sender.clone()), vec![])) {
        conn.quit().ok();
        return SmtpOutcome::Inconclusive(format!("MAIL FROM rejected: {e}"));
    }

    let outcome = match conn.command(Rcpt::new(recipient.clone(), vec![])) {
        Ok(response) => {
            let message = response.message().collect::<Vec<_>>().join(" ");
            classify(&response.code().to_string(), &message)
        }
        Err(e) => match e.status() {
            Some(code) => classify(&code.to_string(), &e.to_string()),
            None => SmtpOutcome::Inconclusive(e.to_string()),
        },
    };

    conn.quit().ok();
    debug!(%mx_host, ?outcome, "SMTP probe complete");
    outcome
}

/// Map an SMTP reply code to an outcome.
fn classify(code: &str, message: &str) -> SmtpOutcome {
    match code {
        "250" => SmtpOutcome::Exists,
        "550" => SmtpOutcome::DoesNotExist,
        _ => SmtpOutcome::Inconclusive(format!("{code} {message}").trim().to_string()),
    }
}
