//! Thin dispatch wrapper around an [`EmailDeliveryProvider`].

use std::sync::Arc;

use outreach_providers::{EmailDeliveryProvider, OutgoingEmail};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Whether a send went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Error,
}

/// Result of one send attempt. Errors are recorded here, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub status: SendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SendOutcome {
    fn success() -> Self {
        Self {
            status: SendStatus::Success,
            reason: None,
        }
    }

    fn error(reason: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Error,
            reason: Some(reason.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }
}

pub struct EmailSender {
    delivery: Arc<dyn EmailDeliveryProvider>,
}

impl EmailSender {
    pub fn new(delivery: Arc<dyn EmailDeliveryProvider>) -> Self {
        Self { delivery }
    }

    /// Send one plain-text email; the HTML part is derived from `body`.
    #[instrument(skip_all, fields(to = %recipient_email, provider = self.delivery.name()))]
    pub async fn send_email(&self, recipient_email: &str, subject: &str, body: &str) -> SendOutcome {
        let recipient_email = recipient_email.trim();
        if !recipient_email.contains('@') {
            return SendOutcome::error(format!("invalid recipient: {recipient_email:?}"));
        }

        let email = OutgoingEmail {
            to: recipient_email.to_string(),
            subject: subject.to_string(),
            html_body: text_to_html(body),
            text_body: Some(body.to_string()),
            cc: Vec::new(),
            bcc: Vec::new(),
        };

        match self.delivery.deliver(&email).await {
            Ok(receipt) if receipt.success => {
                info!(status = receipt.status_code, message = %receipt.message, "email sent");
                SendOutcome::success()
            }
            Ok(receipt) => {
                warn!(status = receipt.status_code, message = %receipt.message, "email rejected");
                SendOutcome::error(format!("HTTP {}: {}", receipt.status_code, receipt.message))
            }
            Err(e) => {
                warn!(error = %e, "email send failed");
                SendOutcome::error(e.to_string())
            }
        }
    }
}

/// Paragraphs become `<p>`, single newlines `<br>`, text is escaped.
pub fn text_to_html(text: &str) -> String {
    text.trim()
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let lines: Vec<String> = p.lines().map(escape_html).collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeDelivery;

    #[test]
    fn html_paragraphs_and_breaks() {
        let html = text_to_html("Hi there,\n\nBest,\n\nJordan\nRuck & Co | <blog>");
        assert_eq!(
            html,
            "<p>Hi there,</p>\n<p>Best,</p>\n<p>Jordan<br>Ruck &amp; Co | &lt;blog&gt;</p>"
        );
    }

    #[test]
    fn outcome_serializes_lowercase() {
        let json = serde_json::to_value(SendOutcome::error("down")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "reason": "down"}));
        let json = serde_json::to_value(SendOutcome::success()).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success"}));
    }

    #[tokio::test]
    async fn successful_send() {
        let delivery = Arc::new(FakeDelivery::new());
        let sender = EmailSender::new(delivery.clone());

        let outcome = sender.send_email("ed@site.example", "Hello", "Body\ntext").await;
        assert!(outcome.is_success());

        let sent = delivery.sent.lock().unwrap().clone();
        assert_eq!(sent[0].html_body, "<p>Body<br>text</p>");
        assert_eq!(sent[0].text_body.as_deref(), Some("Body\ntext"));
    }

    #[tokio::test]
    async fn provider_failure_becomes_error_outcome() {
        let delivery = Arc::new(FakeDelivery::new().rejecting("ed@site.example"));
        let sender = EmailSender::new(delivery);

        let outcome = sender.send_email("ed@site.example", "Hello", "Body").await;
        assert_eq!(outcome.status, SendStatus::Error);
        assert!(outcome.reason.unwrap().contains("SendGrid error"));
    }

    #[tokio::test]
    async fn malformed_recipient_skips_provider() {
        let delivery = Arc::new(FakeDelivery::new());
        let sender = EmailSender::new(delivery.clone());

        let outcome = sender.send_email("nobody", "Hello", "Body").await;
        assert_eq!(outcome.status, SendStatus::Error);
        assert_eq!(delivery.sent_count(), 0);
    }
}
