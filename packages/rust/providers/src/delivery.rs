//! Email delivery capability, the SendGrid adapter, and a dry-run recorder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outreach_shared::{OutreachError, Result};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

use crate::http::{build_client, excerpt, network_error};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A fully rendered message handed to a delivery provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: Option<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// What the provider reported for one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub success: bool,
    pub status_code: u16,
    /// Provider message id on success, error description otherwise.
    pub message: String,
}

/// Sends email through some transport.
#[async_trait]
pub trait EmailDeliveryProvider: Send + Sync {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// SendGrid
// ---------------------------------------------------------------------------

/// Sends email via the SendGrid v3 HTTP API.
pub struct SendGridDelivery {
    api_key: String,
    from_email: String,
    from_name: String,
    base_url: String,
    client: Client,
}

impl SendGridDelivery {
    pub fn new(
        api_key: impl Into<String>,
        from_email: impl Into<String>,
        from_name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            from_email: from_email.into(),
            from_name: from_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Body>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<EmailAddress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl EmailAddress {
    fn bare(email: &str) -> Self {
        Self {
            email: email.to_string(),
            name: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct Body {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

impl SendGridDelivery {
    fn request_for(&self, email: &OutgoingEmail) -> SendGridRequest {
        // SendGrid requires text/plain before text/html
        let mut content = Vec::with_capacity(2);
        if let Some(text) = &email.text_body {
            content.push(Body {
                content_type: "text/plain",
                value: text.clone(),
            });
        }
        content.push(Body {
            content_type: "text/html",
            value: email.html_body.clone(),
        });

        SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![EmailAddress::bare(&email.to)],
                cc: email.cc.iter().map(|a| EmailAddress::bare(a)).collect(),
                bcc: email.bcc.iter().map(|a| EmailAddress::bare(a)).collect(),
            }],
            from: EmailAddress {
                email: self.from_email.clone(),
                name: Some(self.from_name.clone()),
            },
            subject: email.subject.clone(),
            content,
        }
    }
}

#[async_trait]
impl EmailDeliveryProvider for SendGridDelivery {
    #[instrument(skip_all, fields(to = %email.to))]
    async fn deliver(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt> {
        let endpoint = format!("{}/v3/mail/send", self.base_url);

        debug!(subject = %email.subject, "sending email via SendGrid");

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_for(email))
            .send()
            .await
            .map_err(|e| network_error(&endpoint, e))?;

        let status = response.status();

        if status.is_success() {
            let message_id = response
                .headers()
                .get("X-Message-Id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("accepted")
                .to_string();

            debug!(%message_id, "email accepted");
            return Ok(DeliveryReceipt {
                success: true,
                status_code: status.as_u16(),
                message: message_id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        error!(%status, error = %excerpt(&body), "SendGrid API error");

        let message = match status.as_u16() {
            429 => "rate limit exceeded".to_string(),
            400 => format!("invalid request: {}", excerpt(&body)),
            401 | 403 => "authentication failed".to_string(),
            _ => format!("SendGrid error ({status}): {}", excerpt(&body)),
        };
        Err(OutreachError::Provider(message))
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

/// Records messages instead of sending them.
#[derive(Clone, Default)]
pub struct DryRunDelivery {
    outbox: Arc<Mutex<Vec<OutgoingEmail>>>,
}

impl DryRunDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message "delivered" so far, in order.
    pub async fn outbox(&self) -> Vec<OutgoingEmail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl EmailDeliveryProvider for DryRunDelivery {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt> {
        self.outbox.lock().await.push(email.clone());
        Ok(DeliveryReceipt {
            success: true,
            status_code: 202,
            message: "dry-run".into(),
        })
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: "editor@rucklife.example".into(),
            subject: "Collaboration opportunity with Jordan".into(),
            html_body: "<p>Hi there,</p>".into(),
            text_body: Some("Hi there,".into()),
            cc: vec![],
            bcc: vec!["archive@ruckreport.example".into()],
        }
    }

    fn sendgrid(server: &MockServer) -> SendGridDelivery {
        SendGridDelivery::new(
            "sg-key",
            "jordan@ruckreport.example",
            "Jordan",
            server.uri(),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[test]
    fn request_orders_plain_before_html_and_skips_empty_cc() {
        let server_less = SendGridDelivery {
            api_key: String::new(),
            from_email: "a@b.co".into(),
            from_name: "A".into(),
            base_url: String::new(),
            client: Client::new(),
        };
        let json = serde_json::to_value(server_less.request_for(&email())).unwrap();
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][1]["type"], "text/html");
        assert!(json["personalizations"][0].get("cc").is_none());
        assert_eq!(
            json["personalizations"][0]["bcc"][0]["email"],
            "archive@ruckreport.example"
        );
    }

    #[tokio::test]
    async fn accepted_message_returns_receipt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("Authorization", "Bearer sg-key"))
            .and(body_partial_json(serde_json::json!({
                "from": {"email": "jordan@ruckreport.example", "name": "Jordan"},
                "subject": "Collaboration opportunity with Jordan"
            })))
            .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "msg-123"))
            .mount(&server)
            .await;

        let receipt = sendgrid(&server).deliver(&email()).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.status_code, 202);
        assert_eq!(receipt.message, "msg-123");
    }

    #[tokio::test]
    async fn error_statuses_are_described() {
        for (status, needle) in [
            (401, "authentication failed"),
            (429, "rate limit"),
            (400, "invalid request"),
            (503, "SendGrid error"),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v3/mail/send"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;

            let err = sendgrid(&server).deliver(&email()).await.unwrap_err();
            assert!(
                err.to_string().contains(needle),
                "status {status}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn dry_run_records_messages() {
        let dry = DryRunDelivery::new();
        let receipt = dry.deliver(&email()).await.unwrap();
        assert!(receipt.success);
        assert_eq!(dry.outbox().await.len(), 1);
        assert_eq!(dry.name(), "dry-run");
    }
}
