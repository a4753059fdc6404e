//! Shared HTTP client setup for provider adapters.

use std::time::Duration;

use outreach_shared::{OutreachError, Result};
use reqwest::{Client, Response};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// User-Agent string for all outbound requests.
pub const USER_AGENT: &str = concat!("Outreach/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed back into an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Build a reqwest client with the standard settings.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(timeout)
        .build()
        .map_err(|e| OutreachError::Provider(format!("failed to build HTTP client: {e}")))
}

/// Map a transport failure to a provider error tagged with the endpoint.
pub(crate) fn network_error(endpoint: &str, err: reqwest::Error) -> OutreachError {
    if err.is_timeout() {
        OutreachError::Provider(format!("{endpoint}: request timed out"))
    } else {
        OutreachError::Provider(format!("{endpoint}: {err}"))
    }
}

/// Turn a non-2xx response into a provider error carrying a body excerpt.
pub(crate) async fn ensure_success(endpoint: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(OutreachError::Provider(format!(
        "{endpoint}: HTTP {status}: {}",
        excerpt(&body)
    )))
}

/// Read a JSON body, mapping decode failures to parse errors.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| OutreachError::Provider(format!("{endpoint}: failed to read body: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| OutreachError::parse(format!("{endpoint}: invalid JSON: {e}")))
}

pub(crate) fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_long_bodies() {
        let long = "x".repeat(1000);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.len(), MAX_ERROR_BODY_CHARS + 3);
        assert_eq!(excerpt("  short  "), "short");
    }

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("Outreach/"));
    }
}
