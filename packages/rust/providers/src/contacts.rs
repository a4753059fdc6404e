//! Contact lookup capability and the Apollo adapter.

use std::time::Duration;

use async_trait::async_trait;
use outreach_shared::{OutreachError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::http::{build_client, ensure_success, network_error, read_json};

/// Finds an address to pitch for a website.
#[async_trait]
pub trait ContactFinder: Send + Sync {
    async fn find_contact_email(&self, site_url: &str) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// Apollo
// ---------------------------------------------------------------------------

/// Title keywords in order of preference.
const ROLE_PREFERENCES: &[&[&str]] = &[
    &["founder", "owner"],
    &["editor", "blog", "content", "writer"],
    &["marketing", "communications", "public relations"],
    &["seo", "growth"],
    &["manager", "director", "head", "lead"],
];

/// Apollo people search, scoped to the prospect's domain.
pub struct ApolloContacts {
    api_key: String,
    base_url: String,
    client: Client,
}

impl ApolloContacts {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct PeopleSearch<'a> {
    q_organization_domains_list: Vec<&'a str>,
    contact_email_status: Vec<&'static str>,
    page: u32,
    per_page: u32,
}

#[derive(Debug, Deserialize)]
struct PeopleResponse {
    #[serde(default)]
    people: Vec<Person>,
}

#[derive(Debug, Deserialize)]
struct Person {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl Person {
    fn usable_email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| e.contains('@') && !e.starts_with("email_not_unlocked"))
    }
}

/// Bare registrable host for `site_url`, without a leading `www.`.
fn site_domain(site_url: &str) -> Result<String> {
    let url = Url::parse(site_url)
        .map_err(|e| OutreachError::validation(format!("invalid site URL {site_url}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| OutreachError::validation(format!("URL has no host: {site_url}")))?;
    Ok(host.trim_start_matches("www.").to_ascii_lowercase())
}

/// Choose the best contact: preferred roles first, then anyone with an email.
fn pick_contact(people: &[Person]) -> Option<String> {
    for keywords in ROLE_PREFERENCES {
        let hit = people.iter().find(|p| {
            p.usable_email().is_some()
                && p.title
                    .as_deref()
                    .map(|t| t.to_lowercase())
                    .is_some_and(|t| keywords.iter().any(|k| t.contains(k)))
        });
        if let Some(person) = hit {
            return person.usable_email().map(str::to_string);
        }
    }
    people
        .iter()
        .find_map(Person::usable_email)
        .map(str::to_string)
}

#[async_trait]
impl ContactFinder for ApolloContacts {
    #[instrument(skip_all, fields(site = %site_url))]
    async fn find_contact_email(&self, site_url: &str) -> Result<Option<String>> {
        let domain = site_domain(site_url)?;
        let endpoint = format!("{}/api/v1/mixed_people/search", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .header("X-Api-Key", &self.api_key)
            .json(&PeopleSearch {
                q_organization_domains_list: vec![&domain],
                contact_email_status: vec!["verified"],
                page: 1,
                per_page: 10,
            })
            .send()
            .await
            .map_err(|e| network_error(&endpoint, e))?;

        let response = ensure_success(&endpoint, response).await?;
        let parsed: PeopleResponse = read_json(&endpoint, response).await?;

        let contact = pick_contact(&parsed.people);
        debug!(people = parsed.people.len(), found = contact.is_some(), "contact lookup complete");
        Ok(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn person(title: &str, email: Option<&str>) -> Person {
        Person {
            title: Some(title.into()),
            email: email.map(str::to_string),
        }
    }

    #[test]
    fn domain_strips_www_and_path() {
        assert_eq!(site_domain("https://www.RuckLife.example/post").unwrap(), "rucklife.example");
        assert!(site_domain("not a url").is_err());
    }

    #[test]
    fn prefers_founder_then_editor() {
        let people = vec![
            person("Software Engineer", Some("dev@x.example")),
            person("Managing Editor", Some("editor@x.example")),
            person("Co-Founder", Some("founder@x.example")),
        ];
        assert_eq!(pick_contact(&people).as_deref(), Some("founder@x.example"));

        let people = vec![
            person("Software Engineer", Some("dev@x.example")),
            person("Managing Editor", Some("editor@x.example")),
        ];
        assert_eq!(pick_contact(&people).as_deref(), Some("editor@x.example"));
    }

    #[test]
    fn skips_locked_or_missing_emails() {
        let people = vec![
            person("Founder", Some("email_not_unlocked@domain.com")),
            person("Founder", None),
            person("Intern", Some("intern@x.example")),
        ];
        assert_eq!(pick_contact(&people).as_deref(), Some("intern@x.example"));
        assert_eq!(pick_contact(&[]), None);
    }

    #[tokio::test]
    async fn searches_by_domain() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/mixed_people/search"))
            .and(header("X-Api-Key", "ap-key"))
            .and(body_partial_json(serde_json::json!({
                "q_organization_domains_list": ["rucklife.example"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "people": [{"name": "Sam", "title": "Editor in Chief", "email": "sam@rucklife.example"}]
            })))
            .mount(&server)
            .await;

        let apollo = ApolloContacts::new("ap-key", server.uri(), Duration::from_secs(5)).unwrap();
        let email = apollo
            .find_contact_email("https://www.rucklife.example")
            .await
            .unwrap();
        assert_eq!(email.as_deref(), Some("sam@rucklife.example"));
    }

    #[tokio::test]
    async fn empty_people_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"people": []})))
            .mount(&server)
            .await;

        let apollo = ApolloContacts::new("ap-key", server.uri(), Duration::from_secs(5)).unwrap();
        assert_eq!(apollo.find_contact_email("https://quiet.example").await.unwrap(), None);
    }
}
