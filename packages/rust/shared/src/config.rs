//! Application configuration for the outreach pipeline.
//!
//! User config lives at `~/.outreach/outreach.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file, only the names of the env vars
//! that hold them.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OutreachError, Result};
use crate::types::SenderProfile;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "outreach.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".outreach";

static FROM_EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("from email regex")
});

// ---------------------------------------------------------------------------
// Config structs (matching outreach.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Campaign behaviour.
    #[serde(default)]
    pub campaign: CampaignConfig,

    /// Who the outreach is sent from.
    #[serde(default)]
    pub sender: SenderConfig,

    /// External provider settings.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Timeouts and probe settings.
    #[serde(default)]
    pub network: NetworkConfig,
}

/// `[campaign]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Maximum number of prospects contacted per run.
    #[serde(default = "default_max_emails")]
    pub max_emails: usize,

    /// Results requested from the search provider per query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: u32,

    /// Validate each recipient before drafting.
    #[serde(default = "default_true")]
    pub validate_recipients: bool,

    /// Include the SMTP mailbox probe during validation.
    #[serde(default)]
    pub check_smtp: bool,

    /// Words of the title used when core-phrase extraction fails.
    #[serde(default = "default_fallback_words")]
    pub core_phrase_fallback_words: usize,

    /// Ask the model whether each search hit is relevant.
    #[serde(default)]
    pub relevance_filter: bool,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            max_emails: default_max_emails(),
            results_per_query: default_results_per_query(),
            validate_recipients: true,
            check_smtp: false,
            core_phrase_fallback_words: default_fallback_words(),
            relevance_filter: false,
        }
    }
}

fn default_max_emails() -> usize {
    5
}
fn default_results_per_query() -> u32 {
    100
}
fn default_fallback_words() -> usize {
    5
}
fn default_true() -> bool {
    true
}

/// `[sender]` section: the sender profile plus the From address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderConfig {
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub blog_name: String,
    #[serde(default)]
    pub blog_url: String,
    #[serde(default)]
    pub leverage_statement: String,
    /// Address outgoing mail is sent from.
    #[serde(default)]
    pub from_email: String,
}

impl SenderConfig {
    /// The immutable profile handed to the template maker.
    pub fn profile(&self) -> SenderProfile {
        SenderProfile {
            sender_name: self.sender_name.clone(),
            blog_name: self.blog_name.clone(),
            blog_url: self.blog_url.clone(),
            leverage_statement: self.leverage_statement.clone(),
        }
    }
}

/// `[providers]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Name of the env var holding the Serper API key.
    #[serde(default = "default_serper_env")]
    pub serper_api_key_env: String,

    /// Name of the env var holding the Gemini API key.
    #[serde(default = "default_gemini_env")]
    pub gemini_api_key_env: String,

    /// Name of the env var holding the SendGrid API key.
    #[serde(default = "default_sendgrid_env")]
    pub sendgrid_api_key_env: String,

    /// Name of the env var holding the Apollo API key.
    #[serde(default = "default_apollo_env")]
    pub apollo_api_key_env: String,

    /// Gemini model id.
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_serper_base_url")]
    pub serper_base_url: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    #[serde(default = "default_sendgrid_base_url")]
    pub sendgrid_base_url: String,

    #[serde(default = "default_apollo_base_url")]
    pub apollo_base_url: String,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            serper_api_key_env: default_serper_env(),
            gemini_api_key_env: default_gemini_env(),
            sendgrid_api_key_env: default_sendgrid_env(),
            apollo_api_key_env: default_apollo_env(),
            gemini_model: default_gemini_model(),
            serper_base_url: default_serper_base_url(),
            gemini_base_url: default_gemini_base_url(),
            sendgrid_base_url: default_sendgrid_base_url(),
            apollo_base_url: default_apollo_base_url(),
        }
    }
}

fn default_serper_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_gemini_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_sendgrid_env() -> String {
    "SENDGRID_API_KEY".into()
}
fn default_apollo_env() -> String {
    "APOLLO_API_KEY".into()
}
fn default_gemini_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_serper_base_url() -> String {
    "https://google.serper.dev".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_sendgrid_base_url() -> String {
    "https://api.sendgrid.com".into()
}
fn default_apollo_base_url() -> String {
    "https://api.apollo.io".into()
}

/// `[network]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_dns_timeout")]
    pub dns_timeout_secs: u64,

    #[serde(default = "default_smtp_timeout")]
    pub smtp_timeout_secs: u64,

    /// MAIL FROM address used by the SMTP mailbox probe.
    #[serde(default = "default_probe_sender")]
    pub smtp_probe_sender: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            dns_timeout_secs: default_dns_timeout(),
            smtp_timeout_secs: default_smtp_timeout(),
            smtp_probe_sender: default_probe_sender(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}
fn default_dns_timeout() -> u64 {
    10
}
fn default_smtp_timeout() -> u64 {
    10
}
fn default_probe_sender() -> String {
    "verification@example.com".into()
}

impl AppConfig {
    /// Check the parts of the config a campaign cannot run without.
    pub fn validate(&self) -> Result<()> {
        let sender = &self.sender;
        for (field, value) in [
            ("sender.sender_name", &sender.sender_name),
            ("sender.blog_name", &sender.blog_name),
            ("sender.blog_url", &sender.blog_url),
            ("sender.leverage_statement", &sender.leverage_statement),
            ("sender.from_email", &sender.from_email),
        ] {
            if value.trim().is_empty() {
                return Err(OutreachError::config(format!("{field} must be set")));
            }
        }

        match url::Url::parse(&sender.blog_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {}
            _ => {
                return Err(OutreachError::config(format!(
                    "sender.blog_url is not an http(s) URL: {}",
                    sender.blog_url
                )));
            }
        }

        if !FROM_EMAIL_RE.is_match(&sender.from_email) {
            return Err(OutreachError::config(format!(
                "sender.from_email is not a valid address: {}",
                sender.from_email
            )));
        }

        if self.campaign.max_emails == 0 {
            return Err(OutreachError::config("campaign.max_emails must be at least 1"));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// API keys resolved from the environment.
#[derive(Clone)]
pub struct Credentials {
    pub serper_api_key: String,
    pub gemini_api_key: String,
    pub sendgrid_api_key: String,
    pub apollo_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    /// Resolve every provider key, failing on the first missing variable.
    pub fn from_env(config: &AppConfig) -> Result<Self> {
        let p = &config.providers;
        Ok(Self {
            serper_api_key: require_env(&p.serper_api_key_env, "Serper")?,
            gemini_api_key: require_env(&p.gemini_api_key_env, "Gemini")?,
            sendgrid_api_key: require_env(&p.sendgrid_api_key_env, "SendGrid")?,
            apollo_api_key: require_env(&p.apollo_api_key_env, "Apollo")?,
        })
    }
}

/// Read a non-empty env var or return a config error naming it.
pub fn require_env(var_name: &str, provider: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(OutreachError::config(format!(
            "{provider} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.outreach/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OutreachError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.outreach/outreach.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OutreachError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OutreachError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OutreachError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OutreachError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OutreachError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.sender = SenderConfig {
            sender_name: "Jordan".into(),
            blog_name: "Ruck Report".into(),
            blog_url: "https://ruckreport.example".into(),
            leverage_statement: "I write weekly gear reviews".into(),
            from_email: "jordan@ruckreport.example".into(),
        };
        config
    }

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("max_emails"));
        assert!(toml_str.contains("SERPER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.campaign.max_emails, 5);
        assert_eq!(parsed.campaign.results_per_query, 100);
        assert!(parsed.campaign.validate_recipients);
        assert!(!parsed.campaign.check_smtp);
        assert_eq!(parsed.providers.gemini_api_key_env, "GEMINI_API_KEY");
        assert_eq!(parsed.network.smtp_probe_sender, "verification@example.com");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[campaign]
max_emails = 12

[sender]
sender_name = "Jordan"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.campaign.max_emails, 12);
        assert_eq!(config.campaign.core_phrase_fallback_words, 5);
        assert_eq!(config.sender.sender_name, "Jordan");
        assert_eq!(config.network.http_timeout_secs, 30);
    }

    #[test]
    fn validate_accepts_complete_config() {
        complete_config().validate().expect("complete config is valid");
    }

    #[test]
    fn validate_rejects_missing_sender_fields() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("sender.sender_name"));
    }

    #[test]
    fn validate_rejects_bad_blog_url_and_zero_cap() {
        let mut config = complete_config();
        config.sender.blog_url = "ruckreport".into();
        assert!(config.validate().unwrap_err().to_string().contains("blog_url"));

        let mut config = complete_config();
        config.sender.from_email = "not-an-email".into();
        assert!(config.validate().unwrap_err().to_string().contains("from_email"));

        let mut config = complete_config();
        config.campaign.max_emails = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_emails"));
    }

    #[test]
    fn credentials_fail_on_missing_env() {
        let mut config = AppConfig::default();
        // Unique names so parallel tests never see a real key
        config.providers.serper_api_key_env = "OUTREACH_TEST_NONEXISTENT_SERPER_1".into();
        let err = Credentials::from_env(&config).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("OUTREACH_TEST_NONEXISTENT_SERPER_1"));
    }

    #[test]
    fn sender_profile_from_config() {
        let profile = complete_config().sender.profile();
        assert_eq!(profile.blog_name, "Ruck Report");
        assert_eq!(profile.leverage_statement, "I write weekly gear reviews");
    }
}
