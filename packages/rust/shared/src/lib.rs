//! Shared types, error model, and configuration for the outreach pipeline.
//!
//! This crate is the foundation depended on by all other outreach crates.
//! It provides:
//! - [`OutreachError`]: the unified error type
//! - Domain types ([`Prospect`], [`EmailDraft`], [`ValidationResult`], [`CampaignResult`])
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CampaignConfig, Credentials, NetworkConfig, ProvidersConfig, SenderConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, require_env,
};
pub use error::{OutreachError, Result};
pub use types::{
    CampaignId, CampaignResult, CampaignStatus, CategoryQuery, DetailValue, EmailDraft, Prospect,
    ProspectOutcome, ProspectState, Provenance, SearchHit, SenderProfile, Topic,
    ValidationResult, detail_keys,
};
