//! Core outreach pipeline for Outreach.
//!
//! This crate ties together prospect generation, contact validation, email
//! drafting and delivery into one end-to-end campaign run
//! (`ControlPanel::run_outreach_campaign`).

pub mod campaign;
pub mod prospects;
pub mod sender;
pub mod template;
pub mod validator;

#[cfg(test)]
mod fakes;

pub use campaign::{CampaignProgress, CampaignSettings, ControlPanel, SilentProgress};
pub use prospects::{ProspectGenerator, ProspectOptions, ProspectReport};
pub use sender::{EmailSender, SendOutcome, SendStatus};
pub use template::TemplateMaker;
pub use validator::{DnsMxResolver, EmailValidator, LettreProbe};
