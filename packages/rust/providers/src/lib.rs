//! External capabilities used by the outreach pipeline.
//!
//! Each capability is an async trait so the core components can be driven by
//! real HTTP adapters in production and by in-memory fakes in tests:
//! - [`SearchProvider`]: web search ([`SerperSearch`])
//! - [`GenerativeTextProvider`]: LLM text and JSON ([`GeminiText`])
//! - [`SiteContentFetcher`]: a site's recent post
//! - [`EmailDeliveryProvider`]: sending mail ([`SendGridDelivery`], [`DryRunDelivery`])
//! - [`ContactFinder`]: who to pitch at a site ([`ApolloContacts`])

mod contacts;
mod content;
mod delivery;
mod http;
mod llm;
mod search;

pub use contacts::{ApolloContacts, ContactFinder};
pub use content::SiteContentFetcher;
pub use delivery::{
    DeliveryReceipt, DryRunDelivery, EmailDeliveryProvider, OutgoingEmail, SendGridDelivery,
};
pub use http::{USER_AGENT, build_client};
pub use llm::{GeminiText, GenerativeTextProvider, TextRequest};
pub use search::{SearchProvider, SerperSearch};
