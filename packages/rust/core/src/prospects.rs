//! Topic → deduplicated prospect sites.
//!
//! 1. Distill the topic to a core phrase (falls back to the title's first words).
//! 2. Brainstorm website categories, then structure them into one search
//!    query each. A `"<core> Blog Sites"` query is always searched first.
//! 3. Search every query and keep the first hit per `scheme://host`.
//!
//! Every provider failure degrades to less output. Only an empty topic or a
//! fatal (configuration) error aborts a run.

use std::collections::HashSet;
use std::sync::Arc;

use outreach_providers::{GenerativeTextProvider, SearchProvider, TextRequest};
use outreach_shared::{
    CampaignConfig, CategoryQuery, OutreachError, Prospect, Provenance, Result, SearchHit, Topic,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Labels models sometimes put in front of the phrase.
const CORE_PHRASE_PREFIXES: &[&str] = &[
    "the core phrase is",
    "the core phrase:",
    "core phrase:",
    "core phrase",
];

/// Hosts that are never outreach targets.
const EXCLUDED_PLATFORMS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "reddit.com",
    "facebook.com",
    "fb.com",
    "instagram.com",
    "tiktok.com",
    "twitter.com",
    "x.com",
    "wikipedia.org",
    "amazon.com",
    "pinterest.com",
    "linkedin.com",
    "quora.com",
    "medium.com",
];

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

/// Tunables for one generator.
#[derive(Debug, Clone)]
pub struct ProspectOptions {
    /// Results requested per search query.
    pub results_per_query: u32,
    /// Title words used when no core phrase can be extracted.
    pub fallback_words: usize,
    /// Ask the model whether each hit is a plausible target.
    pub relevance_filter: bool,
}

impl Default for ProspectOptions {
    fn default() -> Self {
        Self::from(&CampaignConfig::default())
    }
}

impl From<&CampaignConfig> for ProspectOptions {
    fn from(config: &CampaignConfig) -> Self {
        Self {
            results_per_query: config.results_per_query,
            fallback_words: config.core_phrase_fallback_words.max(1),
            relevance_filter: config.relevance_filter,
        }
    }
}

/// Everything one generation run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ProspectReport {
    pub core_phrase: String,
    pub queries: Vec<CategoryQuery>,
    pub prospects: Vec<Prospect>,
}

// ---------------------------------------------------------------------------
// ProspectGenerator
// ---------------------------------------------------------------------------

pub struct ProspectGenerator {
    llm: Arc<dyn GenerativeTextProvider>,
    search: Arc<dyn SearchProvider>,
    options: ProspectOptions,
}

impl ProspectGenerator {
    pub fn new(
        llm: Arc<dyn GenerativeTextProvider>,
        search: Arc<dyn SearchProvider>,
        options: ProspectOptions,
    ) -> Self {
        Self {
            llm,
            search,
            options,
        }
    }

    /// Deduplicated prospects for `topic`, in first-seen order.
    pub async fn generate_prospects(&self, topic: &Topic) -> Result<Vec<Prospect>> {
        Ok(self.generate_report(topic).await?.prospects)
    }

    /// Like [`generate_prospects`](Self::generate_prospects), plus the
    /// intermediate core phrase and queries.
    #[instrument(skip_all, fields(title = %topic.title))]
    pub async fn generate_report(&self, topic: &Topic) -> Result<ProspectReport> {
        if topic.title.trim().is_empty() {
            return Err(OutreachError::validation("topic title is empty"));
        }

        let core_phrase = self.core_phrase(topic).await?;
        info!(%core_phrase, "core phrase");

        let queries = self.category_queries(topic, &core_phrase).await?;
        info!(queries = queries.len(), "search queries prepared");

        let mut seen: HashSet<String> = HashSet::new();
        let mut prospects = Vec::new();

        for query in &queries {
            let hits = match self
                .search
                .search(&query.search_term, self.options.results_per_query)
                .await
            {
                Ok(hits) => hits,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(term = %query.search_term, error = %e, "search failed, skipping term");
                    continue;
                }
            };

            let before = prospects.len();
            for hit in hits {
                let Some(origin) = normalize_origin(&hit.link) else {
                    debug!(link = %hit.link, "skipping unparseable link");
                    continue;
                };
                if is_excluded_platform(&origin) || !seen.insert(origin.clone()) {
                    continue;
                }
                // First sighting decides; a rejected host is not asked about again
                if self.options.relevance_filter
                    && !self.is_relevant(&origin, &hit, query, &core_phrase).await
                {
                    debug!(%origin, "dropped as irrelevant");
                    continue;
                }

                prospects.push(Prospect {
                    url: origin,
                    title: hit.title,
                    snippet: hit.snippet,
                    provenance: Provenance::from(query),
                });
            }
            debug!(term = %query.search_term, added = prospects.len() - before, "term searched");
        }

        info!(prospects = prospects.len(), "prospect generation complete");
        Ok(ProspectReport {
            core_phrase,
            queries,
            prospects,
        })
    }

    /// One short phrase that captures the topic.
    async fn core_phrase(&self, topic: &Topic) -> Result<String> {
        let prompt = format!(
            "Blog Title: {}\nBlog Description: {}\n\n\
             Distill the above blog content to a single core phrase or word that best represents \
             what this blog is about. For example, if it's about rucking, just return \"rucking\". \
             If it's about Phase I Environmental Site Assessments, return \
             \"Phase I Environmental Site Assessments\".\n\n\
             IMPORTANT: Return ONLY the core phrase with no additional text, labels, or formatting.",
            topic.title, topic.description
        );

        let phrase = match self.llm.complete(&TextRequest::creative(prompt)).await {
            Ok(text) => clean_core_phrase(&text),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "core phrase extraction failed");
                String::new()
            }
        };
        if phrase.is_empty() {
            warn!("no core phrase, using title");
            return Ok(fallback_phrase(&topic.title, self.options.fallback_words));
        }
        Ok(phrase)
    }

    /// Category search queries, always led by the core blog query.
    async fn category_queries(
        &self,
        topic: &Topic,
        core_phrase: &str,
    ) -> Result<Vec<CategoryQuery>> {
        let mut queries = vec![CategoryQuery {
            category: format!("{core_phrase} Blog Sites"),
            search_term: format!("{core_phrase} blogs"),
        }];

        let categories = match self
            .llm
            .complete(&TextRequest::creative(categories_prompt(topic, core_phrase)))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => return Ok(queries),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "category generation failed");
                return Ok(queries);
            }
        };

        let structured = match self
            .llm
            .complete_json(
                &TextRequest::precise(structure_prompt(&categories, core_phrase)),
                &category_schema(),
            )
            .await
            .and_then(|value| {
                serde_json::from_value::<Vec<CategoryQuery>>(value)
                    .map_err(|e| OutreachError::parse(format!("category list: {e}")))
            }) {
            Ok(list) => list,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "category structuring failed");
                return Ok(queries);
            }
        };

        let mut terms: HashSet<String> = HashSet::from([queries[0].search_term.to_lowercase()]);
        for query in structured {
            let term = query.search_term.trim();
            if term.is_empty() || !terms.insert(term.to_lowercase()) {
                continue;
            }
            queries.push(CategoryQuery {
                category: query.category.trim().to_string(),
                search_term: term.to_string(),
            });
        }
        Ok(queries)
    }

    /// Yes/no relevance check; anything but a clear "no" keeps the hit.
    async fn is_relevant(
        &self,
        origin: &str,
        hit: &SearchHit,
        query: &CategoryQuery,
        core_phrase: &str,
    ) -> bool {
        if hit.title.trim().is_empty() && hit.snippet.trim().is_empty() {
            return true;
        }

        let prompt = format!(
            "Website URL: {origin}\nWebsite Title: {}\nWebsite Description: {}\n\
             Category: {}\nCore Topic: {core_phrase}\n\n\
             Based on the information above, is this website a good candidate for reaching out \
             about a guest post related to {core_phrase}?\n\n\
             Consider:\n\
             1. Is it likely that this website has a blog or content section?\n\
             2. Is it relevant to the category \"{}\" and at least somewhat semantically relevant \
             to \"{core_phrase}\"?\n\n\
             Answer with just \"yes\" or \"no\".",
            hit.title, hit.snippet, query.category, query.category
        );

        match self.llm.complete(&TextRequest::precise(prompt)).await {
            Ok(answer) => parse_yes_no(&answer).unwrap_or(true),
            Err(e) => {
                debug!(%origin, error = %e, "relevance check failed, keeping");
                true
            }
        }
    }
}

fn categories_prompt(topic: &Topic, core_phrase: &str) -> String {
    format!(
        "Blog Title: {}\nBlog Description: {}\n\n\
         Given the above blog about {core_phrase}, what are some types of websites that it could \
         reach out to for backlinks?\n\n\
         For example, if this is a blog about gardening, potential website categories might include:\n\
         - Gardening blog sites (always include the exact niche of the blog)\n\
         - Gardening supply stores\n\
         - Plant identification resources\n\
         - Sustainable living websites\n\
         - Home improvement blogs\n\n\
         Return a bulleted list of categories only.",
        topic.title, topic.description
    )
}

fn structure_prompt(categories: &str, core_phrase: &str) -> String {
    format!(
        "Core Topic: {core_phrase}\nWebsite Categories:\n{categories}\n\n\
         For each of the above website categories, create a structured object with:\n\
         1. The category name\n\
         2. One specific search query that would help find websites in that category \
         (e.g. \"gardening supplies websites\" or \"large news sites\")\n\n\
         The search query should be specific enough to find relevant websites but general enough \
         to return a good number of results. If a specific category should be broken into \
         multiple categories, do that. The categories should only be for websites that have a blog."
    )
}

/// Response schema for the structured category call.
fn category_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "category": {"type": "STRING"},
                "search_term": {"type": "STRING"}
            },
            "required": ["category", "search_term"]
        }
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip labels, quotes, and trailing punctuation from a model's phrase.
pub fn clean_core_phrase(raw: &str) -> String {
    let mut phrase = raw.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();

    for prefix in CORE_PHRASE_PREFIXES {
        if phrase.len() >= prefix.len()
            && phrase.is_char_boundary(prefix.len())
            && phrase[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            phrase = phrase[prefix.len()..].trim();
        }
    }

    phrase
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '.'))
        .trim()
        .to_string()
}

/// The first `words` words of `title`.
pub fn fallback_phrase(title: &str, words: usize) -> String {
    title.split_whitespace().take(words).collect::<Vec<_>>().join(" ")
}

/// `scheme://host[:port]` for an absolute http(s) link.
pub fn normalize_origin(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}

/// Whether an origin belongs to a major platform rather than an independent site.
pub fn is_excluded_platform(origin: &str) -> bool {
    let host = origin
        .split("://")
        .nth(1)
        .unwrap_or(origin)
        .split(':')
        .next()
        .unwrap_or_default();

    if host.starts_with("amazon.") || host.contains(".amazon.") {
        return true;
    }
    EXCLUDED_PLATFORMS
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{p}")))
}

/// `Some(true)` for yes, `Some(false)` for no, `None` when unclear.
fn parse_yes_no(answer: &str) -> Option<bool> {
    let lower = answer.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();
    if words.contains(&"yes") {
        Some(true)
    } else if words.contains(&"no") {
        Some(false)
    } else {
        None
    }
}
