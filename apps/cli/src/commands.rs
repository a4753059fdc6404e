//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use outreach_core::template::subject_for;
use outreach_core::{
    CampaignProgress, CampaignSettings, ControlPanel, DnsMxResolver, EmailSender, EmailValidator,
    LettreProbe, ProspectGenerator, ProspectOptions, TemplateMaker,
};
use outreach_discovery::SitemapFetcher;
use outreach_providers::{
    ApolloContacts, DryRunDelivery, EmailDeliveryProvider, GeminiText, SendGridDelivery,
    SerperSearch,
};
use outreach_shared::{
    AppConfig, CampaignResult, ProspectOutcome, ProspectState, Topic, init_config, load_config,
    load_config_from, require_env,
};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Outreach: find blogs on your topic and pitch them a collaboration.
#[derive(Parser)]
#[command(
    name = "outreach",
    version,
    about = "Find prospect blogs for a topic, draft personalized outreach emails, and send them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.outreach/outreach.toml).
    #[arg(long, global = true, env = "OUTREACH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a full campaign: prospects, contacts, drafts, sends.
    Run {
        /// Title of the blog post being promoted.
        #[arg(long)]
        title: String,

        /// Short description of the post.
        #[arg(long, default_value = "")]
        description: String,

        /// Cap on emails for this run (overrides config).
        #[arg(long)]
        max_emails: Option<usize>,

        /// Draft everything but record instead of sending.
        #[arg(long)]
        dry_run: bool,

        /// Print the campaign result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate prospects for a topic without contacting anyone.
    Prospects {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        json: bool,
    },

    /// Check whether an email address looks deliverable.
    Validate {
        email: String,

        /// Also probe the domain's mail server.
        #[arg(long)]
        smtp: bool,

        #[arg(long)]
        json: bool,
    },

    /// Draft one outreach email for a site.
    Draft {
        /// Site to pitch, e.g. https://example.com
        site_url: String,

        /// Recipient shown in the draft header.
        #[arg(long)]
        to: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "outreach=info",
        1 => "outreach=debug",
        _ => "outreach=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run {
            title,
            description,
            max_emails,
            dry_run,
            json,
        } => {
            let topic = Topic::new(title, description);
            cmd_run(config_path, &topic, max_emails, dry_run, json).await
        }
        Command::Prospects {
            title,
            description,
            json,
        } => cmd_prospects(config_path, &Topic::new(title, description), json).await,
        Command::Validate { email, smtp, json } => {
            cmd_validate(config_path, &email, smtp, json).await
        }
        Command::Draft { site_url, to } => cmd_draft(config_path, &site_url, to.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn load(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

// ---------------------------------------------------------------------------
// Component wiring
// ---------------------------------------------------------------------------

fn gemini(config: &AppConfig) -> Result<Arc<GeminiText>> {
    let p = &config.providers;
    let key = require_env(&p.gemini_api_key_env, "Gemini")?;
    Ok(Arc::new(GeminiText::new(
        key,
        &p.gemini_model,
        &p.gemini_base_url,
        secs(config.network.http_timeout_secs),
    )?))
}

fn prospect_generator(config: &AppConfig, llm: Arc<GeminiText>) -> Result<ProspectGenerator> {
    let p = &config.providers;
    let key = require_env(&p.serper_api_key_env, "Serper")?;
    let search = SerperSearch::new(key, &p.serper_base_url, secs(config.network.http_timeout_secs))?;
    Ok(ProspectGenerator::new(
        llm,
        Arc::new(search),
        ProspectOptions::from(&config.campaign),
    ))
}

fn template_maker(config: &AppConfig, llm: Arc<GeminiText>) -> Result<TemplateMaker> {
    let content = SitemapFetcher::new(secs(config.network.http_timeout_secs))?;
    Ok(TemplateMaker::new(llm, Arc::new(content)))
}

fn email_validator(config: &AppConfig) -> EmailValidator {
    let net = &config.network;
    EmailValidator::new(
        Arc::new(DnsMxResolver::new(secs(net.dns_timeout_secs))),
        Arc::new(LettreProbe::new(secs(net.smtp_timeout_secs))),
        &net.smtp_probe_sender,
    )
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    topic: &Topic,
    max_emails: Option<usize>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut config = load(config_path)?;
    if let Some(n) = max_emails {
        config.campaign.max_emails = n;
    }
    config.validate()?;

    let p = &config.providers;
    let http_timeout = secs(config.network.http_timeout_secs);

    // Resolve every credential before the first network call
    let llm = gemini(&config)?;
    let generator = prospect_generator(&config, llm.clone())?;
    let apollo_key = require_env(&p.apollo_api_key_env, "Apollo")?;
    let contacts = ApolloContacts::new(apollo_key, &p.apollo_base_url, http_timeout)?;

    let dry_run_outbox = DryRunDelivery::new();
    let delivery: Arc<dyn EmailDeliveryProvider> = if dry_run {
        Arc::new(dry_run_outbox.clone())
    } else {
        let key = require_env(&p.sendgrid_api_key_env, "SendGrid")?;
        Arc::new(SendGridDelivery::new(
            key,
            &config.sender.from_email,
            &config.sender.sender_name,
            &p.sendgrid_base_url,
            http_timeout,
        )?)
    };

    let panel = ControlPanel::new(
        generator,
        Arc::new(contacts),
        email_validator(&config),
        template_maker(&config, llm)?,
        EmailSender::new(delivery),
        config.sender.profile(),
        CampaignSettings::from(&config.campaign),
    );

    info!(title = %topic.title, dry_run, "starting outreach campaign");

    let reporter = CliProgress::new();
    let result = panel.run_outreach_campaign(topic, &reporter).await;
    reporter.finish();
    let result = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result, dry_run);
        if dry_run {
            for email in dry_run_outbox.outbox().await {
                println!("----------------------------------------");
                println!("To:      {}", email.to);
                println!("Subject: {}", email.subject);
                println!();
                println!("{}", email.text_body.as_deref().unwrap_or(&email.html_body));
            }
        }
    }

    Ok(())
}

fn print_summary(result: &CampaignResult, dry_run: bool) {
    println!();
    match &result.reason {
        Some(reason) => println!("  Campaign failed: {reason}"),
        None if dry_run => println!("  Dry run complete (nothing was sent)"),
        None => println!("  Campaign complete!"),
    }
    println!("  ID:        {}", result.id);
    println!("  Prospects: {}", result.total_prospects);
    println!("  Selected:  {}", result.selected_prospects);
    println!("  Skipped:   {}", result.prospects_skipped);
    println!("  Drafted:   {}", result.emails_created);
    println!("  Sent:      {}", result.emails_sent);
    println!("  Failed:    {}", result.emails_failed);
    let elapsed = result.finished_at - result.started_at;
    println!(
        "  Time:      {:.1}s",
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    println!();
}

async fn cmd_prospects(config_path: Option<&Path>, topic: &Topic, json: bool) -> Result<()> {
    let config = load(config_path)?;
    let generator = prospect_generator(&config, gemini(&config)?)?;

    let spinner = CliProgress::new();
    spinner.phase("Generating prospects");
    let report = generator.generate_report(topic).await;
    spinner.finish();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  Core phrase: {}", report.core_phrase);
    println!("  Queries:     {}", report.queries.len());
    println!("  Prospects:   {}", report.prospects.len());
    println!();
    for prospect in &report.prospects {
        println!("  {:<40} {}", prospect.url, prospect.provenance);
    }
    Ok(())
}

async fn cmd_validate(
    config_path: Option<&Path>,
    email: &str,
    smtp: bool,
    json: bool,
) -> Result<()> {
    let config = load(config_path)?;
    let result = email_validator(&config).is_valid_email(email, smtp).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_valid {
        println!("{email}: valid");
    } else {
        println!(
            "{email}: invalid ({})",
            result.reason.as_deref().unwrap_or("unknown")
        );
    }
    for (key, value) in &result.details {
        println!("  {key}: {}", serde_json::to_string(value)?);
    }
    Ok(())
}

async fn cmd_draft(config_path: Option<&Path>, site_url: &str, to: Option<&str>) -> Result<()> {
    let config = load(config_path)?;
    config.validate()?;

    let site = Url::parse(site_url).map_err(|e| eyre!("invalid site URL '{site_url}': {e}"))?;
    let templates = template_maker(&config, gemini(&config)?)?;
    let profile = config.sender.profile();

    let spinner = CliProgress::new();
    spinner.phase("Drafting email");
    let body = templates.create_template(site.as_str(), &profile).await;
    spinner.finish();
    let body = body?;

    if let Some(to) = to {
        println!("To:      {to}");
    }
    println!("Subject: {}", subject_for(&profile));
    println!();
    println!("{body}");
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CampaignProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn prospect_started(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Prospect [{current}/{total}] {url}"));
    }

    fn prospect_finished(&self, outcome: &ProspectOutcome) {
        let line = match outcome.state {
            ProspectState::Sent => format!(
                "  sent     {} → {}",
                outcome.url,
                outcome.recipient.as_deref().unwrap_or("-")
            ),
            ProspectState::Failed | ProspectState::Skipped => format!(
                "  {:<8} {} ({})",
                format!("{:?}", outcome.state).to_lowercase(),
                outcome.url,
                outcome.detail.as_deref().unwrap_or("-")
            ),
        };
        self.spinner.println(line);
    }
}
