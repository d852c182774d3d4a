//! jira-changelog - release changelogs from git history and Jira
//!
//! Collects the commits of a revision range, resolves the Jira tickets
//! they mention and prints a plain-text changelog grouped by ticket,
//! approval state and owner.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, git, Jira, malformed input, ...)

mod analysis;
mod cli;
mod config;
mod error;
mod jira;
mod models;
mod output;
mod repo;
mod report;

use analysis::AggregateOptions;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::CommitRecord;
use report::{JiraContext, RenderOptions};
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("jira-changelog v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Changelog generation failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .changelog.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    eprintln!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr; stdout carries only the changelog.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete changelog workflow.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let commits = match args.input {
        Some(ref input) => load_commits(input)?,
        None => collect_commits(&args, &config).await?,
    };

    let options = AggregateOptions {
        approved_statuses: config.changelog.approval_statuses.clone(),
        exclude_approved_from_pending: config.changelog.exclude_approved_from_pending,
    };
    let model = analysis::aggregate(&commits, &options).context("Malformed commit data")?;

    let document = match args.format {
        OutputFormat::Text => {
            let jira = JiraContext::from_model(config.jira.host.as_str(), &model);
            let render_options = RenderOptions {
                hide_empty_blocks: config.changelog.hide_empty_blocks,
            };
            report::render(&model, &jira, &render_options)
        }
        OutputFormat::Json => report::render_json(&model)?,
    };

    print!("{}", document);

    if let Some(ref path) = config.general.output {
        output::write_file(path, &document)?;
    }

    if args.github_output {
        output::publish_github_output(&document)?;
    }

    info!(
        "Changelog: {} commits, {} tickets, {} without tickets",
        model.commits.all.len(),
        model.tickets.all.len(),
        model.commits.no_tickets.len()
    );

    Ok(())
}

/// Read already-annotated commits from a JSON file.
fn load_commits(path: &Path) -> Result<Vec<CommitRecord>> {
    info!("Reading commits from {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse commits from {}", path.display()))
}

/// Collect commits from git and annotate them with Jira ticket details.
async fn collect_commits(args: &Args, config: &Config) -> Result<Vec<CommitRecord>> {
    if config.jira.host.is_empty() {
        anyhow::bail!("Jira host is not configured (use --jira-host, JIRA_HOST or [jira] host)");
    }

    let collect_options = repo::CollectOptions {
        pattern: repo::TicketPattern::new(&config.git.ticket_pattern)?,
        include_merges: config.git.include_merges,
    };
    let range = repo::RevisionRange {
        from: args.from.clone(),
        to: args.to.clone(),
    };
    let commits = repo::collect_commits(&args.repo_path, &range, &collect_options)?;

    let keys = jira::linked_keys(&commits);
    if keys.is_empty() {
        warn!("No ticket keys found in {} commits", commits.len());
    }

    let client = jira::JiraClient::new(jira::ClientConfig {
        host: config.jira.host.clone(),
        email: config.jira.email.clone(),
        api_token: config.jira.api_token.clone(),
        timeout_seconds: config.jira.timeout_seconds,
    })?;
    let fetched = client
        .fetch_tickets(&keys, config.jira.concurrency, !args.quiet)
        .await?;

    let chat = jira::ChatDirectory::new(config.chat.handles.clone());
    Ok(jira::annotate(commits, &fetched, &chat))
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try the current directory, then the repository
    if let Some(config) = Config::load_default()? {
        info!("Loaded default config from {}", CONFIG_FILE);
        return Ok(config);
    }

    match Config::load_from_dir(&args.repo_path)? {
        Some(config) => {
            info!("Found {} in repository", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
