//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// jira-changelog - release changelogs from git history and Jira
///
/// Collects the commits in a revision range, looks up the Jira tickets
/// they mention and prints a changelog grouped by ticket, approval state
/// and ticket owner.
///
/// Examples:
///   jira-changelog --from v1.4.0 --to v1.5.0 --jira-host https://acme.atlassian.net
///   jira-changelog --from origin/main --hide-empty-blocks --github-output
///   jira-changelog --input commits.json --format json
///   jira-changelog --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Older end of the revision range (exclusive)
    ///
    /// When omitted the whole history reachable from --to is used.
    #[arg(long, value_name = "REV", env = "from")]
    pub from: Option<String>,

    /// Newer end of the revision range
    #[arg(long, value_name = "REV", default_value = "HEAD", env = "to")]
    pub to: String,

    /// Repository to read commits from
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub repo_path: PathBuf,

    /// Read already-annotated commits from a JSON file instead of git and Jira
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Jira base URL
    #[arg(long, value_name = "URL", env = "JIRA_HOST")]
    pub jira_host: Option<String>,

    /// Jira account email
    #[arg(long, value_name = "EMAIL", env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    /// Jira API token
    #[arg(long, value_name = "TOKEN", env = "JIRA_TOKEN", hide_env_values = true)]
    pub jira_token: Option<String>,

    /// Jira request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Concurrent Jira requests
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Status names counted as approved (comma-separated)
    ///
    /// Example: --approval-status Done,Closed
    #[arg(long, value_name = "STATUSES", value_delimiter = ',')]
    pub approval_status: Option<Vec<String>>,

    /// Omit empty sections instead of printing a placeholder
    #[arg(long)]
    pub hide_empty_blocks: bool,

    /// Leave approved tickets out of "Pending Approval"
    #[arg(long)]
    pub exclude_approved: bool,

    /// Regular expression matching ticket keys in commit messages
    #[arg(long, value_name = "REGEX")]
    pub ticket_pattern: Option<String>,

    /// Keep merge commits
    #[arg(long)]
    pub include_merges: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .changelog.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write the changelog to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Publish the changelog as the `changelog` step output ($GITHUB_OUTPUT)
    #[arg(long)]
    pub github_output: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .changelog.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain-text changelog (default)
    #[default]
    Text,
    /// Report model as JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if let Some(ref host) = self.jira_host {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err("Jira host must start with 'http://' or 'https://'".to_string());
            }
        }

        match self.input {
            Some(ref input) if !input.is_file() => {
                Err(format!("Input file does not exist: {}", input.display()))
            }
            Some(_) => Ok(()),
            None if !self.repo_path.is_dir() => Err(format!(
                "Repository path is not a directory: {}",
                self.repo_path.display()
            )),
            None => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
