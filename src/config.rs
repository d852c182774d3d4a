//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.changelog.toml` files.

use crate::repo::history::DEFAULT_TICKET_PATTERN;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".changelog.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Jira connection settings.
    #[serde(default)]
    pub jira: JiraConfig,

    /// Aggregation and rendering settings.
    #[serde(default)]
    pub changelog: ChangelogConfig,

    /// Commit collection settings.
    #[serde(default)]
    pub git: GitConfig,

    /// Chat handle directory.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// File the changelog is also written to.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

/// Jira connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Jira base URL.
    #[serde(default)]
    pub host: String,

    /// Account email for basic auth.
    #[serde(default)]
    pub email: Option<String>,

    /// API token for basic auth. Prefer the `JIRA_TOKEN` variable.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Concurrent ticket requests.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            email: None,
            api_token: None,
            timeout_seconds: default_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_concurrency() -> usize {
    4
}

/// Aggregation and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogConfig {
    /// Status names that count as approved.
    #[serde(default = "default_approval_statuses")]
    pub approval_statuses: BTreeSet<String>,

    /// Omit empty sections instead of printing a placeholder.
    #[serde(default)]
    pub hide_empty_blocks: bool,

    /// Leave approved tickets out of "Pending Approval".
    #[serde(default)]
    pub exclude_approved_from_pending: bool,
}

impl Default for ChangelogConfig {
    fn default() -> Self {
        Self {
            approval_statuses: default_approval_statuses(),
            hide_empty_blocks: false,
            exclude_approved_from_pending: false,
        }
    }
}

fn default_approval_statuses() -> BTreeSet<String> {
    ["Done", "Closed", "Accepted"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Commit collection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Regular expression matching ticket keys in commit messages.
    #[serde(default = "default_ticket_pattern")]
    pub ticket_pattern: String,

    /// Keep merge commits.
    #[serde(default)]
    pub include_merges: bool,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            ticket_pattern: default_ticket_pattern(),
            include_merges: false,
        }
    }
}

fn default_ticket_pattern() -> String {
    DEFAULT_TICKET_PATTERN.to_string()
}

/// Chat handle directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// `email = "handle"` pairs.
    #[serde(default)]
    pub handles: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a repository directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.jira_host {
            self.jira.host = host.clone();
        }
        if let Some(ref email) = args.jira_email {
            self.jira.email = Some(email.clone());
        }
        if let Some(ref token) = args.jira_token {
            self.jira.api_token = Some(token.clone());
        }
        if let Some(timeout) = args.timeout {
            self.jira.timeout_seconds = timeout;
        }
        if let Some(concurrency) = args.concurrency {
            self.jira.concurrency = concurrency;
        }

        if let Some(ref statuses) = args.approval_status {
            self.changelog.approval_statuses = statuses.iter().cloned().collect();
        }
        if args.hide_empty_blocks {
            self.changelog.hide_empty_blocks = true;
        }
        if args.exclude_approved {
            self.changelog.exclude_approved_from_pending = true;
        }

        if let Some(ref pattern) = args.ticket_pattern {
            self.git.ticket_pattern = pattern.clone();
        }
        if args.include_merges {
            self.git.include_merges = true;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
