//! Commit history collection.
//!
//! Walks a revision range with git2 and turns each commit into a
//! `CommitRecord` carrying ticket stubs for every key mentioned in its
//! message.

use crate::error::ChangelogError;
use crate::models::{CommitRecord, Ticket};
use anyhow::{Context, Result};
use chrono::DateTime;
use git2::{Repository, Sort};
use indexmap::IndexSet;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};

/// Default ticket key pattern (`PROJ-123`).
pub const DEFAULT_TICKET_PATTERN: &str = r"\b[A-Z][A-Z0-9]+-\d+\b";

const REVERT_MARKER: &str = "This reverts commit ";

/// Range of revisions to collect, `from` exclusive.
#[derive(Debug, Clone)]
pub struct RevisionRange {
    /// Older boundary; `None` walks the full history reachable from `to`.
    pub from: Option<String>,
    /// Newer boundary.
    pub to: String,
}

impl Default for RevisionRange {
    fn default() -> Self {
        Self {
            from: None,
            to: "HEAD".to_string(),
        }
    }
}

/// Matches ticket keys inside commit messages.
#[derive(Debug, Clone)]
pub struct TicketPattern {
    regex: Regex,
}

impl TicketPattern {
    /// Compile a ticket pattern.
    pub fn new(pattern: &str) -> Result<Self, ChangelogError> {
        let regex = Regex::new(pattern).map_err(|e| ChangelogError::InvalidTicketPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Distinct keys found in `message`, in order of first mention.
    pub fn find_keys(&self, message: &str) -> Vec<String> {
        let keys: IndexSet<&str> = self.regex.find_iter(message).map(|m| m.as_str()).collect();
        keys.into_iter().map(String::from).collect()
    }
}

impl Default for TicketPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_TICKET_PATTERN).expect("default ticket pattern is valid"),
        }
    }
}

/// Options for [`collect_commits`].
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Ticket key matcher.
    pub pattern: TicketPattern,
    /// Keep merge commits in the output.
    pub include_merges: bool,
}

/// Collect the commits in `range`, newest first.
pub fn collect_commits(
    repo_path: &Path,
    range: &RevisionRange,
    options: &CollectOptions,
) -> Result<Vec<CommitRecord>> {
    let repo = Repository::open(repo_path)
        .with_context(|| format!("Failed to open repository: {}", repo_path.display()))?;

    let mut revwalk = repo.revwalk().context("Failed to start revision walk")?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

    let to = repo
        .revparse_single(&range.to)
        .and_then(|obj| obj.peel_to_commit())
        .with_context(|| format!("Unknown revision: {}", range.to))?;
    revwalk.push(to.id())?;

    if let Some(ref from) = range.from {
        let from_commit = repo
            .revparse_single(from)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Unknown revision: {}", from))?;
        revwalk.hide(from_commit.id())?;
    }

    let mut records = Vec::new();
    for oid in revwalk {
        let oid = oid.context("Failed to walk history")?;
        let commit = repo.find_commit(oid)?;

        if commit.parent_count() > 1 && !options.include_merges {
            debug!("Skipping merge commit {}", oid);
            continue;
        }

        let message = commit.message().unwrap_or_default();
        let author = commit.author();

        records.push(CommitRecord {
            revision: oid.to_string(),
            author_name: author.name().unwrap_or_default().to_string(),
            author_email: author.email().map(String::from),
            date: DateTime::from_timestamp(commit.time().seconds(), 0),
            summary: commit.summary().unwrap_or_default().to_string(),
            slack_user: None,
            tickets: options
                .pattern
                .find_keys(message)
                .into_iter()
                .map(Ticket::stub)
                .collect(),
            reverted: None,
            reverts: parse_revert(message),
        });
    }

    info!(
        "Collected {} commits from {}..{}",
        records.len(),
        range.from.as_deref().unwrap_or("<root>"),
        range.to
    );

    Ok(records)
}

/// Revision named by a `This reverts commit <sha>` line.
pub fn parse_revert(message: &str) -> Option<String> {
    let start = message.find(REVERT_MARKER)? + REVERT_MARKER.len();
    let sha: String = message[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();

    if sha.len() >= 7 {
        Some(sha)
    } else {
        None
    }
}
