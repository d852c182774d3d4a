//! Data models for the changelog generator.
//!
//! This module contains the commit and ticket records consumed by the
//! aggregator, and the report model it produces for rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A resolved chat handle (e.g. a Slack user name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Handle without the leading `@`.
    pub name: String,
}

impl fmt::Display for ChatUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

/// The person who reported a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
    /// Email address; the stable owner key.
    #[serde(default)]
    pub email: String,
    /// Human-readable name.
    #[serde(default)]
    pub display_name: String,
}

/// A release version a ticket is associated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseVersion {
    /// Issue-tracker version id.
    pub id: String,
    /// Version name, e.g. `"2.4.0"`.
    pub name: String,
    /// Key of the project owning the version.
    pub project_key: String,
}

/// One issue-tracker item linked from a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Globally unique ticket key, e.g. `PROJ-123`.
    pub key: String,
    /// Issue type name ("Bug", "Story", ...).
    #[serde(default)]
    pub issue_type: String,
    /// Ticket title.
    #[serde(default)]
    pub summary: String,
    /// Current workflow status name.
    #[serde(default)]
    pub status: String,
    /// Reporter; required by the aggregator.
    #[serde(default)]
    pub reporter: Option<Reporter>,
    /// Resolved chat handle of the reporter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_user: Option<ChatUser>,
    /// Release versions the ticket is scheduled for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fix_versions: Vec<ReleaseVersion>,
    /// Revision of the commit that reverted this ticket's work.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted: Option<String>,
}

impl Ticket {
    /// Creates a bare ticket reference carrying only its key.
    pub fn stub(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            issue_type: String::new(),
            summary: String::new(),
            status: String::new(),
            reporter: None,
            slack_user: None,
            fix_versions: Vec::new(),
            reverted: None,
        }
    }

    /// Reporter email, if a reporter is attached.
    pub fn reporter_email(&self) -> Option<&str> {
        self.reporter.as_ref().map(|r| r.email.as_str())
    }
}

/// One version-control commit annotated with its linked tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full revision id.
    #[serde(default)]
    pub revision: String,
    /// Author display name.
    #[serde(default)]
    pub author_name: String,
    /// Author email, used to resolve chat handles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    /// Commit time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// First line of the commit message.
    #[serde(default)]
    pub summary: String,
    /// Resolved chat handle of the author.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_user: Option<ChatUser>,
    /// Linked tickets in the order they were referenced.
    #[serde(default)]
    pub tickets: Vec<Ticket>,
    /// Revision of the commit that reverted this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted: Option<String>,
    /// Revision (or prefix) this commit reverts, when it is a revert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverts: Option<String>,
}

impl CommitRecord {
    /// Returns the abbreviated (7 character) revision.
    pub fn short_revision(&self) -> &str {
        match self.revision.char_indices().nth(7) {
            Some((idx, _)) => &self.revision[..idx],
            None => &self.revision,
        }
    }

    /// Returns the name shown for the author: `@handle` when resolved.
    pub fn display_author(&self) -> String {
        match self.slack_user {
            Some(ref user) => user.to_string(),
            None => self.author_name.clone(),
        }
    }
}

/// A deduplicated ticket together with every commit that references it.
#[derive(Debug, Clone, Serialize)]
pub struct TicketEntry<'a> {
    /// First-seen instance of the ticket.
    #[serde(flatten)]
    pub ticket: &'a Ticket,
    /// Referencing commits in input order.
    #[serde(serialize_with = "serialize_revisions")]
    pub commits: Vec<&'a CommitRecord>,
}

impl<'a> TicketEntry<'a> {
    /// Ticket key.
    pub fn key(&self) -> &'a str {
        &self.ticket.key
    }
}

fn serialize_revisions<S>(commits: &[&CommitRecord], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_seq(commits.iter().map(|c| c.revision.as_str()))
}

/// A reporter identity and the tickets attributed to them.
#[derive(Debug, Clone, Serialize)]
pub struct Owner<'a> {
    /// Reporter email (grouping key).
    pub email: String,
    /// Reporter display name.
    pub name: String,
    /// Chat handle, when resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_user: Option<ChatUser>,
    /// Tickets in `tickets.pending` order.
    pub tickets: Vec<TicketEntry<'a>>,
}

impl Owner<'_> {
    /// Returns the header shown for the owner: `@handle` or the email.
    pub fn display_name(&self) -> String {
        match self.slack_user {
            Some(ref user) => user.to_string(),
            None => self.email.clone(),
        }
    }
}

/// Commit partitions by ticket presence.
#[derive(Debug, Clone, Serialize)]
pub struct CommitGroups<'a> {
    /// Every input commit, original order.
    #[serde(serialize_with = "serialize_revisions")]
    pub all: Vec<&'a CommitRecord>,
    /// Commits linked to at least one ticket.
    #[serde(serialize_with = "serialize_revisions")]
    pub tickets: Vec<&'a CommitRecord>,
    /// Commits linked to no ticket.
    #[serde(rename = "noTickets", serialize_with = "serialize_revisions")]
    pub no_tickets: Vec<&'a CommitRecord>,
}

/// Ticket partitions.
#[derive(Debug, Clone, Serialize)]
pub struct TicketGroups<'a> {
    /// Deduplicated tickets sorted by issue type (stable).
    pub all: Vec<TicketEntry<'a>>,
    /// Tickets whose status is in the approved set.
    pub approved: Vec<TicketEntry<'a>>,
    /// Tickets awaiting approval.
    pub pending: Vec<TicketEntry<'a>>,
    /// `pending` grouped by reporter.
    #[serde(rename = "pendingByOwner")]
    pub pending_by_owner: Vec<Owner<'a>>,
    /// Tickets carrying a revert marker.
    pub reverted: Vec<TicketEntry<'a>>,
}

/// Aggregated view of a commit range, consumed by the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct ReportModel<'a> {
    pub commits: CommitGroups<'a>,
    pub tickets: TicketGroups<'a>,
}
