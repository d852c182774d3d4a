//! Commit and ticket aggregation.
//!
//! Turns a flat, ordered list of annotated commits into the report model:
//! commit partitions, deduplicated tickets, approval partitions and the
//! per-owner grouping of pending tickets.

use crate::error::ChangelogError;
use crate::models::{CommitGroups, CommitRecord, Owner, ReportModel, TicketEntry, TicketGroups};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::debug;

/// Knobs for [`aggregate`].
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Status names that count as approved.
    pub approved_statuses: BTreeSet<String>,
    /// When set, approved tickets are left out of `tickets.pending`.
    pub exclude_approved_from_pending: bool,
}

impl AggregateOptions {
    /// Options with the given approved statuses and default behaviour otherwise.
    #[allow(dead_code)] // Used by tests and library-style callers
    pub fn with_statuses<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            approved_statuses: statuses.into_iter().map(Into::into).collect(),
            exclude_approved_from_pending: false,
        }
    }

    fn is_approved(&self, entry: &TicketEntry<'_>) -> bool {
        self.approved_statuses.contains(&entry.ticket.status)
    }
}

/// Build the report model for `commits`.
///
/// Fails only on malformed input: a commit without a revision, or a
/// linked ticket without a key or reporter email.
pub fn aggregate<'a>(
    commits: &'a [CommitRecord],
    options: &AggregateOptions,
) -> Result<ReportModel<'a>, ChangelogError> {
    validate(commits)?;

    let all_tickets = collect_tickets(commits);

    let approved: Vec<TicketEntry<'a>> = all_tickets
        .iter()
        .filter(|entry| options.is_approved(entry))
        .cloned()
        .collect();

    let pending: Vec<TicketEntry<'a>> = if options.exclude_approved_from_pending {
        all_tickets
            .iter()
            .filter(|entry| !options.is_approved(entry))
            .cloned()
            .collect()
    } else {
        all_tickets.clone()
    };

    let pending_by_owner = group_by_owner(&pending);

    let reverted: Vec<TicketEntry<'a>> = all_tickets
        .iter()
        .filter(|entry| entry.ticket.reverted.is_some())
        .cloned()
        .collect();

    let (with_tickets, no_tickets): (Vec<&CommitRecord>, Vec<&CommitRecord>) =
        commits.iter().partition(|c| !c.tickets.is_empty());

    debug!(
        "Aggregated {} commits into {} tickets ({} approved, {} owners, {} reverted)",
        commits.len(),
        all_tickets.len(),
        approved.len(),
        pending_by_owner.len(),
        reverted.len()
    );

    Ok(ReportModel {
        commits: CommitGroups {
            all: commits.iter().collect(),
            tickets: with_tickets,
            no_tickets,
        },
        tickets: TicketGroups {
            all: all_tickets,
            approved,
            pending,
            pending_by_owner,
            reverted,
        },
    })
}

/// Check the fields grouping depends on before anything is built.
fn validate(commits: &[CommitRecord]) -> Result<(), ChangelogError> {
    for (ci, commit) in commits.iter().enumerate() {
        if commit.revision.trim().is_empty() {
            return Err(ChangelogError::MissingCommitField {
                field: "revision",
                commit: ci,
            });
        }

        for (ti, ticket) in commit.tickets.iter().enumerate() {
            let missing = if ticket.key.trim().is_empty() {
                Some("key")
            } else if ticket.reporter.is_none() {
                Some("reporter")
            } else if ticket.reporter_email().map_or(true, |e| e.trim().is_empty()) {
                Some("reporter email")
            } else {
                None
            };

            if let Some(field) = missing {
                return Err(ChangelogError::MissingTicketField {
                    field,
                    commit: ci,
                    ticket: ti,
                    key: ticket.key.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Deduplicate tickets by key (first seen wins) and sort by issue type.
fn collect_tickets(commits: &[CommitRecord]) -> Vec<TicketEntry<'_>> {
    let mut by_key: IndexMap<&str, TicketEntry<'_>> = IndexMap::new();

    for commit in commits {
        for ticket in &commit.tickets {
            by_key
                .entry(ticket.key.as_str())
                .or_insert_with(|| TicketEntry {
                    ticket,
                    commits: Vec::new(),
                })
                .commits
                .push(commit);
        }
    }

    let mut tickets: Vec<TicketEntry<'_>> = by_key.into_values().collect();
    // `sort_by` is stable: equal issue types keep first-seen order.
    tickets.sort_by(|a, b| a.ticket.issue_type.cmp(&b.ticket.issue_type));
    tickets
}

/// Group tickets by reporter email, in encounter order.
fn group_by_owner<'a>(tickets: &[TicketEntry<'a>]) -> Vec<Owner<'a>> {
    let mut owners: IndexMap<&str, Owner<'a>> = IndexMap::new();

    for entry in tickets {
        let ticket = entry.ticket;
        let Some(reporter) = ticket.reporter.as_ref() else {
            continue;
        };

        owners
            .entry(reporter.email.as_str())
            .or_insert_with(|| Owner {
                email: reporter.email.clone(),
                name: reporter.display_name.clone(),
                slack_user: ticket.slack_user.clone(),
                tickets: Vec::new(),
            })
            .tickets
            .push(entry.clone());
    }

    owners.into_values().collect()
}
