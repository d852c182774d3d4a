//! Merging ticket details and revert markers onto collected commits.

use crate::models::{ChatUser, CommitRecord, Ticket};
use indexmap::IndexSet;
use std::collections::HashMap;
use tracing::{debug, info};

/// Email to chat-handle lookup.
#[derive(Debug, Clone, Default)]
pub struct ChatDirectory {
    handles: HashMap<String, String>,
}

impl ChatDirectory {
    /// Build a directory from `email -> handle` pairs. Emails match case-insensitively.
    pub fn new<I>(handles: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            handles: handles
                .into_iter()
                .map(|(email, handle)| {
                    (
                        email.to_lowercase(),
                        handle.trim_start_matches('@').to_string(),
                    )
                })
                .collect(),
        }
    }

    /// Handle registered for `email`.
    pub fn lookup(&self, email: &str) -> Option<ChatUser> {
        self.handles
            .get(&email.to_lowercase())
            .map(|name| ChatUser { name: name.clone() })
    }
}

/// Distinct ticket keys referenced by `commits`, in first-mention order.
pub fn linked_keys(commits: &[CommitRecord]) -> Vec<String> {
    let keys: IndexSet<&str> = commits
        .iter()
        .flat_map(|c| &c.tickets)
        .map(|t| t.key.as_str())
        .collect();
    keys.into_iter().map(String::from).collect()
}

/// Replace ticket stubs with fetched details, resolve chat handles and
/// mark reverted commits and tickets.
///
/// Keys missing from `fetched` are dropped from their commit. A commit
/// whose `reverts` names another commit in the list marks that commit,
/// and every ticket it links, as reverted by the reverting revision.
pub fn annotate(
    commits: Vec<CommitRecord>,
    fetched: &HashMap<String, Ticket>,
    chat: &ChatDirectory,
) -> Vec<CommitRecord> {
    let mut commits: Vec<CommitRecord> = commits
        .into_iter()
        .map(|mut commit| {
            commit.slack_user = commit
                .author_email
                .as_deref()
                .and_then(|email| chat.lookup(email));
            commit.tickets = commit
                .tickets
                .iter()
                .filter_map(|stub| fetched.get(&stub.key))
                .map(|ticket| {
                    let mut ticket = ticket.clone();
                    ticket.slack_user = ticket.reporter_email().and_then(|email| chat.lookup(email));
                    ticket
                })
                .collect();
            commit
        })
        .collect();

    let reverted_keys = mark_reverted_commits(&mut commits);

    if !reverted_keys.is_empty() {
        info!("{} tickets were reverted in this range", reverted_keys.len());
        for ticket in commits.iter_mut().flat_map(|c| c.tickets.iter_mut()) {
            if let Some(revision) = reverted_keys.get(&ticket.key) {
                ticket.reverted = Some(revision.clone());
            }
        }
    }

    commits
}

/// Set `reverted` on every commit undone by a revert still in effect and
/// return the affected ticket keys with the reverting revision.
///
/// `commits` is newest first and a revert only targets an older commit. A
/// revert that is itself reverted has no effect, so reverting a revert
/// re-applies the original work.
fn mark_reverted_commits(commits: &mut [CommitRecord]) -> HashMap<String, String> {
    let mut reverted_by: Vec<Vec<usize>> = vec![Vec::new(); commits.len()];
    for (i, commit) in commits.iter().enumerate() {
        let Some(ref target) = commit.reverts else {
            continue;
        };
        match commits[i + 1..]
            .iter()
            .position(|c| c.revision.starts_with(target.as_str()))
        {
            Some(offset) => reverted_by[i + 1 + offset].push(i),
            None => debug!("Revert target {} is outside the range", target),
        }
    }

    // Reverters are newer, so their state is settled before their target's.
    let mut undone_by: Vec<Option<usize>> = vec![None; commits.len()];
    for i in 0..commits.len() {
        let reverter = reverted_by[i]
            .iter()
            .copied()
            .find(|&r| undone_by[r].is_none());
        undone_by[i] = reverter;
    }

    let mut reverted_keys = HashMap::new();
    for (i, reverter) in undone_by.into_iter().enumerate() {
        let Some(reverter) = reverter else {
            continue;
        };
        let revision = commits[reverter].revision.clone();
        let original = &mut commits[i];
        original.reverted = Some(revision.clone());

        if original.reverts.is_some() {
            debug!("Revert {} was itself reverted", original.revision);
            continue;
        }
        for ticket in &original.tickets {
            reverted_keys
                .entry(ticket.key.clone())
                .or_insert_with(|| revision.clone());
        }
    }

    reverted_keys
}
