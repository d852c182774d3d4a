//! Plain-text changelog generation.
//!
//! The document is assembled from a fixed sequence of section builders.
//! Each builder returns `None` when its section is suppressed, otherwise
//! the section's lines. Interpolated values are HTML-escaped while the
//! document is built and the finished text is entity-decoded once.

use crate::models::{ReleaseVersion, ReportModel, TicketEntry};
use anyhow::Result;
use indexmap::IndexMap;
use std::borrow::Cow;

const RULE: &str = "---------------------";
const NONE_PLACEHOLDER: &str = " ~ None ~ ";
const NO_OWNERS_PLACEHOLDER: &str = " ~ None. Yay! ~ ";

/// Issue-tracker details the document links to.
#[derive(Debug, Clone, Default)]
pub struct JiraContext {
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Release versions, first entry names the release.
    pub release_versions: Vec<ReleaseVersion>,
}

impl JiraContext {
    /// Creates a context for `base_url` with no release versions.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            release_versions: Vec::new(),
        }
    }

    /// Creates a context whose release versions are the distinct fix
    /// versions of the model's tickets, in ticket order.
    pub fn from_model(base_url: impl Into<String>, model: &ReportModel<'_>) -> Self {
        let mut versions: IndexMap<&str, &ReleaseVersion> = IndexMap::new();
        for entry in &model.tickets.all {
            for version in &entry.ticket.fix_versions {
                versions.entry(version.id.as_str()).or_insert(version);
            }
        }

        Self {
            release_versions: versions.into_values().cloned().collect(),
            ..Self::new(base_url)
        }
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    fn version_url(&self, release: &ReleaseVersion) -> String {
        format!(
            "{}/projects/{}/versions/{}",
            self.base_url, release.project_key, release.id
        )
    }
}

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Omit sections with nothing to list instead of printing a placeholder.
    pub hide_empty_blocks: bool,
}

/// Render the changelog text for `model`.
pub fn render(model: &ReportModel<'_>, jira: &JiraContext, options: &RenderOptions) -> String {
    let sections = [
        release_section(jira),
        tickets_section(model, jira, options),
        other_commits_section(model, options),
        pending_section(model, jira, options),
        reverted_section(model, jira),
    ];

    let mut output = String::from("\n");
    for line in sections.into_iter().flatten().flatten() {
        output.push_str(&line);
        output.push('\n');
    }

    html_escape::decode_html_entities(&output).into_owned()
}

/// Serialize the report model as pretty JSON.
pub fn render_json(model: &ReportModel<'_>) -> Result<String> {
    serde_json::to_string_pretty(model).map_err(Into::into)
}

fn esc(value: &str) -> Cow<'_, str> {
    html_escape::encode_text(value)
}

/// Release name and one line per project version.
fn release_section(jira: &JiraContext) -> Option<Vec<String>> {
    let first = jira.release_versions.first()?;

    let mut lines = vec![format!("Release version: {}", esc(&first.name))];
    for release in &jira.release_versions {
        lines.push(format!(
            "  * {}: {}",
            esc(&release.project_key),
            esc(&jira.version_url(release))
        ));
    }

    Some(lines)
}

/// Every ticket that was not reverted.
fn tickets_section(
    model: &ReportModel<'_>,
    jira: &JiraContext,
    options: &RenderOptions,
) -> Option<Vec<String>> {
    let block: Vec<&TicketEntry<'_>> = model
        .tickets
        .all
        .iter()
        .filter(|entry| entry.ticket.reverted.is_none())
        .collect();

    if block.is_empty() && options.hide_empty_blocks {
        return None;
    }

    let mut lines = heading("Jira Tickets");
    for entry in &block {
        lines.extend(ticket_lines(entry, jira));
    }
    lines.push(closing(block.is_empty(), NONE_PLACEHOLDER));

    Some(lines)
}

/// Commits that reference no ticket.
fn other_commits_section(model: &ReportModel<'_>, options: &RenderOptions) -> Option<Vec<String>> {
    let block = &model.commits.no_tickets;

    if block.is_empty() && options.hide_empty_blocks {
        return None;
    }

    let mut lines = heading("Other Commits");
    for commit in block {
        lines.push(format!(
            "  * {} - <{}> - {}",
            esc(&commit.display_author()),
            esc(commit.short_revision()),
            esc(&commit.summary)
        ));
    }
    lines.push(closing(block.is_empty(), NONE_PLACEHOLDER));

    Some(lines)
}

/// Pending tickets grouped under their owner.
fn pending_section(
    model: &ReportModel<'_>,
    jira: &JiraContext,
    options: &RenderOptions,
) -> Option<Vec<String>> {
    let block = &model.tickets.pending_by_owner;

    if block.is_empty() && options.hide_empty_blocks {
        return None;
    }

    let mut lines = heading("Pending Approval");
    for owner in block {
        lines.push(esc(&owner.display_name()).into_owned());
        for entry in &owner.tickets {
            lines.push(format!("  * {}", esc(&jira.browse_url(entry.key()))));
        }
    }
    if block.is_empty() {
        lines.push(NO_OWNERS_PLACEHOLDER.to_string());
    }

    Some(lines)
}

/// Reverted tickets with the reverting revision; absent when there are none.
fn reverted_section(model: &ReportModel<'_>, jira: &JiraContext) -> Option<Vec<String>> {
    let block = &model.tickets.reverted;
    if block.is_empty() {
        return None;
    }

    let mut lines = vec![String::new()];
    lines.extend(heading("Reverted"));
    for entry in block {
        lines.extend(ticket_lines(entry, jira));
        lines.push(format!(
            "    commit: {}",
            esc(entry.ticket.reverted.as_deref().unwrap_or_default())
        ));
    }

    Some(lines)
}

fn heading(title: &str) -> Vec<String> {
    vec![title.to_string(), RULE.to_string()]
}

fn closing(empty: bool, placeholder: &str) -> String {
    if empty {
        placeholder.to_string()
    } else {
        String::new()
    }
}

fn ticket_lines(entry: &TicketEntry<'_>, jira: &JiraContext) -> [String; 2] {
    let ticket = entry.ticket;
    [
        format!("  * <{}> - {}", esc(&ticket.issue_type), esc(&ticket.summary)),
        format!(
            "    [{}] {}",
            esc(&ticket.key),
            esc(&jira.browse_url(&ticket.key))
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{aggregate, AggregateOptions};
    use crate::models::{ChatUser, CommitRecord, Reporter, Ticket};

    const BASE: &str = "https://acme.atlassian.net";

    fn ticket(key: &str, issue_type: &str, summary: &str, reporter: &str) -> Ticket {
        Ticket {
            key: key.to_string(),
            issue_type: issue_type.to_string(),
            summary: summary.to_string(),
            status: "Done".to_string(),
            reporter: Some(Reporter {
                email: reporter.to_string(),
                display_name: "Reporter".to_string(),
            }),
            slack_user: None,
            fix_versions: Vec::new(),
            reverted: None,
        }
    }

    fn commit(revision: &str, summary: &str, tickets: Vec<Ticket>) -> CommitRecord {
        CommitRecord {
            revision: revision.to_string(),
            author_name: "Jane Doe".to_string(),
            author_email: None,
            date: None,
            summary: summary.to_string(),
            slack_user: None,
            tickets,
            reverted: None,
            reverts: None,
        }
    }

    #[test]
    fn test_render_full_document() {
        let commits = vec![
            commit(
                "1111111aaaa",
                "Fix login",
                vec![ticket("PROJ-1", "Bug", "Login fails", "a@x.com")],
            ),
            commit("2222222bbbb", "Bump deps", vec![]),
        ];
        let model = aggregate(&commits, &AggregateOptions::with_statuses(["Done"])).unwrap();
        let text = render(&model, &JiraContext::new(BASE), &RenderOptions::default());

        let expected = "\n\
Jira Tickets\n\
---------------------\n\
\x20 * <Bug> - Login fails\n\
\x20   [PROJ-1] https://acme.atlassian.net/browse/PROJ-1\n\
\n\
Other Commits\n\
---------------------\n\
\x20 * Jane Doe - <2222222> - Bump deps\n\
\n\
Pending Approval\n\
---------------------\n\
a@x.com\n\
\x20 * https://acme.atlassian.net/browse/PROJ-1\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_empty_model_with_placeholders() {
        let model = aggregate(&[], &AggregateOptions::default()).unwrap();
        let text = render(&model, &JiraContext::new(BASE), &RenderOptions::default());

        let expected = "\n\
Jira Tickets\n\
---------------------\n \
~ None ~ \n\
Other Commits\n\
---------------------\n \
~ None ~ \n\
Pending Approval\n\
---------------------\n \
~ None. Yay! ~ \n";
        assert_eq!(text, expected);
        assert!(!text.contains("Reverted"));
        assert!(!text.contains("Release version"));
    }

    #[test]
    fn test_render_empty_model_hidden_blocks() {
        let model = aggregate(&[], &AggregateOptions::default()).unwrap();
        let options = RenderOptions {
            hide_empty_blocks: true,
        };
        let text = render(&model, &JiraContext::new(BASE), &options);
        assert!(text.trim().is_empty());
    }

    #[test]
    fn test_hidden_blocks_keep_populated_sections() {
        let commits = vec![commit("abcdef012345", "Docs", vec![])];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let options = RenderOptions {
            hide_empty_blocks: true,
        };
        let text = render(&model, &JiraContext::new(BASE), &options);

        assert!(text.contains("Other Commits"));
        assert!(text.contains("  * Jane Doe - <abcdef0> - Docs"));
        assert!(!text.contains("Jira Tickets"));
        assert!(!text.contains("Pending Approval"));
    }

    #[test]
    fn test_render_release_versions() {
        let mut t = ticket("PROJ-1", "Bug", "Login fails", "a@x.com");
        t.fix_versions = vec![
            ReleaseVersion {
                id: "10001".to_string(),
                name: "2.4.0".to_string(),
                project_key: "PROJ".to_string(),
            },
            ReleaseVersion {
                id: "10002".to_string(),
                name: "2.4.0".to_string(),
                project_key: "WEB".to_string(),
            },
        ];
        let commits = vec![commit("1111111aaaa", "Fix", vec![t])];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let jira = JiraContext::from_model(format!("{}/", BASE), &model);
        assert_eq!(jira.base_url, BASE);

        let text = render(&model, &jira, &RenderOptions::default());
        assert!(text.starts_with(
            "\nRelease version: 2.4.0\n\
\x20 * PROJ: https://acme.atlassian.net/projects/PROJ/versions/10001\n\
\x20 * WEB: https://acme.atlassian.net/projects/WEB/versions/10002\n\
Jira Tickets\n"
        ));
    }

    #[test]
    fn test_render_reverted_tickets() {
        let mut reverted = ticket("PROJ-2", "Story", "Dark mode", "b@x.com");
        reverted.reverted = Some("9999999cccc".to_string());
        let commits = vec![
            commit("1111111aaaa", "Fix", vec![ticket("PROJ-1", "Bug", "Login", "a@x.com")]),
            commit("3333333dddd", "Dark mode", vec![reverted]),
        ];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let text = render(&model, &JiraContext::new(BASE), &RenderOptions::default());

        let (tickets_part, reverted_part) = text.split_once("\nReverted\n").unwrap();
        assert!(tickets_part.contains("[PROJ-1]"));
        assert!(!tickets_part.contains("<Story> - Dark mode"));
        assert_eq!(
            reverted_part,
            "---------------------\n\
\x20 * <Story> - Dark mode\n\
\x20   [PROJ-2] https://acme.atlassian.net/browse/PROJ-2\n\
\x20   commit: 9999999cccc\n"
        );
    }

    #[test]
    fn test_render_uses_chat_handles() {
        let mut t = ticket("PROJ-1", "Bug", "Login", "a@x.com");
        t.slack_user = Some(ChatUser {
            name: "alice".to_string(),
        });
        let mut c = commit("4444444eeee", "Tidy", vec![]);
        c.slack_user = Some(ChatUser {
            name: "jane".to_string(),
        });
        let commits = vec![commit("1111111aaaa", "Fix", vec![t]), c];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let text = render(&model, &JiraContext::new(BASE), &RenderOptions::default());

        assert!(text.contains("\n@alice\n  * https://acme.atlassian.net/browse/PROJ-1\n"));
        assert!(text.contains("  * @jane - <4444444> - Tidy"));
    }

    #[test]
    fn test_markup_in_summaries_is_plain_text() {
        let commits = vec![
            commit(
                "1111111aaaa",
                "Fix",
                vec![ticket("PROJ-1", "Bug", "Escape <b>tags</b> & \"quotes\"", "a@x.com")],
            ),
            commit("5555555ffff", "Handle &amp; in names", vec![]),
        ];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let text = render(&model, &JiraContext::new(BASE), &RenderOptions::default());

        assert!(text.contains("  * <Bug> - Escape <b>tags</b> & \"quotes\""));
        assert!(text.contains("- Handle &amp; in names"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let commits = vec![
            commit("1111111aaaa", "Fix", vec![ticket("PROJ-1", "Bug", "Login", "a@x.com")]),
            commit("2222222bbbb", "Chore", vec![]),
        ];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let jira = JiraContext::new(BASE);
        let options = RenderOptions::default();
        assert_eq!(render(&model, &jira, &options), render(&model, &jira, &options));
    }

    #[test]
    fn test_render_fixture() {
        let commits: Vec<CommitRecord> =
            serde_json::from_str(include_str!("../../fixtures/commits.json")).unwrap();
        let options = AggregateOptions::with_statuses(["Done", "Closed", "Accepted"]);
        let model = aggregate(&commits, &options).unwrap();
        let jira = JiraContext::from_model(BASE, &model);
        let text = render(&model, &jira, &RenderOptions::default());

        let expected = "\n\
Release version: 3.2.0\n\
\x20 * PROJ: https://acme.atlassian.net/projects/PROJ/versions/10200\n\
Jira Tickets\n\
---------------------\n\
\x20 * <Bug> - Expired sessions stay valid <after> logout\n\
\x20   [PROJ-101] https://acme.atlassian.net/browse/PROJ-101\n\
\x20 * <Story> - Profile page & settings\n\
\x20   [PROJ-87] https://acme.atlassian.net/browse/PROJ-87\n\
\n\
Other Commits\n\
---------------------\n\
\x20 * Sam Lee - <b2c3d4e> - Bump serde to 1.0.200\n\
\n\
Pending Approval\n\
---------------------\n\
qa@acme.io\n\
\x20 * https://acme.atlassian.net/browse/PROJ-101\n\
@pm\n\
\x20 * https://acme.atlassian.net/browse/PROJ-87\n\
\x20 * https://acme.atlassian.net/browse/PROJ-90\n\
\n\
Reverted\n\
---------------------\n\
\x20 * <Story> - Dark mode\n\
\x20   [PROJ-90] https://acme.atlassian.net/browse/PROJ-90\n\
\x20   commit: e5f60718293a4b5c6d7e8f901234567890123456\n";
        assert_eq!(text, expected);
        assert_eq!(model.tickets.approved.len(), 2);
    }

    #[test]
    fn test_render_json() {
        let commits = vec![
            commit("1111111aaaa", "Fix", vec![ticket("PROJ-1", "Bug", "Login", "a@x.com")]),
            commit("2222222bbbb", "Chore", vec![]),
        ];
        let model = aggregate(&commits, &AggregateOptions::default()).unwrap();
        let json = render_json(&model).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["commits"]["noTickets"][0], "2222222bbbb");
        assert_eq!(value["tickets"]["all"][0]["key"], "PROJ-1");
        assert_eq!(value["tickets"]["all"][0]["commits"][0], "1111111aaaa");
        assert_eq!(value["tickets"]["pendingByOwner"][0]["email"], "a@x.com");
    }
}
