//! Jira REST client.
//!
//! Fetches ticket details for the keys found in commit messages.

use crate::models::{ReleaseVersion, Reporter, Ticket};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const ISSUE_FIELDS: &str = "summary,issuetype,status,reporter,fixVersions";

/// Connection settings for the Jira API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `https://acme.atlassian.net`.
    pub host: String,
    /// Account email for basic auth.
    pub email: Option<String>,
    /// API token for basic auth.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub timeout_seconds: u64,
}

/// `GET /rest/api/2/issue/{key}` response.
#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueFields {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    issuetype: Option<NamedField>,
    #[serde(default)]
    status: Option<NamedField>,
    #[serde(default)]
    reporter: Option<JiraUser>,
    #[serde(default)]
    fix_versions: Vec<JiraVersion>,
}

#[derive(Debug, Deserialize)]
struct NamedField {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JiraVersion {
    id: String,
    name: String,
}

impl IssueResponse {
    /// Display fields Jira left out of the response.
    fn missing_fields(&self) -> Vec<&'static str> {
        let fields = &self.fields;
        [
            ("issuetype", fields.issuetype.is_none()),
            ("status", fields.status.is_none()),
            ("summary", fields.summary.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    fn into_ticket(self) -> Ticket {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            warn!("Ticket {} has no {} in Jira", self.key, missing.join("/"));
        }

        let project_key = self
            .key
            .split_once('-')
            .map(|(project, _)| project.to_string())
            .unwrap_or_else(|| self.key.clone());

        // Jira hides email addresses under strict privacy settings; the
        // account id still identifies the reporter uniquely.
        let reporter = self.fields.reporter.map(|user| Reporter {
            email: user.email_address.or(user.account_id).unwrap_or_default(),
            display_name: user.display_name.unwrap_or_default(),
        });

        Ticket {
            issue_type: self.fields.issuetype.map(|t| t.name).unwrap_or_default(),
            summary: self.fields.summary.unwrap_or_default(),
            status: self.fields.status.map(|s| s.name).unwrap_or_default(),
            reporter,
            slack_user: None,
            fix_versions: self
                .fields
                .fix_versions
                .into_iter()
                .map(|v| ReleaseVersion {
                    id: v.id,
                    name: v.name,
                    project_key: project_key.clone(),
                })
                .collect(),
            reverted: None,
            key: self.key,
        }
    }
}

/// Jira API client.
pub struct JiraClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl JiraClient {
    /// Create a client for the configured host.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config: ClientConfig {
                host: config.host.trim_end_matches('/').to_string(),
                ..config
            },
            http_client,
        })
    }

    /// Base URL tickets are browsed under.
    #[allow(dead_code)] // Accessor for the normalized host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Fetch one ticket. `Ok(None)` when Jira does not know the key.
    pub async fn fetch_ticket(&self, key: &str) -> Result<Option<Ticket>> {
        let url = format!("{}/rest/api/2/issue/{}", self.config.host, key);
        debug!("GET {}", url);

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("fields", ISSUE_FIELDS)]);
        if let Some(ref email) = self.config.email {
            request = request.basic_auth(email, self.config.api_token.as_ref());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!(
                    "Request for {} timed out after {}s",
                    key,
                    self.config.timeout_seconds
                )
            } else if e.is_connect() {
                anyhow::anyhow!("Cannot connect to Jira at {}", self.config.host)
            } else {
                anyhow::anyhow!("Failed to send request for {}: {}", key, e)
            }
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!("Ticket {} not found in Jira, ignoring", key);
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Jira API error {} for {}: {}", status, key, body));
        }

        let issue: IssueResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Jira response for {}", key))?;

        Ok(Some(issue.into_ticket()))
    }

    /// Fetch every key with at most `concurrency` requests in flight.
    ///
    /// Unknown keys are absent from the returned map.
    pub async fn fetch_tickets(
        &self,
        keys: &[String],
        concurrency: usize,
        show_progress: bool,
    ) -> Result<HashMap<String, Ticket>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        info!("Fetching {} tickets from {}", keys.len(), self.config.host);

        let progress_bar = if show_progress {
            let pb = ProgressBar::new(keys.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tickets")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut results = stream::iter(keys)
            .map(|key| async move { (key, self.fetch_ticket(key).await) })
            .buffer_unordered(concurrency.max(1));

        let mut tickets = HashMap::new();
        while let Some((key, result)) = results.next().await {
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
            if let Some(ticket) = result? {
                tickets.insert(key.clone(), ticket);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        info!("Resolved {} of {} tickets", tickets.len(), keys.len());
        Ok(tickets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUE_JSON: &str = r#"{
        "id": "10042",
        "key": "PROJ-42",
        "fields": {
            "summary": "Checkout &amp; payment",
            "issuetype": {"name": "Story"},
            "status": {"name": "In Review"},
            "reporter": {"emailAddress": "a@x.com", "displayName": "Alice", "accountId": "abc"},
            "fixVersions": [{"id": "10100", "name": "2.4.0", "released": false}]
        }
    }"#;

    fn config(host: &str) -> ClientConfig {
        ClientConfig {
            host: host.to_string(),
            email: None,
            api_token: None,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_issue_into_ticket() {
        let issue: IssueResponse = serde_json::from_str(ISSUE_JSON).unwrap();
        assert!(issue.missing_fields().is_empty());
        let ticket = issue.into_ticket();

        assert_eq!(ticket.key, "PROJ-42");
        assert_eq!(ticket.issue_type, "Story");
        assert_eq!(ticket.status, "In Review");
        assert_eq!(ticket.summary, "Checkout &amp; payment");
        assert_eq!(ticket.reporter_email(), Some("a@x.com"));
        assert_eq!(ticket.fix_versions.len(), 1);
        assert_eq!(ticket.fix_versions[0].project_key, "PROJ");
        assert_eq!(ticket.fix_versions[0].id, "10100");
    }

    #[test]
    fn test_hidden_email_falls_back_to_account_id() {
        let json = r#"{"key": "OPS-1", "fields": {"reporter": {"accountId": "5b10a2844c20165700ede21g"}}}"#;
        let issue: IssueResponse = serde_json::from_str(json).unwrap();
        assert_eq!(issue.missing_fields(), vec!["issuetype", "status", "summary"]);
        let ticket = issue.into_ticket();

        assert_eq!(ticket.reporter_email(), Some("5b10a2844c20165700ede21g"));
        assert!(ticket.issue_type.is_empty());
        assert!(ticket.fix_versions.is_empty());
    }

    #[test]
    fn test_client_trims_host() {
        let client = JiraClient::new(config("https://acme.atlassian.net/")).unwrap();
        assert_eq!(client.host(), "https://acme.atlassian.net");
    }

    #[test]
    fn test_fetch_no_keys() {
        let client = JiraClient::new(config("https://acme.atlassian.net")).unwrap();
        let tickets = tokio_test::block_on(client.fetch_tickets(&[], 4, false)).unwrap();
        assert!(tickets.is_empty());
    }
}
