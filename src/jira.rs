//! Jira issue fetching
//!
//! One read-only query per invocation: the current user's open issues,
//! filtered server-side by JQL. Only the first page of results is used;
//! users with more open issues than one page holds will not see the rest.

use serde::Deserialize;

use crate::config::JiraConfig;
use crate::error::{Error, Result};

/// Issues assigned to the authenticated user, excluding finished work and
/// sub-tasks. The tracker's ordering (most recently updated first) is kept.
const SEARCH_JQL: &str =
    "assignee = currentUser() AND statusCategory != Done AND issuetype != Sub-task ORDER BY updated DESC";

/// A unit of work from the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Tracker-assigned unique key, e.g. "AB-1".
    pub key: String,
    /// Display text, "<key>: <summary>".
    pub label: String,
}

pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    api_token: String,
}

impl JiraClient {
    pub fn new(cfg: &JiraConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            username: cfg.username.clone(),
            api_token: cfg.api_token.clone(),
        }
    }

    /// Fetch the user's open issues, in the tracker's order.
    pub async fn fetch_user_issues(&self) -> Result<Vec<Issue>> {
        const OP: &str = "fetch Jira issues";

        let url = format!("{}/rest/api/3/search", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("jql", SEARCH_JQL)])
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::remote(OP, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::remote(OP, format!("HTTP {}", response.status())));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::remote(OP, e.to_string()))?;

        Ok(data
            .issues
            .into_iter()
            .map(|issue| Issue {
                label: format!("{}: {}", issue.key, issue.fields.summary),
                key: issue.key,
            })
            .collect())
    }

    /// Cheap authenticated request, used by `tp doctor`.
    pub async fn check_connection(&self) -> Result<()> {
        const OP: &str = "check Jira connection";

        let url = format!("{}/rest/api/3/myself", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.api_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::remote(OP, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::remote(OP, format!("HTTP {}", response.status())));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
// API Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    key: String,
    fields: ApiFields,
}

#[derive(Debug, Deserialize)]
struct ApiFields {
    #[serde(default)]
    summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{"issues":[
            {"key":"AB-2","fields":{"summary":"Add feature"}},
            {"key":"AB-1","fields":{"summary":"Fix bug"}}
        ]}"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.issues.len(), 2);
        assert_eq!(resp.issues[0].key, "AB-2");
        assert_eq!(resp.issues[1].fields.summary, "Fix bug");
    }

    #[test]
    fn test_parse_empty_search_response() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.issues.is_empty());
    }

    #[test]
    fn test_issue_label_format() {
        let issue = ApiIssue {
            key: "AB-1".into(),
            fields: ApiFields {
                summary: "Fix bug".into(),
            },
        };
        let label = format!("{}: {}", issue.key, issue.fields.summary);
        assert_eq!(label, "AB-1: Fix bug");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = JiraClient::new(&JiraConfig {
            base_url: "https://example.atlassian.net/".into(),
            username: "dev@example.com".into(),
            api_token: "token".into(),
        });
        assert_eq!(client.base_url, "https://example.atlassian.net");
    }
}
