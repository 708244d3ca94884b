//! Harvest time-entry client
//!
//! Implements the timer gateway over the Harvest v2 API. Every mutation is a
//! single best-effort call with no retry; when an append succeeds but the
//! following stop fails, the append stays and the stop's error is reported.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::HarvestConfig;
use crate::error::{Error, Result};
use crate::notes;

const BASE_URL: &str = "https://api.harvestapp.com/api/v2";
const USER_AGENT: &str = concat!("timeport/", env!("CARGO_PKG_VERSION"));

/// Snapshot of a remote time entry. Owned by the remote service; this is
/// read fresh on every invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub id: u64,
    pub notes: String,
    pub running: bool,
}

/// The remote time-tracking contract the reconciler drives.
#[async_trait]
pub trait TimerGateway {
    /// The currently running timer, or `None` when nothing runs.
    async fn running_timer(&self) -> Result<Option<Timer>>;

    /// Timers stopped today, most recent first.
    async fn stopped_today(&self) -> Result<Vec<Timer>>;

    /// Create a new running timer on the configured project/task.
    async fn start(&self, notes: &str) -> Result<()>;

    /// Resume a previously stopped timer, keeping its notes.
    async fn restart(&self, id: u64) -> Result<()>;

    /// Append notes to the running timer.
    async fn update(&self, notes: &str) -> Result<()>;

    /// Stop the running timer, optionally appending notes first.
    async fn stop(&self, notes: Option<&str>) -> Result<()>;
}

pub struct HarvestClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    account_id: u64,
    project_id: u64,
    task_id: u64,
}

impl HarvestClient {
    pub fn from_config(cfg: &HarvestConfig) -> Result<Self> {
        let (access_token, account_id, project_id, task_id) = match (
            &cfg.access_token,
            cfg.account_id,
            cfg.project_id,
            cfg.task_id,
        ) {
            (Some(token), Some(account), Some(project), Some(task)) => {
                (token.clone(), account, project, task)
            }
            _ => {
                return Err(Error::Config(
                    "Harvest is not configured. Run `tp auth` first".into(),
                ))
            }
        };

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: BASE_URL.to_string(),
            access_token,
            account_id,
            project_id,
            task_id,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("Harvest-Account-ID", self.account_id.to_string())
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        op: &'static str,
    ) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::remote(op, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::remote(op, format!("HTTP {}", response.status())));
        }
        Ok(response)
    }

    /// Today's entries, in the API's order (most recent first).
    async fn entries_today(&self, running_only: bool) -> Result<Vec<Timer>> {
        const OP: &str = "fetch time entries";

        let today = today();
        let mut query = vec![("from", today.clone()), ("to", today)];
        if running_only {
            query.push(("is_running", "true".to_string()));
        }

        let response = self
            .send(
                self.request(reqwest::Method::GET, "/time_entries")
                    .query(&query),
                OP,
            )
            .await?;

        let data: TimeEntriesResponse = response
            .json()
            .await
            .map_err(|e| Error::remote(OP, e.to_string()))?;

        Ok(data
            .time_entries
            .into_iter()
            .map(|entry| Timer {
                id: entry.id,
                notes: entry.notes.unwrap_or_default(),
                running: entry.is_running,
            })
            .collect())
    }

    async fn append_notes(&self, timer: &Timer, new_notes: &str) -> Result<()> {
        const OP: &str = "update timer";

        let combined = notes::combine(&timer.notes, new_notes);
        let body = UpdateNotesBody { notes: &combined };
        self.send(
            self.request(reqwest::Method::PATCH, &format!("/time_entries/{}", timer.id))
                .json(&body),
            OP,
        )
        .await?;
        Ok(())
    }

    /// Cheap authenticated request, used by `tp doctor`.
    pub async fn check_connection(&self) -> Result<()> {
        self.send(
            self.request(reqwest::Method::GET, "/users/me"),
            "check Harvest connection",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TimerGateway for HarvestClient {
    async fn running_timer(&self) -> Result<Option<Timer>> {
        Ok(self.entries_today(true).await?.into_iter().next())
    }

    async fn stopped_today(&self) -> Result<Vec<Timer>> {
        Ok(self
            .entries_today(false)
            .await?
            .into_iter()
            .filter(|t| !t.running)
            .collect())
    }

    async fn start(&self, notes: &str) -> Result<()> {
        let body = StartEntryBody {
            project_id: self.project_id,
            task_id: self.task_id,
            notes,
            spent_date: today(),
        };
        self.send(
            self.request(reqwest::Method::POST, "/time_entries").json(&body),
            "start timer",
        )
        .await?;
        Ok(())
    }

    async fn restart(&self, id: u64) -> Result<()> {
        self.send(
            self.request(reqwest::Method::PATCH, &format!("/time_entries/{}/restart", id)),
            "restart timer",
        )
        .await?;
        Ok(())
    }

    async fn update(&self, notes: &str) -> Result<()> {
        let running = self.running_timer().await?.ok_or(Error::NoRunningTimer)?;
        self.append_notes(&running, notes).await
    }

    async fn stop(&self, notes: Option<&str>) -> Result<()> {
        let running = self.running_timer().await?.ok_or(Error::NoRunningTimer)?;

        // Append first; a failed append aborts before the stop call.
        if let Some(new_notes) = notes.filter(|n| !n.is_empty()) {
            self.append_notes(&running, new_notes).await?;
        }

        self.send(
            self.request(
                reqwest::Method::PATCH,
                &format!("/time_entries/{}/stop", running.id),
            ),
            "stop timer",
        )
        .await?;
        Ok(())
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

// ═══════════════════════════════════════════════════════════════
// API Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct TimeEntriesResponse {
    #[serde(default)]
    time_entries: Vec<TimeEntry>,
}

#[derive(Debug, Deserialize)]
struct TimeEntry {
    id: u64,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    is_running: bool,
}

#[derive(Debug, Serialize)]
struct StartEntryBody<'a> {
    project_id: u64,
    task_id: u64,
    notes: &'a str,
    spent_date: String,
}

#[derive(Debug, Serialize)]
struct UpdateNotesBody<'a> {
    notes: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_entries_response() {
        let json = r#"{"time_entries":[
            {"id":636709355,"notes":"AB-1: Fix bug","is_running":true},
            {"id":636708723,"notes":null,"is_running":false}
        ]}"#;
        let resp: TimeEntriesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.time_entries.len(), 2);
        assert_eq!(resp.time_entries[0].id, 636709355);
        assert!(resp.time_entries[0].is_running);
        assert!(resp.time_entries[1].notes.is_none());
    }

    #[test]
    fn test_parse_empty_response() {
        let resp: TimeEntriesResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.time_entries.is_empty());
    }

    #[test]
    fn test_start_body_shape() {
        let body = StartEntryBody {
            project_id: 7001,
            task_id: 8002,
            notes: "AB-1: Fix bug",
            spent_date: "2026-08-06".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["project_id"], 7001);
        assert_eq!(json["task_id"], 8002);
        assert_eq!(json["notes"], "AB-1: Fix bug");
        assert_eq!(json["spent_date"], "2026-08-06");
    }

    #[test]
    fn test_from_config_requires_all_values() {
        let incomplete = HarvestConfig {
            access_token: Some("token".into()),
            account_id: Some(1),
            project_id: None,
            task_id: Some(2),
        };
        assert!(matches!(
            HarvestClient::from_config(&incomplete),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_today_is_iso_date() {
        let date = today();
        assert_eq!(date.len(), 10);
        assert_eq!(&date[4..5], "-");
        assert_eq!(&date[7..8], "-");
    }
}
