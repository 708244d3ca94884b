//! Harvest credential setup
//!
//! Interactive flow behind `tp auth`: personal access token, account
//! discovery, project/task selection, config save. Jira credentials are set
//! non-interactively via `tp config set`.

use serde::Deserialize;

use crate::config::{Config, HarvestConfig};
use crate::error::{Error, Result};
use crate::report::Reporter;
use crate::ui::{self, Choice, Interact};

const ACCOUNTS_URL: &str = "https://id.getharvest.com/api/v2/accounts";
const ASSIGNMENTS_URL: &str = "https://api.harvestapp.com/api/v2/users/me/project_assignments";

pub async fn authenticate(
    cfg: &mut Config,
    ui: &mut dyn Interact,
    reporter: &Reporter,
) -> Result<()> {
    if cfg.harvest.access_token.is_some()
        && cfg.harvest.account_id.is_some()
        && cfg.harvest.project_id.is_some()
        && cfg.harvest.task_id.is_some()
    {
        reporter.info("Harvest is already configured");
        return Ok(());
    }

    reporter.info("Starting Harvest authentication...");
    let access_token = ui::prompt_secret("Enter your Harvest personal access token:")?;

    let http = reqwest::Client::new();
    let account_id = fetch_account_id(&http, &access_token).await?;
    let (project_id, task_id) =
        pick_project_and_task(&http, &access_token, account_id, ui).await?;

    cfg.harvest = HarvestConfig {
        access_token: Some(access_token),
        account_id: Some(account_id),
        project_id: Some(project_id),
        task_id: Some(task_id),
    };
    cfg.save()?;

    reporter.success("Harvest authentication completed successfully");
    Ok(())
}

/// First account on the token. Multi-account tokens are rare enough that the
/// original tool made the same choice.
async fn fetch_account_id(http: &reqwest::Client, access_token: &str) -> Result<u64> {
    const OP: &str = "fetch Harvest accounts";

    let response = http
        .get(ACCOUNTS_URL)
        .bearer_auth(access_token)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| Error::remote(OP, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::remote(OP, format!("HTTP {}", response.status())));
    }

    let data: AccountsResponse = response
        .json()
        .await
        .map_err(|e| Error::remote(OP, e.to_string()))?;

    data.accounts
        .first()
        .map(|a| a.id)
        .ok_or_else(|| Error::remote(OP, "no Harvest accounts found"))
}

async fn pick_project_and_task(
    http: &reqwest::Client,
    access_token: &str,
    account_id: u64,
    ui: &mut dyn Interact,
) -> Result<(u64, u64)> {
    const OP: &str = "fetch project assignments";

    let response = http
        .get(ASSIGNMENTS_URL)
        .bearer_auth(access_token)
        .header("Harvest-Account-ID", account_id.to_string())
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| Error::remote(OP, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::remote(OP, format!("HTTP {}", response.status())));
    }

    let data: AssignmentsResponse = response
        .json()
        .await
        .map_err(|e| Error::remote(OP, e.to_string()))?;

    if data.project_assignments.is_empty() {
        return Err(Error::remote(OP, "no projects found"));
    }

    let project_choices: Vec<Choice> = data
        .project_assignments
        .iter()
        .map(|a| Choice {
            label: a.project.name.clone(),
            value: a.project.id.to_string(),
        })
        .collect();
    let picked_project = ui.pick_one("Select a project:", &project_choices)?;

    let assignment = data
        .project_assignments
        .iter()
        .find(|a| a.project.id.to_string() == picked_project)
        .ok_or_else(|| Error::remote(OP, "selected project disappeared"))?;

    if assignment.task_assignments.is_empty() {
        return Err(Error::remote(OP, "no tasks found for selected project"));
    }

    let task_choices: Vec<Choice> = assignment
        .task_assignments
        .iter()
        .map(|t| Choice {
            label: t.task.name.clone(),
            value: t.task.id.to_string(),
        })
        .collect();
    let picked_task = ui.pick_one("Select a task:", &task_choices)?;

    let task = assignment
        .task_assignments
        .iter()
        .find(|t| t.task.id.to_string() == picked_task)
        .ok_or_else(|| Error::remote(OP, "selected task disappeared"))?;

    Ok((assignment.project.id, task.task.id))
}

// ═══════════════════════════════════════════════════════════════
// API Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct AssignmentsResponse {
    #[serde(default)]
    project_assignments: Vec<Assignment>,
}

#[derive(Debug, Deserialize)]
struct Assignment {
    project: Named,
    #[serde(default)]
    task_assignments: Vec<TaskAssignment>,
}

#[derive(Debug, Deserialize)]
struct TaskAssignment {
    task: Named,
}

#[derive(Debug, Deserialize)]
struct Named {
    id: u64,
    name: String,
}
