//! tp - TimePort: bridge between Jira and Harvest time tracking
//!
//! USAGE:
//!   tp                        # interactive: pick an action
//!   tp start                  # start a timer (offers resuming today's stopped one)
//!   tp update                 # add issues to the running timer's notes
//!   tp stop                   # stop the running timer
//!   tp auth                   # set up Harvest credentials
//!   tp doctor                 # check config, credentials, connectivity
//!   tp config set <key> <v>   # non-interactive config

mod auth;
mod config;
mod error;
mod harvest;
mod jira;
mod notes;
mod reconcile;
mod report;
mod ui;

use anyhow::Result;

use crate::config::Config;
use crate::harvest::{HarvestClient, TimerGateway};
use crate::jira::JiraClient;
use crate::reconcile::{Intent, Outcome};
use crate::report::Reporter;
use crate::ui::{Choice, Interact, TermUi};

// ═══════════════════════════════════════════════════════════════
// CLI
// ═══════════════════════════════════════════════════════════════

#[derive(Debug)]
enum Command {
    /// Timer command; `None` asks interactively which one.
    Timer(Option<Intent>),
    Auth,
    Doctor,
    ConfigSet { key: String, value: String },
    Help,
    Version,
}

fn parse_args() -> Command {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() {
        return Command::Timer(None);
    }

    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Command::Help;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        return Command::Version;
    }

    match args[0].as_str() {
        "start" | "update" | "stop" => Command::Timer(Intent::parse(&args[0])),
        "auth" => Command::Auth,
        "doctor" => Command::Doctor,
        "config" if args.get(1).map(|s| s.as_str()) == Some("set") => Command::ConfigSet {
            key: args.get(2).cloned().unwrap_or_default(),
            value: args.get(3).cloned().unwrap_or_default(),
        },
        _ => Command::Help,
    }
}

fn print_help() {
    println!(
        r#"tp - bridge between Jira and Harvest time tracking

USAGE:
    tp                        # interactive: pick an action
    tp start                  # start a timer (offers resuming today's stopped one)
    tp update                 # add Jira issues to the running timer's notes
    tp stop                   # stop the running timer
    tp auth                   # set up Harvest credentials
    tp doctor                 # check config, credentials, connectivity
    tp config set <key> <v>   # set a config value

CONFIG KEYS:
    jira.base_url, jira.username, jira.api_token,
    harvest.access_token, harvest.account_id,
    harvest.project_id, harvest.task_id

CONFIG:
    ~/.config/timeport/config.json

ENVIRONMENT:
    JIRA_API_TOKEN            Override Jira token from config
    HARVEST_ACCESS_TOKEN      Override Harvest token from config
"#
    );
}

// ═══════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() {
    let reporter = Reporter;

    if let Err(e) = run(&reporter).await {
        reporter.error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(reporter: &Reporter) -> Result<()> {
    match parse_args() {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Version => {
            println!("tp {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::ConfigSet { key, value } => run_config_set(&key, &value, reporter),
        Command::Auth => run_auth(reporter).await,
        Command::Doctor => run_doctor().await,
        Command::Timer(intent) => run_timer(intent, reporter).await,
    }
}

// ═══════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════

async fn run_timer(intent: Option<Intent>, reporter: &Reporter) -> Result<()> {
    let cfg = Config::load()?;
    cfg.validate()?;

    let mut term = TermUi;
    let intent = match intent {
        Some(intent) => intent,
        None => pick_intent(&mut term)?,
    };

    let jira = JiraClient::new(&cfg.jira);
    let harvest = HarvestClient::from_config(&cfg.harvest)?;

    let issues = jira.fetch_user_issues().await?;
    if issues.is_empty() {
        if intent == Intent::Update {
            anyhow::bail!("no open Jira issues assigned to you; nothing to add to the timer");
        }
        reporter.warn("No open Jira issues assigned to you");
    }

    let outcome = reconcile::run(intent, &harvest, &mut term, &issues).await?;
    match outcome {
        Outcome::Started { .. } => reporter.success("Timer started successfully"),
        Outcome::Resumed => reporter.success("Timer resumed successfully"),
        Outcome::Updated => reporter.success("Timer notes updated successfully"),
        Outcome::Stopped { .. } => reporter.success("Timer stopped successfully"),
    }
    Ok(())
}

fn pick_intent(term: &mut TermUi) -> Result<Intent> {
    let choices = vec![
        Choice {
            label: "Start new timer".into(),
            value: "start".into(),
        },
        Choice {
            label: "Update running timer notes".into(),
            value: "update".into(),
        },
        Choice {
            label: "Stop running timer".into(),
            value: "stop".into(),
        },
    ];
    let picked = term.pick_one("What would you like to do?", &choices)?;
    Intent::parse(&picked).ok_or_else(|| anyhow::anyhow!("unknown action: {}", picked))
}

async fn run_auth(reporter: &Reporter) -> Result<()> {
    let mut cfg = Config::load()?;
    let mut term = TermUi;
    auth::authenticate(&mut cfg, &mut term, reporter).await?;
    Ok(())
}

async fn run_doctor() -> Result<()> {
    println!("tp doctor\n");

    let path = config::config_path()?;
    let cfg = Config::load()?;
    println!(
        "[{}] Config: {}",
        if path.exists() { "✓" } else { "✗" },
        path.display()
    );

    let missing = cfg.missing_values();
    if missing.is_empty() {
        println!("[✓] Credentials: complete");
    } else {
        println!("[✗] Credentials: missing {}", missing.join(", "));
    }

    if cfg.jira.base_url.is_empty() || cfg.jira.username.is_empty() || cfg.jira.api_token.is_empty()
    {
        println!("[✗] Jira: not configured");
    } else {
        let jira = JiraClient::new(&cfg.jira);
        match jira.check_connection().await {
            Ok(()) => println!("[✓] Jira: connected"),
            Err(e) => println!("[✗] Jira: {}", e),
        }
    }

    match HarvestClient::from_config(&cfg.harvest) {
        Err(_) => println!("[✗] Harvest: not configured (run `tp auth`)"),
        Ok(harvest) => {
            match harvest.check_connection().await {
                Ok(()) => println!("[✓] Harvest: connected"),
                Err(e) => println!("[✗] Harvest: {}", e),
            }
            match harvest.running_timer().await {
                Ok(Some(timer)) => {
                    let notes = if timer.notes.is_empty() {
                        "no notes".to_string()
                    } else {
                        timer.notes
                    };
                    println!("[✓] Timer: running ({})", notes);
                }
                Ok(None) => println!("[-] Timer: none running"),
                Err(e) => println!("[✗] Timer: {}", e),
            }
        }
    }

    Ok(())
}

fn run_config_set(key: &str, value: &str, reporter: &Reporter) -> Result<()> {
    let mut cfg = Config::load()?;

    match key {
        "jira.base_url" => cfg.jira.base_url = value.to_string(),
        "jira.username" => cfg.jira.username = value.to_string(),
        "jira.api_token" => cfg.jira.api_token = value.to_string(),
        "harvest.access_token" => cfg.harvest.access_token = Some(value.to_string()),
        "harvest.account_id" => cfg.harvest.account_id = Some(parse_id(key, value)?),
        "harvest.project_id" => cfg.harvest.project_id = Some(parse_id(key, value)?),
        "harvest.task_id" => cfg.harvest.task_id = Some(parse_id(key, value)?),
        _ => anyhow::bail!(
            "unknown config key: {}. Run `tp --help` for the list of keys",
            key
        ),
    }

    cfg.save()?;
    reporter.success(&format!("{} saved to {}", key, config::config_path()?.display()));
    Ok(())
}

fn parse_id(key: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("{} must be a numeric id, got {:?}", key, value))
}
