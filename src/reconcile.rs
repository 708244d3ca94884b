//! Timer lifecycle reconciliation
//!
//! The small state machine behind `tp start|update|stop`: read the remote
//! timer state fresh, solicit whatever decision is missing, compose notes,
//! issue the mutation. No printing here; callers report the returned Outcome.

use crate::error::Result;
use crate::harvest::TimerGateway;
use crate::jira::Issue;
use crate::notes::{self, JoinStyle};
use crate::ui::{Choice, Interact};

/// The user's requested operation on the timer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    Update,
    Stop,
}

impl Intent {
    pub fn parse(s: &str) -> Option<Intent> {
        match s {
            "start" => Some(Intent::Start),
            "update" => Some(Intent::Update),
            "stop" => Some(Intent::Stop),
            _ => None,
        }
    }
}

/// What the reconciler did, for boundary-level reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Started { with_notes: bool },
    Resumed,
    Updated,
    Stopped { with_notes: bool },
}

pub async fn run(
    intent: Intent,
    gateway: &dyn TimerGateway,
    ui: &mut dyn Interact,
    issues: &[Issue],
) -> Result<Outcome> {
    match intent {
        Intent::Start => start(gateway, ui, issues).await,
        Intent::Update => update(gateway, ui, issues).await,
        Intent::Stop => stop(gateway, ui, issues).await,
    }
}

/// Start flow: offer to resume the most recent same-day stopped entry, else
/// fall through to a fresh start with optional issue notes.
async fn start(
    gateway: &dyn TimerGateway,
    ui: &mut dyn Interact,
    issues: &[Issue],
) -> Result<Outcome> {
    let stopped = gateway.stopped_today().await?;
    if let Some(latest) = stopped.first() {
        if ui.confirm("Resume the timer you stopped earlier today?", true)? {
            gateway.restart(latest.id).await?;
            return Ok(Outcome::Resumed);
        }
    }

    let notes = if ui.confirm("Would you like to add Jira issues to the timer?", true)? {
        let selection = ui.pick_many("Select Jira issues:", &issue_choices(issues), &no_minimum)?;
        notes::compose(&selection, issues, JoinStyle::Selection)
    } else {
        String::new()
    };

    gateway.start(&notes).await?;
    Ok(Outcome::Started {
        with_notes: !notes.is_empty(),
    })
}

/// Update flow: at least one issue must be selected; the interaction layer
/// re-prompts until the validator passes, so no remote call happens for an
/// empty selection.
async fn update(
    gateway: &dyn TimerGateway,
    ui: &mut dyn Interact,
    issues: &[Issue],
) -> Result<Outcome> {
    let selection = ui.pick_many(
        "Select Jira issues to add to timer notes:",
        &issue_choices(issues),
        &at_least_one,
    )?;
    let notes = notes::compose(&selection, issues, JoinStyle::Selection);
    gateway.update(&notes).await?;
    Ok(Outcome::Updated)
}

/// Stop flow: optionally append final notes, then stop. An empty selection
/// means a plain stop, not an error.
async fn stop(
    gateway: &dyn TimerGateway,
    ui: &mut dyn Interact,
    issues: &[Issue],
) -> Result<Outcome> {
    let notes = if ui.confirm(
        "Would you like to add final notes before stopping the timer?",
        false,
    )? {
        let selection = ui.pick_many("Select Jira issues:", &issue_choices(issues), &no_minimum)?;
        notes::compose(&selection, issues, JoinStyle::Selection)
    } else {
        String::new()
    };

    let with_notes = !notes.is_empty();
    gateway
        .stop(if with_notes { Some(&notes) } else { None })
        .await?;
    Ok(Outcome::Stopped { with_notes })
}

fn issue_choices(issues: &[Issue]) -> Vec<Choice> {
    issues
        .iter()
        .map(|issue| Choice {
            label: issue.label.clone(),
            value: issue.key.clone(),
        })
        .collect()
}

pub fn at_least_one(selected: &[String]) -> std::result::Result<(), String> {
    if selected.is_empty() {
        Err("Please select at least one issue".into())
    } else {
        Ok(())
    }
}

pub fn no_minimum(_selected: &[String]) -> std::result::Result<(), String> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::harvest::Timer;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Records gateway mutations; update/stop refuse without a running timer
    /// before recording anything, like the real client.
    struct MockGateway {
        running: Option<Timer>,
        stopped: Vec<Timer>,
        calls: Mutex<Vec<String>>,
    }

    impl MockGateway {
        fn new(running: Option<Timer>, stopped: Vec<Timer>) -> Self {
            Self {
                running,
                stopped,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl TimerGateway for MockGateway {
        async fn running_timer(&self) -> Result<Option<Timer>> {
            Ok(self.running.clone())
        }

        async fn stopped_today(&self) -> Result<Vec<Timer>> {
            Ok(self.stopped.clone())
        }

        async fn start(&self, notes: &str) -> Result<()> {
            self.record(format!("start:{}", notes));
            Ok(())
        }

        async fn restart(&self, id: u64) -> Result<()> {
            self.record(format!("restart:{}", id));
            Ok(())
        }

        async fn update(&self, notes: &str) -> Result<()> {
            if self.running.is_none() {
                return Err(Error::NoRunningTimer);
            }
            self.record(format!("update:{}", notes));
            Ok(())
        }

        async fn stop(&self, notes: Option<&str>) -> Result<()> {
            if self.running.is_none() {
                return Err(Error::NoRunningTimer);
            }
            match notes {
                Some(n) => self.record(format!("stop+notes:{}", n)),
                None => self.record("stop".to_string()),
            }
            Ok(())
        }
    }

    /// Plays back canned answers, honouring the validator the same way the
    /// terminal implementation does: invalid answers are rejected and the
    /// next one is tried.
    struct ScriptedUi {
        confirms: VecDeque<bool>,
        selections: VecDeque<Vec<String>>,
        rejections: usize,
    }

    impl ScriptedUi {
        fn new(confirms: Vec<bool>, selections: Vec<Vec<String>>) -> Self {
            Self {
                confirms: confirms.into(),
                selections: selections.into(),
                rejections: 0,
            }
        }
    }

    impl Interact for ScriptedUi {
        fn confirm(&mut self, _prompt: &str, _default: bool) -> Result<bool> {
            Ok(self.confirms.pop_front().expect("unexpected confirm"))
        }

        fn pick_one(&mut self, _prompt: &str, _choices: &[Choice]) -> Result<String> {
            unreachable!("pick_one is not used by the reconciler")
        }

        fn pick_many(
            &mut self,
            _prompt: &str,
            _choices: &[Choice],
            validate: &dyn Fn(&[String]) -> std::result::Result<(), String>,
        ) -> Result<Vec<String>> {
            loop {
                let candidate = self.selections.pop_front().expect("unexpected selection");
                match validate(&candidate) {
                    Ok(()) => return Ok(candidate),
                    Err(_) => self.rejections += 1,
                }
            }
        }
    }

    fn issues() -> Vec<Issue> {
        vec![
            Issue {
                key: "AB-1".into(),
                label: "AB-1: Fix bug".into(),
            },
            Issue {
                key: "AB-2".into(),
                label: "AB-2: Add feature".into(),
            },
        ]
    }

    fn stopped_timer(id: u64) -> Timer {
        Timer {
            id,
            notes: "earlier work".into(),
            running: false,
        }
    }

    fn running_timer() -> Timer {
        Timer {
            id: 42,
            notes: "foo".into(),
            running: true,
        }
    }

    #[tokio::test]
    async fn test_start_resumes_most_recent_stopped_entry() {
        let gateway = MockGateway::new(None, vec![stopped_timer(7), stopped_timer(3)]);
        let mut ui = ScriptedUi::new(vec![true], vec![]);

        let outcome = run(Intent::Start, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Resumed);
        assert_eq!(gateway.calls(), vec!["restart:7"]);
    }

    #[tokio::test]
    async fn test_start_declined_resume_falls_through_to_issue_flow() {
        let gateway = MockGateway::new(None, vec![stopped_timer(7)]);
        let mut ui = ScriptedUi::new(vec![false, true], vec![vec!["AB-1".into()]]);

        let outcome = run(Intent::Start, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Started { with_notes: true });
        assert_eq!(gateway.calls(), vec!["start:AB-1: Fix bug"]);
    }

    #[tokio::test]
    async fn test_start_without_issues() {
        let gateway = MockGateway::new(None, vec![]);
        let mut ui = ScriptedUi::new(vec![false], vec![]);

        let outcome = run(Intent::Start, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Started { with_notes: false });
        assert_eq!(gateway.calls(), vec!["start:"]);
    }

    #[tokio::test]
    async fn test_start_allows_empty_selection() {
        let gateway = MockGateway::new(None, vec![]);
        let mut ui = ScriptedUi::new(vec![true], vec![vec![]]);

        let outcome = run(Intent::Start, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Started { with_notes: false });
        assert_eq!(gateway.calls(), vec!["start:"]);
    }

    #[tokio::test]
    async fn test_update_rejects_empty_selection_before_any_remote_call() {
        let gateway = MockGateway::new(Some(running_timer()), vec![]);
        let mut ui = ScriptedUi::new(vec![], vec![vec![], vec!["AB-2".into()]]);

        let outcome = run(Intent::Update, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Updated);
        assert_eq!(ui.rejections, 1);
        assert_eq!(gateway.calls(), vec!["update:AB-2: Add feature"]);
    }

    #[tokio::test]
    async fn test_update_without_running_timer_surfaces_no_running_timer() {
        let gateway = MockGateway::new(None, vec![]);
        let mut ui = ScriptedUi::new(vec![], vec![vec!["AB-1".into()]]);

        let err = run(Intent::Update, &gateway, &mut ui, &issues())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoRunningTimer));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_notes_skips_update_path() {
        let gateway = MockGateway::new(Some(running_timer()), vec![]);
        let mut ui = ScriptedUi::new(vec![false], vec![]);

        let outcome = run(Intent::Stop, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Stopped { with_notes: false });
        assert_eq!(gateway.calls(), vec!["stop"]);
    }

    #[tokio::test]
    async fn test_stop_with_notes_preserves_selection_order() {
        let gateway = MockGateway::new(Some(running_timer()), vec![]);
        let mut ui = ScriptedUi::new(
            vec![true],
            vec![vec!["AB-2".into(), "AB-1".into()]],
        );

        let outcome = run(Intent::Stop, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Stopped { with_notes: true });
        assert_eq!(
            gateway.calls(),
            vec!["stop+notes:AB-2: Add feature, AB-1: Fix bug"]
        );
    }

    #[tokio::test]
    async fn test_stop_with_empty_selection_stops_plainly() {
        let gateway = MockGateway::new(Some(running_timer()), vec![]);
        let mut ui = ScriptedUi::new(vec![true], vec![vec![]]);

        let outcome = run(Intent::Stop, &gateway, &mut ui, &issues()).await.unwrap();

        assert_eq!(outcome, Outcome::Stopped { with_notes: false });
        assert_eq!(gateway.calls(), vec!["stop"]);
    }

    #[tokio::test]
    async fn test_stop_without_running_timer_surfaces_no_running_timer() {
        let gateway = MockGateway::new(None, vec![]);
        let mut ui = ScriptedUi::new(vec![false], vec![]);

        let err = run(Intent::Stop, &gateway, &mut ui, &issues())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoRunningTimer));
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn test_intent_parse() {
        assert_eq!(Intent::parse("start"), Some(Intent::Start));
        assert_eq!(Intent::parse("update"), Some(Intent::Update));
        assert_eq!(Intent::parse("stop"), Some(Intent::Stop));
        assert_eq!(Intent::parse("restart"), None);
    }

    #[test]
    fn test_at_least_one_validator() {
        assert!(at_least_one(&[]).is_err());
        assert!(at_least_one(&["AB-1".to_string()]).is_ok());
        assert!(no_minimum(&[]).is_ok());
    }
}
