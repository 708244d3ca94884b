//! Interactive terminal prompts
//!
//! Confirmations in raw mode, ratatui pickers for single/multi selection
//! with fuzzy filtering, masked input for secrets. The reconciler only sees
//! the `Interact` trait; everything terminal-specific lives here.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io::{self, Write};
use std::time::Duration;

use crate::error::{Error, Result};

/// One selectable option: display text plus the value handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub value: String,
}

/// Boundary for obtaining user choices. The CLI backs this with terminal
/// prompts; tests script it.
pub trait Interact {
    /// Yes/no question with a default taken on plain Enter.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Single selection; returns the chosen value.
    fn pick_one(&mut self, prompt: &str, choices: &[Choice]) -> Result<String>;

    /// Multi selection in toggle order. `validate` rejecting the selection
    /// re-prompts instead of failing the command.
    fn pick_many(
        &mut self,
        prompt: &str,
        choices: &[Choice],
        validate: &dyn Fn(&[String]) -> std::result::Result<(), String>,
    ) -> Result<Vec<String>>;
}

/// Terminal-backed implementation of [`Interact`].
pub struct TermUi;

impl Interact for TermUi {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        print!("{} {} ", prompt, suffix);
        io::stdout().flush()?;

        enable_raw_mode()?;
        let answer = loop {
            if !event::poll(Duration::from_millis(100))? {
                continue;
            }
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match k.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => break Ok(true),
                    KeyCode::Char('n') | KeyCode::Char('N') => break Ok(false),
                    KeyCode::Enter => break Ok(default),
                    KeyCode::Esc => break Err(Error::Cancelled),
                    KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                        break Err(Error::Cancelled)
                    }
                    _ => {}
                }
            }
        };
        disable_raw_mode()?;

        match answer {
            Ok(value) => {
                println!("{}", if value { "yes" } else { "no" });
                Ok(value)
            }
            Err(e) => {
                println!();
                Err(e)
            }
        }
    }

    fn pick_one(&mut self, prompt: &str, choices: &[Choice]) -> Result<String> {
        let mut terminal = setup_terminal()?;
        let result = run_picker(&mut terminal, prompt, choices, false, &|_| Ok(()));
        restore_terminal(terminal)?;
        let mut values = result?;
        values.pop().ok_or_else(|| {
            Error::Terminal(io::Error::new(
                io::ErrorKind::Other,
                "empty selection from single picker",
            ))
        })
    }

    fn pick_many(
        &mut self,
        prompt: &str,
        choices: &[Choice],
        validate: &dyn Fn(&[String]) -> std::result::Result<(), String>,
    ) -> Result<Vec<String>> {
        let mut terminal = setup_terminal()?;
        let result = run_picker(&mut terminal, prompt, choices, true, validate);
        restore_terminal(terminal)?;
        result
    }
}

// ═══════════════════════════════════════════════════════════════
// PICKER
// ═══════════════════════════════════════════════════════════════

fn run_picker(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    prompt: &str,
    choices: &[Choice],
    multi: bool,
    validate: &dyn Fn(&[String]) -> std::result::Result<(), String>,
) -> Result<Vec<String>> {
    let matcher = SkimMatcherV2::default();
    let mut filter = String::new();
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    // Indices into `choices`, in the order the user toggled them
    let mut picked: Vec<usize> = Vec::new();
    let mut error_line: Option<String> = None;

    loop {
        let filtered = fuzzy_filter(&matcher, choices, &filter);

        // Clamp selection
        if let Some(selected) = list_state.selected() {
            if selected >= filtered.len() {
                list_state.select(Some(filtered.len().saturating_sub(1)));
            }
        }

        // Render
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(5),
                    Constraint::Length(1),
                ])
                .split(f.size());

            let input = Paragraph::new(filter.as_str())
                .block(Block::default().borders(Borders::ALL).title("Filter"));
            f.render_widget(input, chunks[0]);

            let items: Vec<ListItem> = filtered
                .iter()
                .map(|&idx| {
                    let label = choices[idx].label.as_str();
                    if multi {
                        let mark = if picked.contains(&idx) { "[x]" } else { "[ ]" };
                        ListItem::new(format!("{} {}", mark, label))
                    } else {
                        ListItem::new(label.to_string())
                    }
                })
                .collect();

            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title(format!(
                    "{} ({}/{})",
                    prompt,
                    filtered.len(),
                    choices.len()
                )))
                .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
                .highlight_symbol("> ");
            f.render_stateful_widget(list, chunks[1], &mut list_state);

            let footer = match &error_line {
                Some(message) => {
                    Paragraph::new(message.as_str()).style(Style::default().fg(Color::Red))
                }
                None => {
                    let help = if multi {
                        "Space: toggle | Enter: confirm | Esc: cancel | Type to filter"
                    } else {
                        "Enter: select | Esc: cancel | Type to filter"
                    };
                    Paragraph::new(help).style(Style::default().fg(Color::DarkGray))
                }
            };
            f.render_widget(footer, chunks[2]);
        })?;

        // Handle input
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match key.code {
                    KeyCode::Esc => return Err(Error::Cancelled),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Err(Error::Cancelled)
                    }
                    KeyCode::Enter => {
                        if multi {
                            let values: Vec<String> =
                                picked.iter().map(|&i| choices[i].value.clone()).collect();
                            match validate(&values) {
                                Ok(()) => return Ok(values),
                                Err(message) => error_line = Some(message),
                            }
                        } else if let Some(idx) = list_state.selected() {
                            if let Some(&choice_idx) = filtered.get(idx) {
                                return Ok(vec![choices[choice_idx].value.clone()]);
                            }
                        }
                    }
                    KeyCode::Char(' ') if multi => {
                        if let Some(idx) = list_state.selected() {
                            if let Some(&choice_idx) = filtered.get(idx) {
                                match picked.iter().position(|&i| i == choice_idx) {
                                    Some(pos) => {
                                        picked.remove(pos);
                                    }
                                    None => picked.push(choice_idx),
                                }
                                error_line = None;
                            }
                        }
                    }
                    KeyCode::Up => {
                        let i = list_state.selected().unwrap_or(0);
                        list_state.select(Some(i.saturating_sub(1)));
                    }
                    KeyCode::Down => {
                        let i = list_state.selected().unwrap_or(0);
                        list_state.select(Some((i + 1).min(filtered.len().saturating_sub(1))));
                    }
                    KeyCode::Char(c) => {
                        filter.push(c);
                        list_state.select(Some(0));
                        error_line = None;
                    }
                    KeyCode::Backspace => {
                        filter.pop();
                        list_state.select(Some(0));
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Indices into `choices` matching `filter`, best score first; everything in
/// original order when the filter is empty.
fn fuzzy_filter(matcher: &SkimMatcherV2, choices: &[Choice], filter: &str) -> Vec<usize> {
    if filter.is_empty() {
        return (0..choices.len()).collect();
    }
    let mut scored: Vec<(usize, i64)> = choices
        .iter()
        .enumerate()
        .filter_map(|(i, c)| matcher.fuzzy_match(&c.label, filter).map(|score| (i, score)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(i, _)| i).collect()
}

// ═══════════════════════════════════════════════════════════════
// SECRET PROMPT
// ═══════════════════════════════════════════════════════════════

/// Prompt for a secret with masked input.
pub fn prompt_secret(prompt: &str) -> Result<String> {
    print!("{} ", prompt);
    io::stdout().flush()?;

    enable_raw_mode()?;
    let mut secret = String::new();

    let outcome = loop {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        if let Event::Key(k) = event::read()? {
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match k.code {
                KeyCode::Enter => break Ok(()),
                KeyCode::Char(c) => {
                    secret.push(c);
                    print!("*");
                    io::stdout().flush()?;
                }
                KeyCode::Backspace => {
                    if secret.pop().is_some() {
                        print!("\x08 \x08");
                        io::stdout().flush()?;
                    }
                }
                KeyCode::Esc => break Err(Error::Cancelled),
                _ => {}
            }
        }
    };

    disable_raw_mode()?;
    println!();
    outcome?;

    if secret.is_empty() {
        return Err(Error::Cancelled);
    }
    Ok(secret)
}

// ═══════════════════════════════════════════════════════════════
// TERMINAL SETUP
// ═══════════════════════════════════════════════════════════════

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
