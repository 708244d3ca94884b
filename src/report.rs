//! User-facing status output
//!
//! Injected at the boundary; the core modules return structured results and
//! never print.

use crossterm::style::Stylize;

pub struct Reporter;

impl Reporter {
    pub fn info(&self, message: &str) {
        println!("{} {}", "timeport ℹ".blue(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "timeport ✓".green(), message);
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "timeport ⚠".yellow(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "timeport ✖".red(), message);
    }
}
