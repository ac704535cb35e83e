//! Terminal output: themed status lines, the sender preview and spinners.

use crate::actions::ActionSummary;
use crate::scanner::format_preview_date;
use indicatif::{ProgressBar, ProgressStyle};
use shared_types::{PromoSender, Theme};
use std::future::Future;
use std::time::Duration;

const RESET: &str = "\x1b[0m";
const RULE_WIDTH: usize = 60;

/// ANSI colour codes for one theme. `plain` leaves every code empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: &'static str,
    pub highlight: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub muted: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                accent: "\x1b[36m",
                highlight: "\x1b[33m",
                success: "\x1b[32m",
                warning: "\x1b[33m",
                error: "\x1b[31m",
                muted: "\x1b[90m",
                reset: RESET,
            },
            Theme::Light => Self {
                accent: "\x1b[34m",
                highlight: "\x1b[35m",
                success: "\x1b[32m",
                warning: "\x1b[33m",
                error: "\x1b[31m",
                muted: "\x1b[2m",
                reset: RESET,
            },
            Theme::Plain => Self {
                accent: "",
                highlight: "",
                success: "",
                warning: "",
                error: "",
                muted: "",
                reset: "",
            },
        }
    }

    pub fn is_plain(&self) -> bool {
        self.reset.is_empty()
    }

    fn paint(&self, color: &str, text: &str) -> String {
        format!("{}{}{}", color, text, self.reset)
    }
}

/// Something `with_spinner` can judge as empty
pub trait Outcome {
    fn is_empty_outcome(&self) -> bool;
}

impl<T> Outcome for Vec<T> {
    fn is_empty_outcome(&self) -> bool {
        self.is_empty()
    }
}

impl Outcome for ActionSummary {
    fn is_empty_outcome(&self) -> bool {
        self.outcomes.is_empty()
    }
}

pub struct Printer {
    palette: Palette,
}

impl Printer {
    pub fn new(theme: Theme) -> Self {
        Self {
            palette: Palette::for_theme(theme),
        }
    }

    pub fn info(&self, message: &str) {
        println!("    {}", self.palette.paint(self.palette.accent, message));
    }

    pub fn success(&self, message: &str) {
        println!("    {}", self.palette.paint(self.palette.success, message));
    }

    pub fn warning(&self, message: &str) {
        println!("    {}", self.palette.paint(self.palette.warning, message));
    }

    pub fn error(&self, message: &str) {
        eprintln!("    {}", self.palette.paint(self.palette.error, message));
    }

    pub fn muted(&self, message: &str) {
        println!("    {}", self.palette.paint(self.palette.muted, message));
    }

    pub fn banner(&self) {
        let p = &self.palette;
        println!();
        println!("    {}╔══════════════════════════════════════════╗", p.accent);
        println!("    ║       GMAIL UNSUBSCRIBER & CLEANER       ║");
        println!("    ╚══════════════════════════════════════════╝{}", p.reset);
        println!();
    }

    /// Numbered list of senders, one block per sender
    pub fn preview(&self, senders: &[PromoSender]) {
        println!("\n=== Preview of Promotional Emails ===\n");
        for (i, sender) in senders.iter().enumerate() {
            println!("{}", preview_block(&self.palette, i + 1, sender));
        }
    }

    pub fn summary(&self, summary: &ActionSummary, dry_run: bool) {
        for outcome in &summary.outcomes {
            if let Some(result) = &outcome.unsubscribe {
                let line = format!("{}: {}", outcome.sender, result.message);
                if result.success {
                    self.success(&line);
                } else if result.status.is_failure() {
                    self.warning(&line);
                } else {
                    self.info(&line);
                }
            }
            if let Some(report) = &outcome.delete {
                if report.success {
                    self.success(&report.message);
                } else {
                    self.warning(&report.message);
                }
                for error in &report.errors {
                    self.muted(error);
                }
            }
            for error in &outcome.errors {
                self.error(error);
            }
        }

        println!();
        if dry_run {
            self.warning("Dry run: nothing was changed.");
        }
        self.info(&format!(
            "Unsubscribed from {} sender(s), deleted {} message(s).",
            summary.unsubscribed, summary.deleted
        ));
    }

    /// Run `future` under a spinner and report how it went
    pub async fn with_spinner<T, F>(&self, message: &str, future: F) -> anyhow::Result<T>
    where
        F: Future<Output = anyhow::Result<T>>,
        T: Outcome,
    {
        let spinner = self.spinner(message);
        let result = future.await;
        spinner.finish_and_clear();

        match &result {
            Ok(value) if value.is_empty_outcome() => {
                self.warning(&format!("⚠ {} completed with no results.", message))
            }
            Ok(_) => self.success(&format!("✓ {} completed successfully!", message)),
            Err(e) => {
                tracing::error!("Error during {}: {:#}", message.to_lowercase(), e);
                self.error(&format!("✗ Error during {}: {}", message.to_lowercase(), e));
            }
        }

        result
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let template = if self.palette.is_plain() {
            "    {spinner} {msg}"
        } else {
            "    {spinner:.cyan} {msg}"
        };
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template(template) {
            bar.set_style(style);
        }
        bar.set_message(format!("{}...", message));
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

fn preview_block(palette: &Palette, index: usize, sender: &PromoSender) -> String {
    let date = sender
        .date
        .as_deref()
        .map(format_preview_date)
        .unwrap_or_else(|| "Date not available".to_string());

    format!(
        "[{}] {} | {}\n    {} | {}\n{}",
        index,
        palette.paint(palette.accent, &sender.sender_display),
        sender.subject,
        palette.paint(palette.highlight, &date),
        sender.sender_email,
        "-".repeat(RULE_WIDTH)
    )
}
