//! Terminal prompts and progress output

use std::cell::RefCell;
use std::time::Duration;

use console::{Emoji, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use kubero_provision::{
    Error, InstallSummary, PipelineResult, Prompter, Reporter, Result, StepOutcome,
};
use tera::Tera;

use crate::config::validate_domain;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");
static INFO: Emoji<'_, '_> = Emoji("💡 ", "i ");
static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

const SUMMARY_TEMPLATE: &str = include_str!("../templates/summary.txt.tera");

/// Interactive terminal front end for a run
#[derive(Default)]
pub struct TerminalUi {
    spinner: RefCell<Option<ProgressBar>>,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with the spinner (if any) hidden
    fn suspended<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.spinner.borrow().as_ref() {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }

    fn finish_spinner(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }
}

fn prompt_error(e: dialoguer::Error) -> Error {
    Error::prompt(e.to_string())
}

impl Prompter for TerminalUi {
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        self.suspended(|| {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(default)
                .interact()
                .map_err(prompt_error)
        })
    }

    fn input(&self, prompt: &str, default: &str) -> Result<String> {
        let asks_domain = prompt.to_lowercase().contains("domain");
        self.suspended(|| {
            let theme = ColorfulTheme::default();
            let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
            if !default.is_empty() {
                input = input.default(default.to_string());
            }
            if asks_domain {
                input = input.validate_with(|value: &String| -> std::result::Result<(), String> {
                    validate_domain(value).map_err(|e| e.to_string())
                });
            }
            input.interact_text().map_err(prompt_error)
        })
    }

    fn select(&self, prompt: &str, options: &[&str], default: usize) -> Result<usize> {
        self.suspended(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(options)
                .default(default)
                .interact()
                .map_err(prompt_error)
        })
    }
}

impl Reporter for TerminalUi {
    fn action_started(&self, _step: &str, description: &str) {
        self.finish_spinner();
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("{description}..."));
        spinner.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn waiting(&self, step: &str, probe: &str) {
        if let Some(spinner) = self.spinner.borrow().as_ref() {
            spinner.set_message(format!("{step}: waiting for {probe}"));
        }
    }

    fn step_finished(&self, step: &str, outcome: &StepOutcome) {
        self.finish_spinner();
        match outcome {
            StepOutcome::Skipped => {
                println!("{CHECK}{} {}", style(step).dim(), style("already installed").dim());
            }
            StepOutcome::Installed => println!("{CHECK}{}", style(step).green()),
            StepOutcome::Declined => println!("{SKIP}{} {}", step, style("skipped").yellow()),
            StepOutcome::Failed(failure) => {
                eprintln!("{CROSS}{} {}", style(step).red().bold(), failure);
            }
        }
    }

    fn info(&self, message: &str) {
        self.suspended(|| println!("  {message}"));
    }

    fn warn(&self, message: &str) {
        self.suspended(|| eprintln!("{INFO}{}", style(message).yellow()));
    }

    fn summary(&self, summary: &InstallSummary) {
        self.finish_spinner();
        match render_summary(summary) {
            Ok(text) => println!("{}", style(text).cyan()),
            Err(e) => {
                tracing::warn!(error = %e, "summary template failed");
                println!("\n{SPARKLE}Kubero is now installed");
            }
        }
    }
}

/// Closing message of a full run
pub fn render_summary(summary: &InstallSummary) -> std::result::Result<String, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template("summary", SUMMARY_TEMPLATE)?;

    let mut context = tera::Context::new();
    context.insert("url", &summary.url);
    context.insert("user", &summary.user);
    context.insert("password", &summary.password);

    tera.render("summary", &context)
}

/// Table of every step that ran and how it ended
pub fn print_results(result: &PipelineResult) {
    use comfy_table::{Cell, Color, Table, presets::UTF8_FULL_CONDENSED};

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Step").fg(Color::Cyan),
        Cell::new("Result").fg(Color::Cyan),
    ]);

    for (step, outcome) in &result.entries {
        let cell = match outcome {
            StepOutcome::Skipped => Cell::new("already installed").fg(Color::DarkGrey),
            StepOutcome::Installed => Cell::new("installed").fg(Color::Green),
            StepOutcome::Declined => Cell::new("skipped").fg(Color::Yellow),
            StepOutcome::Failed(failure) => Cell::new(failure.to_string()).fg(Color::Red),
        };
        table.add_row(vec![Cell::new(step), cell]);
    }

    println!("\n{table}");
}
