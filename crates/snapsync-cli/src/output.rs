//! Output formatting for the CLI.

use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use snapsync_core::ErrorBody;
use snapsync_worker::{RunState, WorkerSnapshot};
use std::fmt::Write;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// Print output in the specified format.
pub fn print<T: Serialize + HumanDisplay>(value: &T, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}", value.human_display()),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).expect("Failed to serialize to JSON")
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(value).expect("Failed to serialize to YAML")
            );
        }
    }
}

/// Print a list in the specified format.
pub fn print_list<T: Serialize + HumanDisplay>(values: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Human => {
            for value in values {
                println!("{}", value.human_display());
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(values).expect("Failed to serialize to JSON")
            );
        }
        OutputFormat::Yaml => {
            println!(
                "{}",
                serde_yaml::to_string(values).expect("Failed to serialize to YAML")
            );
        }
    }
}

/// Structured form of a success message.
#[derive(Debug, Serialize)]
struct Success<'a> {
    status: &'static str,
    message: &'a str,
}

/// Print a success message.
pub fn print_success(message: &str, format: OutputFormat) {
    println!("{}", render_success(message, format));
}

fn render_success(message: &str, format: OutputFormat) -> String {
    let success = Success {
        status: "ok",
        message,
    };
    match format {
        OutputFormat::Human => message.to_string(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&success).expect("Failed to serialize to JSON")
        }
        OutputFormat::Yaml => serde_yaml::to_string(&success).expect("Failed to serialize to YAML"),
    }
}

/// Trait for human-readable display.
pub trait HumanDisplay {
    fn human_display(&self) -> String;
}

impl HumanDisplay for ErrorBody {
    fn human_display(&self) -> String {
        let mut out = format!("{} {}", style(format!("[{}]", self.code)).red(), self.message);
        if self.data.as_object().is_some_and(|d| !d.is_empty()) {
            write!(out, "\n  data: {}", self.data).unwrap();
        }
        out
    }
}

impl HumanDisplay for WorkerSnapshot {
    fn human_display(&self) -> String {
        let mut out = String::new();

        let state = match self.state {
            RunState::Running => style(self.state.to_string()).green(),
            RunState::Stopped => style(self.state.to_string()).dim(),
            RunState::NotStarted => style(self.state.to_string()).yellow(),
        };

        writeln!(out, "Worker:      {}", self.name).unwrap();
        writeln!(out, "State:       {state}").unwrap();
        writeln!(out, "Iterations:  {}", self.iterations).unwrap();

        match (&self.last_error, &self.last_error_at) {
            (Some(body), Some(at)) => {
                writeln!(out, "Last error:  {}", format_time(at)).unwrap();
                writeln!(out, "  {}", body.human_display()).unwrap();
            }
            (Some(body), None) => {
                writeln!(out, "Last error:  {}", body.human_display()).unwrap();
            }
            (None, _) => writeln!(out, "Last error:  -").unwrap(),
        }

        out
    }
}

/// One row of the error code listing.
#[derive(Debug, Serialize)]
pub struct CodeRow {
    pub code: &'static str,
}

impl HumanDisplay for CodeRow {
    fn human_display(&self) -> String {
        self.code.to_string()
    }
}

fn format_time(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
