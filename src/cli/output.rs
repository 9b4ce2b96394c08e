//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::manifest::ManifestBundle;
use crate::orchestrator::{BundleOutcome, PlanState};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Bundle row for table display.
#[derive(Tabled)]
struct BundleRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Files")]
    files: usize,
    #[tabled(rename = "Manifests")]
    manifests: String,
}

/// Applied bundle row for table display.
#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
    #[tabled(rename = "Bundle")]
    bundle: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats discovered bundles.
    #[must_use]
    pub fn format_bundles(&self, bundles: &[ManifestBundle]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(bundles).unwrap_or_default(),
            OutputFormat::Text => Self::format_bundles_text(bundles),
        }
    }

    fn format_bundles_text(bundles: &[ManifestBundle]) -> String {
        if bundles.is_empty() {
            return format!("{} No manifests found.\n", "!".yellow());
        }

        let rows: Vec<BundleRow> = bundles
            .iter()
            .enumerate()
            .map(|(i, b)| BundleRow {
                index: i + 1,
                kind: Self::format_kind(b.is_local()),
                files: b.len(),
                manifests: b
                    .manifests()
                    .iter()
                    .map(|m| m.path().display().to_string())
                    .collect::<Vec<_>>()
                    .join("\n"),
            })
            .collect();

        let local = bundles.iter().filter(|b| b.is_local()).count();
        let mut output = Table::new(rows).to_string();
        let _ = write!(
            output,
            "\n\n{} bundle(s): {} local, {} remote\n",
            bundles.len(),
            local.to_string().cyan(),
            (bundles.len() - local).to_string().blue()
        );
        output
    }

    /// Formats the outcome of an apply.
    #[must_use]
    pub fn format_state(&self, state: &PlanState) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&state.summary()).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_state_text(state),
        }
    }

    fn format_state_text(state: &PlanState) -> String {
        let mut output = String::new();
        let _ = write!(
            output,
            "\nRun {}\n   Manifests: {}\n   Digest: {}\n\n",
            state.run_id(),
            state.manifest_dir().display(),
            &state.digest()[..state.digest().len().min(12)]
        );

        let rows: Vec<ReportRow> = state
            .bundles()
            .iter()
            .enumerate()
            .map(|(i, r)| ReportRow {
                index: i + 1,
                action: r.action.to_string(),
                outcome: match r.outcome {
                    BundleOutcome::Applied => "applied".green().to_string(),
                    BundleOutcome::Continued => "failed, continued".yellow().to_string(),
                },
                bundle: Self::truncate(&r.bundle, 60),
            })
            .collect();
        if !rows.is_empty() {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if state.is_clean() {
            let _ = write!(
                output,
                "\n{} Applied {} bundle(s)\n",
                "✓".green(),
                state.bundles().len()
            );
        } else {
            let _ = write!(output, "\n{} Continued failures:\n", "⚠".yellow());
            for err in state.continued_errors() {
                let _ = writeln!(output, "   - {err}");
            }
        }
        output
    }

    /// Formats a configuration validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": if show_warnings { result.warnings.clone() } else { Vec::new() },
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid\n", "✓".green())
                } else {
                    format!("{} Configuration is invalid:\n", "✗".red())
                };
                for err in &result.errors {
                    let _ = writeln!(output, "   - {err}");
                }
                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats a single computed value, such as an id.
    #[must_use]
    pub fn format_value(&self, key: &str, value: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let mut json = serde_json::Map::new();
                json.insert(key.to_string(), serde_json::Value::from(value));
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => value.to_string(),
        }
    }

    fn format_kind(local: bool) -> String {
        if local {
            "local".cyan().to_string()
        } else {
            "remote".blue().to_string()
        }
    }

    /// Truncates a string to a maximum number of characters, keeping the end.
    fn truncate(s: &str, max_len: usize) -> String {
        let count = s.chars().count();
        if count <= max_len {
            s.to_string()
        } else {
            let tail: String = s.chars().skip(count - (max_len - 3)).collect();
            format!("...{tail}")
        }
    }
}
