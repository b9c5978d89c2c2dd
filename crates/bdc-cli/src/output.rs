//! Output layer: pretty, text and JSON renderings of stage reports and
//! errors.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / hidden `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` in the project config
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use bdc_core::{PipelineError, StageReport};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 56;

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized table with a rule under the header.
    Pretty,
    /// Whitespace-separated rows for scripts and pipes.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    /// Returns `true` if JSON output was requested.
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Parse a mode name as written in `FORMAT` or the config file.
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" | "table" => Some(Self::Text),
            "pretty" | "human" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Core resolution logic, separated from I/O for testability.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    config_output: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    if json_flag {
        return OutputMode::Json;
    }
    if let Some(mode) = format_env.and_then(OutputMode::from_name) {
        return mode;
    }
    if let Some(mode) = config_output.and_then(OutputMode::from_name) {
        return mode;
    }
    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Resolve the output mode from CLI flags, environment, config and TTY
/// defaults.
pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    config_output: Option<&str>,
) -> OutputMode {
    let env_val = std::env::var("FORMAT").ok();
    let is_tty = io::stdout().is_terminal();
    resolve_output_mode_inner(
        format_flag,
        json_flag,
        env_val.as_deref(),
        config_output,
        is_tty,
    )
}

/// Write stage reports in the requested mode.
///
/// JSON is a single object for one report and an array otherwise.
///
/// # Errors
///
/// Returns an error if writing or serializing fails.
pub fn write_reports(
    w: &mut dyn Write,
    mode: OutputMode,
    reports: &[StageReport],
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            if let [report] = reports {
                serde_json::to_writer_pretty(&mut *w, report)?;
            } else {
                serde_json::to_writer_pretty(&mut *w, reports)?;
            }
            writeln!(w)?;
        }
        OutputMode::Text => {
            writeln!(w, "stage  completed  skipped  rows")?;
            for report in reports {
                writeln!(
                    w,
                    "{}  {}  {}  {}",
                    report.stage, report.completed, report.skipped, report.rows
                )?;
            }
        }
        OutputMode::Pretty => {
            writeln!(
                w,
                "{:<26}{:>10}{:>10}{:>10}",
                "Stage", "Completed", "Skipped", "Rows"
            )?;
            writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)?;
            for report in reports {
                writeln!(
                    w,
                    "{:<26}{:>10}{:>10}{:>10}",
                    report.stage.name(),
                    report.completed,
                    report.skipped,
                    report.rows
                )?;
            }
        }
    }
    Ok(())
}

/// Render stage reports to stdout.
///
/// # Errors
///
/// Returns an error if writing to stdout fails.
pub fn render_reports(mode: OutputMode, reports: &[StageReport]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_reports(&mut out, mode, reports)
}

/// A structured error with optional hint and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message, including context.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Machine-readable error code (`E####`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        let cause = err.downcast_ref::<PipelineError>();
        Self {
            message: format!("{err:#}"),
            hint: cause.and_then(PipelineError::hint).map(str::to_string),
            error_code: cause.map(|cause| cause.code().code().to_string()),
        }
    }
}

/// Write an error in the requested mode.
///
/// # Errors
///
/// Returns an error if writing or serializing fails.
pub fn write_error(w: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *w, &wrapper)?;
            writeln!(w)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(w, "error[{code}]: {}", error.message)?,
                None => writeln!(w, "error: {}", error.message)?,
            }
            if let Some(hint) = &error.hint {
                writeln!(w, "  hint: {hint}")?;
            }
        }
    }
    Ok(())
}

/// Render an error to stderr.
///
/// # Errors
///
/// Returns an error if writing to stderr fails.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}
