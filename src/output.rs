//! Command reports for the terminal and the `--json` envelope.
//!
//! Every command builds one [`HumanOutput`]. In JSON mode the command's data
//! goes out inside a `taskdeck.v1` envelope; commands that ran against a
//! session also attach the undo/redo depth they left behind.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};
use crate::history::History;

pub const SCHEMA_VERSION: &str = "taskdeck.v1";

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

/// Undo/redo depth after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryDepth {
    pub undo: usize,
    pub redo: usize,
    pub capacity: usize,
}

impl From<&History> for HistoryDepth {
    fn from(history: &History) -> Self {
        Self {
            undo: history.past_len(),
            redo: history.future_len(),
            capacity: history.capacity(),
        }
    }
}

impl fmt::Display for HistoryDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "undo {}/{}, redo {}", self.undo, self.capacity, self.redo)
    }
}

/// Terminal rendering of one command's result.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    fields: Vec<(String, String)>,
    lines: Vec<String>,
    warnings: Vec<String>,
    hints: Vec<String>,
    history: Option<HistoryDepth>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            fields: Vec::new(),
            lines: Vec::new(),
            warnings: Vec::new(),
            hints: Vec::new(),
            history: None,
        }
    }

    /// `key: value` row under the header.
    pub fn field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.push((key.into(), value.into()));
    }

    /// Free-form body line, e.g. one task.
    pub fn line(&mut self, value: impl Into<String>) {
        self.lines.push(value.into());
    }

    pub fn warn(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    /// Suggested follow-up command.
    pub fn hint(&mut self, value: impl Into<String>) {
        self.hints.push(value.into());
    }

    pub fn history(&mut self, depth: HistoryDepth) {
        self.history = Some(depth);
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        for (key, value) in &self.fields {
            if value.is_empty() {
                write!(f, "\n  {key}")?;
            } else {
                write!(f, "\n  {key}: {value}")?;
            }
        }
        for line in &self.lines {
            write!(f, "\n  {line}")?;
        }
        for warning in &self.warnings {
            write!(f, "\nwarning: {warning}")?;
        }
        if let Some(depth) = self.history {
            write!(f, "\nhistory: {depth}")?;
        }
        for hint in &self.hints {
            write!(f, "\nnext: {hint}")?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SuccessEnvelope<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    data: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    history: Option<HistoryDepth>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    schema_version: &'static str,
    command: &'a str,
    status: &'static str,
    error: ErrorBody<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<String>,
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: &HumanOutput,
) -> Result<()> {
    if options.json {
        let payload = SuccessEnvelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            history: human.history,
            warnings: human.warnings.clone(),
            next_steps: human.hints.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !options.quiet {
        println!("{human}");
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if !json {
        eprintln!("error: {err}");
        if let Some(hint) = next_steps.first() {
            eprintln!("hint: {hint}");
        }
        return Ok(());
    }

    let message = err.to_string();
    let payload = ErrorEnvelope {
        schema_version: SCHEMA_VERSION,
        command,
        status: "error",
        error: ErrorBody {
            message: &message,
            code: err.exit_code(),
            kind: error_kind(err),
            details: err.details(),
        },
        next_steps,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// First positional argument, skipping global flags and their values.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if matches!(arg.as_str(), "--data-dir" | "--config") {
            args.next();
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        return arg;
    }
    "taskdeck".to_string()
}

pub fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::Validation(_) => "validation",
        Error::TaskNotFound(_) => "not_found",
        _ if err.exit_code() == exit_codes::USER_ERROR => "user_error",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["taskdeck list".to_string()],
        Error::InvalidConfig(_) | Error::TomlParse(_) => {
            vec!["fix taskdeck.toml then retry".to_string()]
        }
        Error::LockFailed(_) => {
            vec!["another taskdeck session holds the data file; close it or retry".to_string()]
        }
        _ => Vec::new(),
    }
}
