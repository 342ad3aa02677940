//! Interactive shell.
//!
//! One session lives for the whole loop, so undo/redo history survives
//! between lines. Each line is tokenized with shell quoting rules and parsed
//! with the same clap definitions the one-shot commands use. The data file
//! stays locked until the shell exits.

use std::io::{self, BufRead, IsTerminal, Write};

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use crate::cli::task::{self, describe_filter, BoardArgs, ListArgs, TaskCommand, ViewState};
use crate::error::{Error, Result};
use crate::output::{emit_error, emit_success, HistoryDepth, HumanOutput, OutputOptions};
use crate::session::{Persistence, Session};
use crate::view::{parse_priority_filter, parse_status_filter, SortDirection, SortField, ViewMode};

const PROMPT: &str = "taskdeck> ";

#[derive(Parser, Debug)]
#[command(name = "taskdeck", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Task(TaskCommand),

    /// Revert the last change
    Undo,

    /// Reapply the last undone change
    Redo,

    /// Show undo/redo depth
    History,

    /// Switch between list and board, then render
    View {
        /// list or board
        mode: Option<String>,
    },

    /// Sort by a field; picking the current field again flips direction
    Sort {
        field: String,

        /// asc or desc
        direction: Option<String>,
    },

    /// Set the filters used by `list`, `board` and `view`
    Filter {
        #[arg(short, long)]
        status: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(long)]
        search: Option<String>,

        /// Reset every filter to "all"
        #[arg(long)]
        clear: bool,
    },

    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

/// Counters reported when the shell exits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShellSummary {
    pub lines: usize,
    pub errors: usize,
}

#[derive(Serialize)]
struct HistoryOutput {
    can_undo: bool,
    can_redo: bool,
}

#[derive(Serialize)]
struct StepOutput {
    applied: bool,
    items: usize,
}

/// Run the shell against `input` until it is exhausted or `exit` is read.
pub fn run<P: Persistence, R: BufRead>(
    session: &mut Session<P>,
    mut input: R,
    mut view: ViewState,
    output: OutputOptions,
) -> Result<ShellSummary> {
    let interactive = io::stdin().is_terminal() && !output.json;
    let mut summary = ShellSummary::default();
    let mut line = String::new();

    loop {
        if interactive {
            eprint!("{PROMPT}");
            io::stderr().flush()?;
        }
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        summary.lines += 1;

        let words = match shell_words::split(trimmed) {
            Ok(words) => words,
            Err(err) => {
                summary.errors += 1;
                let err = Error::InvalidArgument(format!("cannot parse line: {err}"));
                emit_error("shell", &err, output.json)?;
                continue;
            }
        };
        let command_name = words.first().cloned().unwrap_or_default();

        let parsed = match ShellLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(err) => {
                if err.use_stderr() {
                    summary.errors += 1;
                }
                err.print()?;
                continue;
            }
        };

        debug!(command = %command_name, "shell command");
        match execute(session, parsed.command, &mut view, output) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => break,
            Err(err) => {
                summary.errors += 1;
                emit_error(&command_name, &err, output.json)?;
            }
        }
    }

    Ok(summary)
}

enum Flow {
    Continue,
    Exit,
}

fn execute<P: Persistence>(
    session: &mut Session<P>,
    command: ShellCommand,
    view: &mut ViewState,
    output: OutputOptions,
) -> Result<Flow> {
    match command {
        ShellCommand::Task(command) => task::run(session, command, view, output)?,
        ShellCommand::Undo => {
            let applied = session.undo()?;
            emit_step(session, "undo", applied, output)?;
        }
        ShellCommand::Redo => {
            let applied = session.redo()?;
            emit_step(session, "redo", applied, output)?;
        }
        ShellCommand::History => {
            let depth = HistoryDepth::from(session.history());
            let data = HistoryOutput {
                can_undo: session.can_undo(),
                can_redo: session.can_redo(),
            };
            let mut human = HumanOutput::new("History");
            human.field("Undo steps", format!("{}/{}", depth.undo, depth.capacity));
            human.field("Redo steps", depth.redo.to_string());
            human.history(depth);
            emit_success(output, "history", &data, &human)?;
        }
        ShellCommand::View { mode } => {
            if let Some(mode) = mode.as_deref() {
                view.mode = mode.parse::<ViewMode>()?;
            }
            render(session, view, output)?;
        }
        ShellCommand::Sort { field, direction } => {
            let field: SortField = field.parse()?;
            match direction.as_deref() {
                Some(direction) => {
                    view.sort.field = field;
                    view.sort.direction = direction.parse::<SortDirection>()?;
                }
                None => view.sort.select(field),
            }
            let mut human = HumanOutput::new("Sort updated");
            human.field("Sort", view.sort.to_string());
            emit_success(output, "sort", &view.sort, &human)?;
        }
        ShellCommand::Filter {
            status,
            priority,
            search,
            clear,
        } => {
            if clear {
                view.filter = Default::default();
            }
            if let Some(status) = status.as_deref() {
                view.filter.status = parse_status_filter(status)?;
            }
            if let Some(priority) = priority.as_deref() {
                view.filter.priority = parse_priority_filter(priority)?;
            }
            if let Some(search) = search {
                view.filter.search_term = search;
            }
            let mut human = HumanOutput::new("Filter updated");
            human.field("Filter", describe_filter(&view.filter));
            if view.mode == ViewMode::Board && view.filter.priority.is_some() {
                human.warn("priority filter is ignored on the board");
            }
            emit_success(output, "filter", &view.filter, &human)?;
        }
        ShellCommand::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}

fn render<P: Persistence>(session: &mut Session<P>, view: &ViewState, output: OutputOptions) -> Result<()> {
    let command = match view.mode {
        ViewMode::List => TaskCommand::List(ListArgs::default()),
        ViewMode::Board => TaskCommand::Board(BoardArgs::default()),
    };
    task::run(session, command, view, output)
}

fn emit_step<P: Persistence>(
    session: &Session<P>,
    command: &str,
    applied: bool,
    output: OutputOptions,
) -> Result<()> {
    let data = StepOutput {
        applied,
        items: session.items().len(),
    };
    let header = match (command, applied) {
        ("undo", true) => "Undone",
        ("undo", false) => "Nothing to undo",
        (_, true) => "Redone",
        (_, false) => "Nothing to redo",
    };
    let mut human = HumanOutput::new(header);
    human.field("Tasks", data.items.to_string());
    human.history(HistoryDepth::from(session.history()));
    emit_success(output, command, &data, &human)
}
