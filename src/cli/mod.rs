//! Command-line interface for taskdeck
//!
//! This module defines the CLI structure using clap derive macros.
//! Task commands live in `task`; the interactive loop lives in `shell`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::Session;
use crate::storage::{default_data_dir, FileStore, DATA_DIR_ENV};

mod shell;
mod task;

pub use task::{TaskCommand, ViewState};

/// taskdeck - tasks with list and board views plus undo/redo
#[derive(Parser, Debug)]
#[command(name = "taskdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding items.json and taskdeck.toml
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to <data dir>/taskdeck.toml)
    #[arg(long, global = true, env = "TASKDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Task(TaskCommand),

    /// Interactive session with undo/redo
    Shell,

    /// Show the effective configuration and paths
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config path
    #[arg(long)]
    pub init: bool,
}

/// Resolved locations plus loaded configuration.
struct Context {
    data_dir: PathBuf,
    config_path: PathBuf,
    config: Config,
}

impl Context {
    fn load(data_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir()?,
        };
        let (config_path, config) = match config {
            Some(path) => {
                let config = Config::load_or_default(&path)?;
                (path, config)
            }
            None => (data_dir.join(CONFIG_FILE), Config::load_from_dir(&data_dir)?),
        };
        Ok(Self {
            data_dir,
            config_path,
            config,
        })
    }

    fn file_store(&self) -> FileStore {
        self.config.file_store(&self.data_dir)
    }

    fn open_session(&self) -> Result<Session<FileStore>> {
        Session::open(self.file_store(), self.config.new_history()?)
    }

    fn view_state(&self) -> ViewState {
        ViewState {
            mode: self.config.view.mode,
            sort: self.config.view.sort(),
            filter: Default::default(),
        }
    }
}

#[derive(Serialize)]
struct ConfigOutput<'a> {
    data_dir: &'a PathBuf,
    config_path: &'a PathBuf,
    config_exists: bool,
    items_path: PathBuf,
    config: &'a Config,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };
        let ctx = Context::load(self.data_dir, self.config)?;

        match self.command {
            Commands::Task(command) => {
                let mut session = ctx.open_session()?;
                task::run(&mut session, command, &ctx.view_state(), output)
            }
            Commands::Shell => {
                let mut session = ctx.open_session()?;
                let stdin = std::io::stdin();
                let summary = shell::run(&mut session, stdin.lock(), ctx.view_state(), output)?;
                if !output.json && !output.quiet {
                    eprintln!(
                        "{} command(s), {} error(s)",
                        summary.lines, summary.errors
                    );
                }
                Ok(())
            }
            Commands::Config(args) => {
                if args.init {
                    if ctx.config_path.exists() {
                        return Err(Error::InvalidArgument(format!(
                            "config already exists at {}",
                            ctx.config_path.display()
                        )));
                    }
                    ctx.config.save(&ctx.config_path)?;
                }
                let data = ConfigOutput {
                    data_dir: &ctx.data_dir,
                    config_path: &ctx.config_path,
                    config_exists: ctx.config_path.exists(),
                    items_path: ctx.file_store().path().to_path_buf(),
                    config: &ctx.config,
                };
                let mut human = HumanOutput::new("Configuration");
                human.field("Data dir", data.data_dir.display().to_string());
                human.field(
                    "Config",
                    format!(
                        "{}{}",
                        data.config_path.display(),
                        if data.config_exists { "" } else { " (defaults)" }
                    ),
                );
                human.field("Items", data.items_path.display().to_string());
                human.field("History capacity", ctx.config.history.capacity.to_string());
                human.field(
                    "Lock timeout",
                    format!("{} ms", ctx.config.storage.lock_timeout_ms),
                );
                human.field("View", ctx.config.view.mode.as_str());
                human.field("Sort", ctx.config.view.sort().to_string());
                emit_success(output, "config", &data, &human)
            }
        }
    }
}
