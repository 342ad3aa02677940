//! taskdeck - task record store with derived views and undo/redo
//!
//! # Core Concepts
//!
//! - **Task Store**: the authoritative ordered collection and its reducer
//! - **History**: bounded past/future snapshot stacks with a suppress flag
//!   so undo/redo never records itself
//! - **Views**: pure list and board projections (filter, sort, group)
//! - **Session**: the single owner of store and history; every change goes
//!   through one commit path
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskdeck.toml`
//! - `error`: Error types and result aliases
//! - `history`: Undo/redo snapshot stacks
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON output envelopes
//! - `session`: Store + history owner and the persistence seam
//! - `storage`: JSON items file persistence
//! - `store`: Task collection and mutations
//! - `task`: Task record model
//! - `view`: List and board projections

pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod lock;
pub mod output;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod view;

pub use error::{Error, Result};
