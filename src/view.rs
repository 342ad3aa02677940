//! View projections over the task collection.
//!
//! Everything here is a pure function of its arguments and is recomputed on
//! every read; projections borrow from the collection and never mutate it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{Task, TaskPriority, TaskStatus, PRIORITY_ORDER};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    List,
    Board,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::List => "list",
            ViewMode::Board => "board",
        }
    }
}

impl FromStr for ViewMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match normalize_text(value).as_str() {
            "list" => Ok(ViewMode::List),
            "board" | "kanban" => Ok(ViewMode::Board),
            other => Err(Error::InvalidArgument(format!(
                "unknown view mode '{other}' (expected list|board)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    Title,
    Status,
    Priority,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Status => "status",
            SortField::Priority => "priority",
            SortField::CreatedAt => "created-at",
            SortField::UpdatedAt => "updated-at",
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match normalize_text(value).replace(['-', '_'], "").as_str() {
            "title" => Ok(SortField::Title),
            "status" => Ok(SortField::Status),
            "priority" => Ok(SortField::Priority),
            "createdat" | "created" => Ok(SortField::CreatedAt),
            "updatedat" | "updated" => Ok(SortField::UpdatedAt),
            _ => Err(Error::InvalidArgument(format!(
                "unknown sort field '{}' (expected title|status|priority|created-at|updated-at)",
                value.trim()
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match normalize_text(value).as_str() {
            "asc" | "ascending" => Ok(SortDirection::Asc),
            "desc" | "descending" => Ok(SortDirection::Desc),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort direction '{other}' (expected asc|desc)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortConfig {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl SortConfig {
    /// Selecting the active field again flips the direction; selecting a
    /// different field keeps the current direction.
    pub fn select(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.toggled();
        } else {
            self.field = field;
        }
    }
}

impl fmt::Display for SortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field.as_str(), self.direction.as_str())
    }
}

/// `None` means "all".
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct FilterConfig {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub search_term: String,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none() && self.search_term.is_empty()
    }
}

/// Parse a status filter where `all` clears it.
pub fn parse_status_filter(value: &str) -> Result<Option<TaskStatus>> {
    if normalize_text(value) == "all" {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// Parse a priority filter where `all` clears it.
pub fn parse_priority_filter(value: &str) -> Result<Option<TaskPriority>> {
    if normalize_text(value) == "all" {
        return Ok(None);
    }
    value.parse().map(Some)
}

fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

/// The priority filter only applies to the list; board columns already
/// partition by priority.
pub fn matches_filter(task: &Task, filter: &FilterConfig, mode: ViewMode) -> bool {
    if let Some(status) = filter.status {
        if task.status != status {
            return false;
        }
    }
    if mode == ViewMode::List {
        if let Some(priority) = filter.priority {
            if task.priority != priority {
                return false;
            }
        }
    }
    let query = filter.search_term.to_lowercase();
    query.is_empty() || task.title.to_lowercase().contains(&query)
}

pub fn filter_tasks<'a>(items: &'a [Task], filter: &FilterConfig, mode: ViewMode) -> Vec<&'a Task> {
    items
        .iter()
        .filter(|task| matches_filter(task, filter, mode))
        .collect()
}

/// Stable sort; equal keys keep collection order in both directions.
pub fn sort_tasks(tasks: &mut [&Task], sort: SortConfig) {
    tasks.sort_by(|left, right| {
        let ordering = compare_by_field(left, right, sort.field);
        match sort.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

pub fn compare_by_field(left: &Task, right: &Task, field: SortField) -> Ordering {
    match field {
        SortField::Title => compare_text(&left.title, &right.title),
        SortField::Status => compare_text(left.status.as_str(), right.status.as_str()),
        SortField::Priority => compare_text(left.priority.as_str(), right.priority.as_str()),
        SortField::CreatedAt => left.created_at.cmp(&right.created_at),
        SortField::UpdatedAt => left.updated_at.cmp(&right.updated_at),
    }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

pub fn project_list<'a>(items: &'a [Task], filter: &FilterConfig, sort: SortConfig) -> Vec<&'a Task> {
    let mut tasks = filter_tasks(items, filter, ViewMode::List);
    sort_tasks(&mut tasks, sort);
    tasks
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BoardColumn<'a> {
    pub priority: TaskPriority,
    pub tasks: Vec<&'a Task>,
}

/// One column per priority in canonical order. Within a column, tasks with a
/// `position` come first in ascending position; the rest keep collection
/// order.
pub fn project_board<'a>(items: &'a [Task], filter: &FilterConfig) -> Vec<BoardColumn<'a>> {
    let filtered = filter_tasks(items, filter, ViewMode::Board);
    PRIORITY_ORDER
        .iter()
        .map(|priority| {
            let mut tasks: Vec<&Task> = filtered
                .iter()
                .copied()
                .filter(|task| task.priority == *priority)
                .collect();
            tasks.sort_by_key(|task| match task.position {
                Some(position) => (0, position),
                None => (1, 0),
            });
            BoardColumn {
                priority: *priority,
                tasks,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "mode", content = "data", rename_all = "kebab-case")]
pub enum Projection<'a> {
    List(Vec<&'a Task>),
    Board(Vec<BoardColumn<'a>>),
}

impl Projection<'_> {
    pub fn len(&self) -> usize {
        match self {
            Projection::List(tasks) => tasks.len(),
            Projection::Board(columns) => columns.iter().map(|column| column.tasks.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn project<'a>(
    items: &'a [Task],
    filter: &FilterConfig,
    sort: SortConfig,
    mode: ViewMode,
) -> Projection<'a> {
    match mode {
        ViewMode::List => Projection::List(project_list(items, filter, sort)),
        ViewMode::Board => Projection::Board(project_board(items, filter)),
    }
}
