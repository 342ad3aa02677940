//! Task store: the authoritative ordered collection and its reducer.
//!
//! Every operation computes a new collection from the current one and
//! returns it as a [`Change`]; nothing here replaces the live collection.
//! Committing a change (and deciding whether history captures it) is the
//! session's job.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::task::{new_task_id, NewTask, Task, TaskPatch, TaskPriority};

/// A recordable intent against the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(NewTask),
    Update { id: String, patch: TaskPatch },
    Delete(String),
    DeleteBatch(Vec<String>),
    ReassignPriority { id: String, priority: TaskPriority },
    Reorder { priority: TaskPriority, ids: Vec<String> },
    BatchUpdate { ids: Vec<String>, patch: TaskPatch },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete(_) => "delete",
            Mutation::DeleteBatch(_) => "delete_batch",
            Mutation::ReassignPriority { .. } => "reassign_priority",
            Mutation::Reorder { .. } => "reorder",
            Mutation::BatchUpdate { .. } => "batch_update",
        }
    }

    /// Boundary validation; runs before the store sees the intent so a
    /// rejected mutation is never partially applied.
    pub fn validate(&self) -> Result<()> {
        match self {
            Mutation::Create(fields) => fields.validate(),
            Mutation::Update { patch, .. } | Mutation::BatchUpdate { patch, .. } => {
                patch.validate()
            }
            _ => Ok(()),
        }
    }
}

/// Result of a store operation: the next collection plus the ids it touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub items: Vec<Task>,
    pub touched: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskStore {
    items: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Task>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Task] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.items.iter().find(|task| task.id == id)
    }

    pub(crate) fn replace(&mut self, items: Vec<Task>) {
        self.items = items;
    }

    /// Reduce a mutation against the current collection.
    pub fn apply(&self, mutation: &Mutation, now: DateTime<Utc>) -> Result<Change> {
        match mutation {
            Mutation::Create(fields) => self.create(fields.clone(), now),
            Mutation::Update { id, patch } => Ok(self.update(id, patch, now)),
            Mutation::Delete(id) => Ok(self.delete(id)),
            Mutation::DeleteBatch(ids) => Ok(self.delete_batch(ids)),
            Mutation::ReassignPriority { id, priority } => {
                Ok(self.reassign_priority(id, *priority, now))
            }
            Mutation::Reorder { priority, ids } => Ok(self.reorder(*priority, ids, now)),
            Mutation::BatchUpdate { ids, patch } => Ok(self.batch_update(ids, patch, now)),
        }
    }

    pub fn create(&self, fields: NewTask, now: DateTime<Utc>) -> Result<Change> {
        fields.validate()?;
        let mut id = new_task_id();
        while self.get(&id).is_some() {
            id = new_task_id();
        }
        let mut items = self.items.clone();
        items.push(fields.into_task(id.clone(), now));
        Ok(Change {
            items,
            touched: vec![id],
        })
    }

    /// Unknown ids are a no-op, not an error.
    pub fn update(&self, id: &str, patch: &TaskPatch, now: DateTime<Utc>) -> Change {
        self.map_matching(|task| task.id == id, |task| task.merge(patch, now))
    }

    pub fn delete(&self, id: &str) -> Change {
        self.delete_batch(std::slice::from_ref(&id.to_string()))
    }

    pub fn delete_batch(&self, ids: &[String]) -> Change {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut items = Vec::with_capacity(self.items.len());
        let mut touched = Vec::new();
        for task in &self.items {
            if targets.contains(task.id.as_str()) {
                touched.push(task.id.clone());
            } else {
                items.push(task.clone());
            }
        }
        Change { items, touched }
    }

    pub fn reassign_priority(&self, id: &str, priority: TaskPriority, now: DateTime<Utc>) -> Change {
        self.update(id, &TaskPatch::priority(priority), now)
    }

    /// Assign `position = index` to each listed id that belongs to the
    /// `priority` group. Ids outside the group, or past `u32::MAX`, are
    /// ignored.
    pub fn reorder(&self, priority: TaskPriority, ids: &[String], now: DateTime<Utc>) -> Change {
        let mut items = self.items.clone();
        let mut touched = Vec::new();
        for (index, id) in ids.iter().enumerate() {
            let Some(position) = board_position(index) else {
                break;
            };
            let Some(task) = items
                .iter_mut()
                .find(|task| &task.id == id && task.priority == priority)
            else {
                continue;
            };
            task.position = Some(position);
            task.touch(now);
            touched.push(task.id.clone());
        }
        Change { items, touched }
    }

    pub fn batch_update(&self, ids: &[String], patch: &TaskPatch, now: DateTime<Utc>) -> Change {
        let targets: HashSet<&str> = ids.iter().map(String::as_str).collect();
        self.map_matching(
            |task| targets.contains(task.id.as_str()),
            |task| task.merge(patch, now),
        )
    }

    fn map_matching<P, F>(&self, matches: P, mut apply: F) -> Change
    where
        P: Fn(&Task) -> bool,
        F: FnMut(&mut Task),
    {
        let mut items = self.items.clone();
        let mut touched = Vec::new();
        for task in items.iter_mut().filter(|task| matches(task)) {
            apply(task);
            touched.push(task.id.clone());
        }
        Change { items, touched }
    }

    /// Resolve a full id or a unique id prefix.
    pub fn resolve_id(&self, input: &str) -> Result<String> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidArgument("task id cannot be empty".to_string()));
        }
        let needle = trimmed.to_ascii_lowercase();

        if let Some(task) = self.items.iter().find(|task| task.id == needle) {
            return Ok(task.id.clone());
        }

        let mut matches: Vec<&str> = self
            .items
            .iter()
            .filter(|task| task.id.starts_with(&needle))
            .map(|task| task.id.as_str())
            .collect();
        matches.sort_unstable();
        match matches.as_slice() {
            [] => Err(Error::TaskNotFound(trimmed.to_string())),
            [only] => Ok(only.to_string()),
            _ => Err(Error::InvalidArgument(format!(
                "ambiguous task id '{}': {}",
                trimmed,
                matches.join(", ")
            ))),
        }
    }
}

/// Board position for the `index`-th id of a reorder, if it fits.
fn board_position(index: usize) -> Option<u32> {
    u32::try_from(index).ok()
}
