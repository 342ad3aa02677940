//! Bounded undo/redo history over whole-collection snapshots.
//!
//! Semantics:
//! - Every recordable mutation pushes the pre-mutation collection onto
//!   `past` and clears `future`.
//! - `undo`/`redo` move the current collection to the opposite stack and
//!   arm a single-slot suppress flag; the replacement they hand back is
//!   committed through the normal path, which consumes the flag instead of
//!   recording.
//! - History is never persisted and is cleared after state restoration.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::task::Task;

/// Default number of undo steps kept in `past`.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Independent copy of the whole task collection at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    items: Vec<Task>,
}

impl Snapshot {
    pub fn capture(items: &[Task]) -> Self {
        Self {
            items: items.to_vec(),
        }
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

    pub fn into_items(self) -> Vec<Task> {
        self.items
    }
}

#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
    suppress_next_capture: bool,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            past: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY + 1),
            future: Vec::new(),
            suppress_next_capture: false,
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl History {
    /// Create a history holding at most `capacity` undo steps.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "history capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            past: VecDeque::with_capacity(capacity + 1),
            capacity,
            ..Self::default()
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Snapshot the next `undo` would restore.
    pub fn peek_past(&self) -> Option<&Snapshot> {
        self.past.back()
    }

    /// Snapshot the next `redo` would restore.
    pub fn peek_future(&self) -> Option<&Snapshot> {
        self.future.last()
    }

    /// Oldest retained snapshot.
    pub fn oldest(&self) -> Option<&Snapshot> {
        self.past.front()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppress_next_capture
    }

    /// Observe a committed change. `previous` is the collection as it was
    /// before the change. Returns whether a history entry was captured.
    pub fn record(&mut self, previous: &[Task]) -> bool {
        if self.suppress_next_capture {
            self.suppress_next_capture = false;
            trace!("history capture suppressed");
            return false;
        }

        self.push_past(Snapshot::capture(previous));
        if !self.future.is_empty() {
            debug!(dropped = self.future.len(), "new change clears redo stack");
            self.future.clear();
        }
        true
    }

    /// Pop the newest `past` snapshot, stash `current` for redo and arm the
    /// suppress flag. The caller must commit the returned snapshot through the
    /// normal path. Returns `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &[Task]) -> Option<Snapshot> {
        let previous = self.past.pop_back()?;
        debug_assert!(!self.suppress_next_capture, "suppress flag armed twice");
        self.suppress_next_capture = true;
        self.future.push(Snapshot::capture(current));
        debug!(past = self.past.len(), future = self.future.len(), "undo");
        Some(previous)
    }

    /// Mirror of [`History::undo`] for the redo stack.
    pub fn redo(&mut self, current: &[Task]) -> Option<Snapshot> {
        let next = self.future.pop()?;
        debug_assert!(!self.suppress_next_capture, "suppress flag armed twice");
        self.suppress_next_capture = true;
        self.push_past(Snapshot::capture(current));
        debug!(past = self.past.len(), future = self.future.len(), "redo");
        Some(next)
    }

    /// Put back a snapshot handed out by [`History::undo`] whose commit
    /// failed, leaving both stacks and the flag as they were before.
    pub fn cancel_undo(&mut self, restored: Snapshot) {
        self.future.pop();
        self.past.push_back(restored);
        self.suppress_next_capture = false;
        debug!(past = self.past.len(), future = self.future.len(), "undo cancelled");
    }

    /// Mirror of [`History::cancel_undo`] for the redo stack. `past` plus
    /// `future` never exceeds the capacity, so the redo push evicted nothing.
    pub fn cancel_redo(&mut self, restored: Snapshot) {
        self.past.pop_back();
        self.future.push(restored);
        self.suppress_next_capture = false;
        debug!(past = self.past.len(), future = self.future.len(), "redo cancelled");
    }

    /// Drop both stacks and reset the suppress flag.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.suppress_next_capture = false;
        debug!("history cleared");
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        while self.past.len() > self.capacity {
            self.past.pop_front();
            trace!(capacity = self.capacity, "evicted oldest history entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::Utc;

    fn tasks(titles: &[&str]) -> Vec<Task> {
        let now = Utc::now();
        titles
            .iter()
            .enumerate()
            .map(|(idx, title)| NewTask::new(*title).into_task(format!("t-{idx}"), now))
            .collect()
    }

    #[test]
    fn zero_capacity_fails_fast() {
        let err = History::new(0).expect_err("capacity 0");
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(History::default().capacity(), DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn empty_stacks_make_undo_and_redo_no_ops() {
        let mut history = History::default();
        let current = tasks(&["A"]);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.undo(&current).is_none());
        assert!(history.redo(&current).is_none());
        assert!(!history.is_suppressed());
        assert_eq!(history.future_len(), 0);
    }

    #[test]
    fn record_pushes_previous_and_clears_future() {
        let mut history = History::default();
        assert!(history.record(&tasks(&[])));
        assert!(history.record(&tasks(&["A"])));
        let restored = history.undo(&tasks(&["A", "B"])).expect("undo");
        assert_eq!(restored.len(), 1);
        assert!(history.can_redo());

        // consumes the flag armed by undo
        assert!(!history.record(&tasks(&["A", "B"])));
        assert!(history.can_redo());

        assert!(history.record(&tasks(&["A"])));
        assert!(!history.can_redo());
        assert_eq!(history.past_len(), 2);
    }

    #[test]
    fn capacity_evicts_oldest_entry() {
        let mut history = History::new(2).expect("history");
        history.record(&tasks(&[]));
        history.record(&tasks(&["A"]));
        history.record(&tasks(&["A", "B"]));
        assert_eq!(history.past_len(), 2);
        assert_eq!(history.oldest().map(Snapshot::len), Some(1));
        assert_eq!(history.peek_past().map(Snapshot::len), Some(2));
    }

    #[test]
    fn redo_respects_capacity() {
        let mut history = History::new(1).expect("history");
        history.record(&tasks(&[]));
        history.record(&tasks(&["A"]));
        assert_eq!(history.past_len(), 1);

        let restored = history.undo(&tasks(&["A", "B"])).expect("undo");
        assert!(!history.record(restored.items()));
        let next = history.redo(restored.items()).expect("redo");
        assert_eq!(next.len(), 2);
        assert_eq!(history.past_len(), 1);
        assert_eq!(history.peek_past().map(Snapshot::len), Some(1));
    }

    #[test]
    fn flag_consumed_once_does_not_leak() {
        let mut history = History::default();
        history.record(&tasks(&[]));
        let restored = history.undo(&tasks(&["A"])).expect("undo");
        assert!(!history.record(restored.items()));
        assert!(!history.is_suppressed());
        assert!(history.record(&tasks(&[])));
        assert!(!history.can_redo());
    }

    #[test]
    fn clear_resets_everything() {
        let mut history = History::default();
        history.record(&tasks(&[]));
        history.undo(&tasks(&["A"]));
        assert!(history.is_suppressed());
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(!history.is_suppressed());
    }

    #[test]
    fn peek_reports_next_targets() {
        let mut history = History::default();
        history.record(&tasks(&[]));
        assert_eq!(history.peek_past().map(Snapshot::len), Some(0));
        history.undo(&tasks(&["A"]));
        assert_eq!(history.peek_future().map(Snapshot::len), Some(1));
    }

    #[test]
    fn cancelled_steps_restore_stacks_and_flag() {
        let mut history = History::new(2).expect("history");
        history.record(&tasks(&[]));
        history.record(&tasks(&["A"]));

        let restored = history.undo(&tasks(&["A", "B"])).expect("undo");
        history.cancel_undo(restored);
        assert_eq!((history.past_len(), history.future_len()), (2, 0));
        assert_eq!(history.peek_past().map(Snapshot::len), Some(1));
        assert!(!history.is_suppressed());

        let restored = history.undo(&tasks(&["A", "B"])).expect("undo");
        assert!(!history.record(restored.items()));
        let next = history.redo(restored.items()).expect("redo");
        history.cancel_redo(next);
        assert_eq!((history.past_len(), history.future_len()), (1, 1));
        assert_eq!(history.oldest().map(Snapshot::len), Some(0));
        assert_eq!(history.peek_future().map(Snapshot::len), Some(2));
        assert!(!history.is_suppressed());
    }
}
