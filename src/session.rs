//! Session: the single owner of a task store and its history.
//!
//! Every committed change flows through one private commit path:
//! persistence receives the next collection first; only once it is saved
//! does history observe the previous collection and the store get replaced.
//! Undo and redo hand their snapshot to the same path, which consumes the
//! suppress flag instead of recording. A failed save leaves the session as
//! it was.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;
use crate::history::{History, Snapshot};
use crate::store::{Change, Mutation, TaskStore};
use crate::task::Task;

/// Where the session loads restored state from and reports committed state to.
///
/// Only the item collection crosses this boundary; history never does.
pub trait Persistence {
    fn load(&mut self) -> Result<Vec<Task>>;
    fn save(&mut self, items: &[Task]) -> Result<()>;
}

/// Persistence that keeps nothing. Useful for tests and scratch sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    seed: Vec<Task>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items returned by the next `load`.
    pub fn with_items(items: Vec<Task>) -> Self {
        Self {
            seed: items,
            saves: 0,
        }
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl Persistence for MemoryStore {
    fn load(&mut self) -> Result<Vec<Task>> {
        Ok(std::mem::take(&mut self.seed))
    }

    fn save(&mut self, _items: &[Task]) -> Result<()> {
        self.saves += 1;
        Ok(())
    }
}

/// What a committed mutation did.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub mutation: &'static str,
    pub touched: Vec<String>,
    pub recorded: bool,
}

pub struct Session<P: Persistence> {
    store: TaskStore,
    history: History,
    persistence: P,
}

impl<P: Persistence> Session<P> {
    /// Load persisted items, hydrate, then clear history before any event is
    /// accepted.
    pub fn open(mut persistence: P, history: History) -> Result<Self> {
        let items = persistence.load()?;
        let mut session = Self {
            store: TaskStore::new(),
            history,
            persistence,
        };
        session.hydrate(items);
        Ok(session)
    }

    /// Replace the collection wholesale without recording, then drop both
    /// history stacks. Does not notify persistence.
    pub fn hydrate(&mut self, items: Vec<Task>) {
        let count = items.len();
        self.store.replace(items);
        self.history.clear();
        info!(items = count, "session hydrated");
    }

    pub fn items(&self) -> &[Task] {
        self.store.items()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Validate, reduce and commit one mutation. A rejected mutation leaves
    /// the store and history untouched.
    pub fn dispatch(&mut self, mutation: Mutation) -> Result<Outcome> {
        mutation.validate()?;
        let Change { items, touched } = self.store.apply(&mutation, Utc::now())?;
        let recorded = self.commit(items)?;
        debug!(
            mutation = mutation.name(),
            touched = touched.len(),
            recorded,
            "mutation committed"
        );
        Ok(Outcome {
            mutation: mutation.name(),
            touched,
            recorded,
        })
    }

    /// Restore the newest past snapshot. Returns `false` when there was
    /// nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(snapshot) = self.history.undo(self.store.items()) else {
            debug!("undo with empty past ignored");
            return Ok(false);
        };
        if let Err(err) = self.commit_snapshot(&snapshot) {
            self.history.cancel_undo(snapshot);
            return Err(err);
        }
        Ok(true)
    }

    /// Reapply the newest undone snapshot. Returns `false` when there was
    /// nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(snapshot) = self.history.redo(self.store.items()) else {
            debug!("redo with empty future ignored");
            return Ok(false);
        };
        if let Err(err) = self.commit_snapshot(&snapshot) {
            self.history.cancel_redo(snapshot);
            return Err(err);
        }
        Ok(true)
    }

    fn commit_snapshot(&mut self, snapshot: &Snapshot) -> Result<()> {
        let recorded = self.commit(snapshot.items().to_vec())?;
        debug_assert!(!recorded, "undo/redo commit must not be recorded");
        Ok(())
    }

    /// Nothing changes in memory unless persistence accepted `next`.
    fn commit(&mut self, next: Vec<Task>) -> Result<bool> {
        self.persistence.save(&next)?;
        let recorded = self.history.record(self.store.items());
        self.store.replace(next);
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::DEFAULT_HISTORY_CAPACITY;
    use crate::task::{NewTask, TaskPatch, TaskPriority, TaskStatus};
    use crate::view::{project_board, project_list, FilterConfig, SortConfig};

    fn session() -> Session<MemoryStore> {
        Session::open(MemoryStore::new(), History::default()).expect("session")
    }

    fn create(session: &mut Session<MemoryStore>, title: &str) -> String {
        session
            .dispatch(Mutation::Create(NewTask::new(title)))
            .expect("create")
            .touched
            .remove(0)
    }

    #[test]
    fn status_update_undo_redo_walk() {
        let mut session = session();
        let id = create(&mut session, "Write docs");
        let status = |session: &Session<MemoryStore>| session.items()[0].status;

        session
            .dispatch(Mutation::Update {
                id: id.clone(),
                patch: TaskPatch::status(TaskStatus::InProgress),
            })
            .expect("update");
        assert_eq!(status(&session), TaskStatus::InProgress);

        assert!(session.undo().expect("undo"));
        assert_eq!(status(&session), TaskStatus::NotStarted);
        assert_eq!(session.history().past_len(), 1);
        assert_eq!(session.history().future_len(), 1);

        assert!(session.redo().expect("redo"));
        assert_eq!(status(&session), TaskStatus::InProgress);
        assert_eq!(session.history().past_len(), 2);
        assert_eq!(session.history().future_len(), 0);
        assert!(!session.history().is_suppressed());
    }

    #[test]
    fn two_task_undo_redo_walk() {
        let mut session = session();
        let a = create(&mut session, "Write docs");
        let b = create(&mut session, "Review docs");
        session
            .dispatch(Mutation::Update {
                id: a.clone(),
                patch: TaskPatch::status(TaskStatus::Completed),
            })
            .expect("complete");
        let completed = session.items().to_vec();

        session.undo().expect("undo");
        let statuses: Vec<(String, TaskStatus)> = session
            .items()
            .iter()
            .map(|task| (task.id.clone(), task.status))
            .collect();
        assert_eq!(
            statuses,
            vec![(a.clone(), TaskStatus::NotStarted), (b.clone(), TaskStatus::NotStarted)]
        );

        // undoing the second creation leaves only the first task
        session.undo().expect("undo");
        assert_eq!(session.items().len(), 1);
        assert_eq!(session.items()[0].id, a);

        session.redo().expect("redo");
        session.redo().expect("redo");
        assert_eq!(session.items(), completed.as_slice());
    }

    #[test]
    fn oldest_entries_are_evicted_at_capacity() {
        let mut session = session();
        for idx in 0..25 {
            create(&mut session, &format!("Task {idx}"));
        }
        assert_eq!(session.history().past_len(), DEFAULT_HISTORY_CAPACITY);
        // before the 6th creation the collection held five tasks
        assert_eq!(session.history().oldest().map(Snapshot::len), Some(5));

        let mut undone = 0;
        while session.undo().expect("undo") {
            undone += 1;
        }
        assert_eq!(undone, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(session.items().len(), 5);
    }

    #[test]
    fn undo_all_then_redo_all_round_trips() {
        let mut session = session();
        let initial = session.items().to_vec();
        let id = create(&mut session, "A");
        create(&mut session, "B");
        session.dispatch(Mutation::Delete(id)).expect("delete");
        let final_state = session.items().to_vec();

        for _ in 0..3 {
            assert!(session.undo().expect("undo"));
        }
        assert_eq!(session.items(), initial.as_slice());
        assert!(!session.can_undo());

        for _ in 0..3 {
            assert!(session.redo().expect("redo"));
        }
        assert_eq!(session.items(), final_state.as_slice());
        assert!(!session.can_redo());
    }

    #[test]
    fn new_mutation_after_undo_clears_future() {
        let mut session = session();
        create(&mut session, "A");
        create(&mut session, "B");
        session.undo().expect("undo");
        assert!(session.can_redo());

        let outcome = session
            .dispatch(Mutation::Create(NewTask::new("C")))
            .expect("create");
        assert!(outcome.recorded);
        assert!(!session.can_redo());
    }

    #[test]
    fn reads_and_projections_leave_history_alone() {
        let mut session = session();
        create(&mut session, "A");
        let past = session.history().past_len();

        let _ = project_list(session.items(), &FilterConfig::default(), SortConfig::default());
        let _ = project_board(session.items(), &FilterConfig::default());
        let _ = session.store().get("missing");

        assert_eq!(session.history().past_len(), past);
        assert_eq!(session.history().future_len(), 0);
    }

    #[test]
    fn validation_failure_changes_nothing() {
        let mut session = session();
        let id = create(&mut session, "Keep");
        let saves = session.persistence().saves();

        let patch = TaskPatch {
            title: Some("   ".to_string()),
            ..TaskPatch::default()
        };
        let err = session
            .dispatch(Mutation::Update { id, patch })
            .expect_err("blank title");
        assert!(matches!(err, crate::error::Error::Validation(_)));
        assert_eq!(session.items()[0].title, "Keep");
        assert_eq!(session.history().past_len(), 1);
        assert_eq!(session.persistence().saves(), saves);
    }

    #[test]
    fn unknown_id_mutation_is_recorded_but_changes_nothing() {
        let mut session = session();
        create(&mut session, "A");
        let before = session.items().to_vec();
        let outcome = session
            .dispatch(Mutation::ReassignPriority {
                id: "ghost".to_string(),
                priority: TaskPriority::High,
            })
            .expect("reassign");
        assert!(outcome.touched.is_empty());
        assert_eq!(session.items(), before.as_slice());
        assert_eq!(session.history().past_len(), 2);
    }

    #[test]
    fn open_hydrates_and_starts_with_empty_history() {
        let seed = {
            let mut scratch = session();
            create(&mut scratch, "Persisted");
            scratch.items().to_vec()
        };
        let session = Session::open(MemoryStore::with_items(seed.clone()), History::default())
            .expect("open");
        assert_eq!(session.items(), seed.as_slice());
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert_eq!(session.persistence().saves(), 0);
    }

    #[test]
    fn hydrate_mid_session_drops_history() {
        let mut session = session();
        create(&mut session, "A");
        session.undo().expect("undo");
        session.hydrate(Vec::new());
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert!(!session.history().is_suppressed());
    }

    #[test]
    fn every_commit_notifies_persistence() {
        let mut session = session();
        create(&mut session, "A");
        session.undo().expect("undo");
        session.redo().expect("redo");
        assert!(!session.redo().expect("nothing to redo"));
        assert_eq!(session.persistence().saves(), 3);
    }

    #[test]
    fn reorder_drives_board_order() {
        let mut session = session();
        let a = session
            .dispatch(Mutation::Create(NewTask::new("A").with_priority(TaskPriority::High)))
            .expect("a")
            .touched
            .remove(0);
        create(&mut session, "B");
        let c = session
            .dispatch(Mutation::Create(NewTask::new("C").with_priority(TaskPriority::High)))
            .expect("c")
            .touched
            .remove(0);

        session
            .dispatch(Mutation::Reorder {
                priority: TaskPriority::High,
                ids: vec![c.clone(), a.clone()],
            })
            .expect("reorder");
        let board = project_board(session.items(), &FilterConfig::default());
        let high: Vec<&str> = board[TaskPriority::High.rank()]
            .tasks
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(high, vec![c.as_str(), a.as_str()]);

        session.undo().expect("undo");
        let board = project_board(session.items(), &FilterConfig::default());
        let high: Vec<&str> = board[TaskPriority::High.rank()]
            .tasks
            .iter()
            .map(|task| task.id.as_str())
            .collect();
        assert_eq!(high, vec![a.as_str(), c.as_str()]);
    }

    /// Saves succeed until `failing` is set.
    #[derive(Default)]
    struct SwitchableStore {
        failing: bool,
        saved: Vec<Task>,
    }

    impl Persistence for SwitchableStore {
        fn load(&mut self) -> Result<Vec<Task>> {
            Ok(self.saved.clone())
        }

        fn save(&mut self, items: &[Task]) -> Result<()> {
            if self.failing {
                return Err(crate::error::Error::LockFailed("items.json.lock".into()));
            }
            self.saved = items.to_vec();
            Ok(())
        }
    }

    fn titles<P: Persistence>(session: &Session<P>) -> Vec<String> {
        session.items().iter().map(|task| task.title.clone()).collect()
    }

    fn depth<P: Persistence>(session: &Session<P>) -> (usize, usize, bool) {
        let history = session.history();
        (history.past_len(), history.future_len(), history.is_suppressed())
    }

    #[test]
    fn failed_save_leaves_session_untouched() {
        let mut session =
            Session::open(SwitchableStore::default(), History::default()).expect("session");
        for title in ["A", "B"] {
            session
                .dispatch(Mutation::Create(NewTask::new(title)))
                .expect("create");
        }
        session.undo().expect("undo");
        assert_eq!(titles(&session), vec!["A"]);
        assert_eq!(depth(&session), (1, 1, false));

        session.persistence.failing = true;

        let err = session
            .dispatch(Mutation::Create(NewTask::new("C")))
            .expect_err("create fails");
        assert!(matches!(err, crate::error::Error::LockFailed(_)));
        assert_eq!(titles(&session), vec!["A"]);
        assert_eq!(depth(&session), (1, 1, false));

        session.undo().expect_err("undo fails");
        assert_eq!(titles(&session), vec!["A"]);
        assert_eq!(depth(&session), (1, 1, false));
        assert_eq!(session.history().peek_past().map(Snapshot::len), Some(0));

        session.redo().expect_err("redo fails");
        assert_eq!(titles(&session), vec!["A"]);
        assert_eq!(depth(&session), (1, 1, false));
        assert_eq!(session.history().peek_future().map(Snapshot::len), Some(2));

        session.persistence.failing = false;

        assert!(session.redo().expect("redo"));
        assert_eq!(titles(&session), vec!["A", "B"]);
        assert_eq!(depth(&session), (2, 0, false));
        assert!(session.undo().expect("undo"));
        assert!(session.undo().expect("undo"));
        assert!(session.items().is_empty());
        assert!(!session.can_undo());
        assert_eq!(session.persistence.saved, Vec::<Task>::new());
    }
}
