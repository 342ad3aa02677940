#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use taskdeck::history::History;
use taskdeck::session::{MemoryStore, Session};
use taskdeck::store::Mutation;
use taskdeck::task::{NewTask, Task};
use tempfile::TempDir;

/// Scratch data directory plus helpers for driving the binary against it.
pub struct TestDeck {
    dir: TempDir,
}

impl TestDeck {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn items_path(&self) -> PathBuf {
        self.dir.path().join("items.json")
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("taskdeck.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskdeck").expect("binary");
        cmd.env_remove("TASKDECK_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--data-dir")
            .arg(self.dir.path());
        cmd
    }

    /// Run with `--json` and return the parsed success envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run taskdeck");
        assert!(
            output.status.success(),
            "taskdeck {:?} failed: {}{}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("json envelope")
    }

    /// Create a task and return its id.
    pub fn add(&self, args: &[&str]) -> String {
        let mut full = vec!["add"];
        full.extend_from_slice(args);
        let value = self.json(&full);
        value["data"]["id"].as_str().expect("task id").to_string()
    }

    pub fn read_document(&self) -> Value {
        let raw = fs::read_to_string(self.items_path()).expect("read items");
        serde_json::from_str(&raw).expect("items json")
    }
}

pub fn memory_session() -> Session<MemoryStore> {
    Session::open(MemoryStore::new(), History::default()).expect("session")
}

/// Build a collection through a scratch session so ids and timestamps are real.
pub fn seeded_items(titles: &[&str]) -> Vec<Task> {
    let mut session = memory_session();
    for title in titles {
        session
            .dispatch(Mutation::Create(NewTask::new(*title)))
            .expect("create");
    }
    session.items().to_vec()
}

pub fn titles(items: &[Task]) -> Vec<String> {
    items.iter().map(|task| task.title.clone()).collect()
}
