//! Local JSON task database (`tasks.json`).
//!
//! ```json
//! {
//!   "tasks": { "PROJ-7": { "status": "In Progress", "summary": "...", "description": "", "parent": null } },
//!   "sessions": []
//! }
//! ```
//!
//! Handy for trying the wrapper without a tracker server. Every mutation
//! rewrites the whole file atomically.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{InternalStatus, SessionSnapshot, TaskStatus};
use crate::io::atomic::write_json_atomic;
use crate::tracker::{TaskDetails, TaskLookup, TaskTracker, TrackerFailure, TrackerResult};

pub const TASKS_FILE: &str = "tasks.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDb {
    pub tasks: BTreeMap<String, TaskRecord>,
    pub sessions: Vec<SessionSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRecord {
    pub status: Option<String>,
    pub summary: String,
    pub description: String,
    pub parent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileTracker {
    provider: String,
    path: PathBuf,
}

impl FileTracker {
    pub fn new(provider: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            provider: provider.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the database; a missing file is an empty database.
    pub fn load(&self) -> Result<TaskDb> {
        if !self.path.exists() {
            return Ok(TaskDb::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parse {}", self.path.display()))
    }

    pub fn save(&self, db: &TaskDb) -> Result<()> {
        write_json_atomic(&self.path, db)
    }

    fn update<T>(&self, apply: impl FnOnce(&mut TaskDb) -> TrackerResult<T>) -> TrackerResult<T> {
        let mut db = self.load().map_err(failure)?;
        let value = apply(&mut db)?;
        self.save(&db).map_err(failure)?;
        Ok(value)
    }
}

fn failure(err: anyhow::Error) -> TrackerFailure {
    TrackerFailure::new(format!("{err:#}"))
}

fn not_found(id: &str) -> TrackerFailure {
    TrackerFailure::new(format!("task {id} not found"))
}

/// Next unused `<PREFIX>-<n>` key in the parent's project.
fn next_key(db: &TaskDb, parent: &str) -> TrackerResult<String> {
    let prefix = parent.rsplit_once('-').map_or(parent, |(prefix, _)| prefix);
    let highest = db
        .tasks
        .keys()
        .filter_map(|key| key.strip_prefix(prefix)?.strip_prefix('-')?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    let next = highest
        .checked_add(1)
        .ok_or_else(|| TrackerFailure::new(format!("no task numbers left in project {prefix}")))?;
    Ok(format!("{prefix}-{next}"))
}

impl TaskTracker for FileTracker {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn get_task_status(&self, id: &str) -> TaskLookup {
        let db = match self.load() {
            Ok(db) => db,
            Err(err) => return TaskLookup::Error(format!("{err:#}")),
        };
        match db.tasks.get(id) {
            Some(record) => TaskLookup::Found(TaskStatus {
                provider: self.provider.clone(),
                key: id.to_string(),
                raw: record.status.clone(),
                internal: None,
            }),
            None => TaskLookup::NotFound,
        }
    }

    fn track_session(&self, snapshot: &SessionSnapshot) -> TrackerResult<()> {
        debug!(branch = %snapshot.branch, duration_ms = snapshot.duration_ms, "recording session");
        self.update(|db| {
            db.sessions.push(snapshot.clone());
            Ok(())
        })
    }

    fn create_subtask(&self, parent: &str, title: Option<&str>) -> TrackerResult<String> {
        self.update(|db| {
            if !db.tasks.contains_key(parent) {
                return Err(not_found(parent));
            }
            let key = next_key(db, parent)?;
            let summary = title
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .map_or_else(|| format!("Subtask of {parent}"), str::to_string);
            db.tasks.insert(
                key.clone(),
                TaskRecord {
                    status: Some(InternalStatus::Todo.as_str().to_string()),
                    summary,
                    description: String::new(),
                    parent: Some(parent.to_string()),
                },
            );
            Ok(key)
        })
    }

    fn transition_task(&self, id: &str, target: InternalStatus) -> TrackerResult<()> {
        self.update(|db| {
            let record = db.tasks.get_mut(id).ok_or_else(|| not_found(id))?;
            record.status = Some(target.as_str().to_string());
            Ok(())
        })
    }

    fn get_task_details(&self, id: &str) -> TrackerResult<TaskDetails> {
        let db = self.load().map_err(failure)?;
        let record = db.tasks.get(id).ok_or_else(|| not_found(id))?;
        Ok(TaskDetails {
            key: id.to_string(),
            summary: record.summary.clone(),
            description: record.description.clone(),
            parent_key: record.parent.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn seeded(dir: &Path) -> FileTracker {
        let tracker = FileTracker::new("local", dir.join(TASKS_FILE));
        let mut db = TaskDb::default();
        db.tasks.insert(
            "PROJ-7".to_string(),
            TaskRecord {
                status: Some("In Progress".to_string()),
                summary: "Fix login".to_string(),
                ..TaskRecord::default()
            },
        );
        db.tasks.insert("PROJ-9".to_string(), TaskRecord::default());
        tracker.save(&db).expect("seed");
        tracker
    }

    #[test]
    fn missing_database_means_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = FileTracker::new("local", temp.path().join(TASKS_FILE));
        assert_eq!(tracker.get_task_status("PROJ-1"), TaskLookup::NotFound);
    }

    #[test]
    fn corrupt_database_is_an_error_lookup() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = FileTracker::new("local", temp.path().join(TASKS_FILE));
        fs::write(tracker.path(), "[").expect("write");
        assert!(matches!(tracker.get_task_status("PROJ-1"), TaskLookup::Error(_)));
    }

    #[test]
    fn status_is_reported_raw() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = seeded(temp.path());
        assert_eq!(
            tracker.get_task_status("PROJ-7"),
            TaskLookup::Found(TaskStatus::raw("local", "PROJ-7", "In Progress"))
        );
    }

    #[test]
    fn transition_writes_internal_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = seeded(temp.path());
        tracker
            .transition_task("PROJ-7", InternalStatus::Review)
            .expect("transition");
        let db = tracker.load().expect("load");
        assert_eq!(db.tasks["PROJ-7"].status.as_deref(), Some("REVIEW"));
        assert!(tracker.transition_task("NOPE-1", InternalStatus::Done).is_err());
    }

    #[test]
    fn subtask_gets_next_free_key_in_project() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = seeded(temp.path());
        let key = tracker
            .create_subtask("PROJ-7", Some("Write tests"))
            .expect("subtask");
        assert_eq!(key, "PROJ-10");

        let details = tracker.get_task_details(&key).expect("details");
        assert_eq!(details.summary, "Write tests");
        assert_eq!(details.parent_key.as_deref(), Some("PROJ-7"));

        let untitled = tracker.create_subtask("PROJ-7", None).expect("subtask");
        assert_eq!(untitled, "PROJ-11");
        assert_eq!(
            tracker.get_task_details(&untitled).expect("details").summary,
            "Subtask of PROJ-7"
        );
    }

    #[test]
    fn exhausted_task_numbers_fail_instead_of_overflowing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = seeded(temp.path());
        let mut db = tracker.load().expect("load");
        db.tasks.insert(format!("PROJ-{}", u64::MAX), TaskRecord::default());
        tracker.save(&db).expect("save");

        let err = tracker.create_subtask("PROJ-7", None).unwrap_err();
        assert!(err.to_string().contains("no task numbers left"), "{err}");
        assert_eq!(tracker.load().expect("load").tasks.len(), 3);
    }

    #[test]
    fn subtask_of_unknown_parent_fails() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = seeded(temp.path());
        assert!(tracker.create_subtask("OTHER-1", None).is_err());
    }

    #[test]
    fn sessions_are_appended() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tracker = seeded(temp.path());
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let snapshot = SessionSnapshot {
            branch: "PROJ-7/login".to_string(),
            task: Some("PROJ-7".to_string()),
            start_time: start,
            end_time: start + chrono::Duration::minutes(45),
            duration_ms: 45 * 60 * 1000,
        };
        tracker.track_session(&snapshot).expect("track");
        tracker.track_session(&snapshot).expect("track");
        assert_eq!(tracker.load().expect("load").sessions.len(), 2);
    }
}
