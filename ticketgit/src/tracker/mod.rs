//! Task-tracker adapter contract and the closed set of backends.
//!
//! Adapter failures are values ([`TaskLookup::Error`], [`TrackerFailure`]);
//! policies decide what a failure means, adapters never abort the pipeline.

pub mod command;
pub mod file;
pub mod none;

use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::types::{InternalStatus, SessionSnapshot, TaskStatus};
use crate::io::config::{Timeouts, TrackerConfig, TrackerKind};

pub use command::CommandTracker;
pub use file::FileTracker;
pub use none::NoTracker;

/// Outcome of a status lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskLookup {
    Found(TaskStatus),
    NotFound,
    Error(String),
}

/// A tracker operation that did not succeed, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerFailure(pub String);

impl TrackerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for TrackerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for TrackerFailure {}

pub type TrackerResult<T> = std::result::Result<T, TrackerFailure>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub key: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_key: Option<String>,
}

pub trait TaskTracker {
    /// Provider name reported in [`TaskStatus::provider`].
    fn provider(&self) -> &str;

    fn get_task_status(&self, id: &str) -> TaskLookup;

    /// Report a closed session. Best effort: callers log and drop failures.
    fn track_session(&self, snapshot: &SessionSnapshot) -> TrackerResult<()>;

    /// Create a subtask under `parent` and return its key.
    fn create_subtask(&self, parent: &str, title: Option<&str>) -> TrackerResult<String>;

    fn transition_task(&self, id: &str, target: InternalStatus) -> TrackerResult<()>;

    fn get_task_details(&self, id: &str) -> TrackerResult<TaskDetails>;
}

/// Build the configured backend.
pub fn build_tracker(
    config: &TrackerConfig,
    state_root: &Path,
    timeouts: &Timeouts,
) -> Result<Box<dyn TaskTracker>> {
    let provider = config.provider_name();
    let tracker: Box<dyn TaskTracker> = match config.kind {
        TrackerKind::None => Box::new(NoTracker::new(provider)),
        TrackerKind::File => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| state_root.join(file::TASKS_FILE));
            Box::new(FileTracker::new(provider, path))
        }
        TrackerKind::Command => Box::new(CommandTracker::new(
            provider,
            config.command.clone(),
            timeouts.tracker(),
        )?),
    };
    Ok(tracker)
}
