//! Backend used when no tracker is configured.

use crate::core::types::{InternalStatus, SessionSnapshot};
use crate::tracker::{TaskDetails, TaskLookup, TaskTracker, TrackerFailure, TrackerResult};

const NOT_CONFIGURED: &str = "no tracker configured";

#[derive(Debug, Clone)]
pub struct NoTracker {
    provider: String,
}

impl NoTracker {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }
}

impl Default for NoTracker {
    fn default() -> Self {
        Self::new("none")
    }
}

impl TaskTracker for NoTracker {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn get_task_status(&self, _id: &str) -> TaskLookup {
        TaskLookup::NotFound
    }

    fn track_session(&self, _snapshot: &SessionSnapshot) -> TrackerResult<()> {
        Ok(())
    }

    fn create_subtask(&self, _parent: &str, _title: Option<&str>) -> TrackerResult<String> {
        Err(TrackerFailure::new(NOT_CONFIGURED))
    }

    fn transition_task(&self, _id: &str, _target: InternalStatus) -> TrackerResult<()> {
        Err(TrackerFailure::new(NOT_CONFIGURED))
    }

    fn get_task_details(&self, _id: &str) -> TrackerResult<TaskDetails> {
        Err(TrackerFailure::new(NOT_CONFIGURED))
    }
}
