//! Backend that shells out to an external tracker CLI.
//!
//! The configured command (program plus leading args) gets an operation
//! suffix:
//!
//! | operation | argv suffix | stdout on exit 0 |
//! |---|---|---|
//! | status | `status <id>` | `{"status": "...", "internal": "IN_PROGRESS"?}` |
//! | details | `details <id>` | [`TaskDetails`] JSON |
//! | transition | `transition <id> <STATUS>` | ignored |
//! | subtask | `subtask <parent> [title]` | `{"key": "..."}` |
//! | session | `session <snapshot json>` | ignored |
//!
//! Exit 3 from `status`/`details` means "no such task". Any other non-zero exit
//! (including a timeout kill) is a failure carrying stderr.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Result, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::core::types::{InternalStatus, SessionSnapshot, TaskStatus};
use crate::io::process::{self, CommandResult};
use crate::tracker::{TaskDetails, TaskLookup, TaskTracker, TrackerFailure, TrackerResult};

/// Exit code the tracker CLI uses for an unknown task.
pub const NOT_FOUND_EXIT: i32 = 3;

#[derive(Debug, Clone)]
pub struct CommandTracker {
    provider: String,
    command: Vec<String>,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct StatusReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    internal: Option<InternalStatus>,
}

#[derive(Debug, Deserialize)]
struct SubtaskReply {
    key: String,
}

enum Reply {
    Ok(String),
    NotFound,
}

impl CommandTracker {
    pub fn new(provider: impl Into<String>, command: Vec<String>, timeout: Duration) -> Result<Self> {
        if command.first().is_none_or(|program| program.trim().is_empty()) {
            bail!("command tracker needs a program");
        }
        Ok(Self {
            provider: provider.into(),
            command,
            timeout,
        })
    }

    #[instrument(skip_all, fields(op = suffix.first().copied().unwrap_or("")))]
    fn call(&self, suffix: &[&str]) -> TrackerResult<Reply> {
        let mut cmd = self.command.clone();
        cmd.extend(suffix.iter().map(|arg| (*arg).to_string()));
        let result = process::capture(&cmd, None, &BTreeMap::new(), self.timeout)
            .map_err(|err| TrackerFailure::new(format!("{err:#}")))?;
        debug!(exit_code = result.exit_code, "tracker command finished");
        classify(result)
    }

    fn call_ok(&self, suffix: &[&str]) -> TrackerResult<String> {
        match self.call(suffix)? {
            Reply::Ok(stdout) => Ok(stdout),
            Reply::NotFound => Err(TrackerFailure::new(format!(
                "task {} not found",
                suffix.get(1).copied().unwrap_or_default()
            ))),
        }
    }
}

fn classify(result: CommandResult) -> TrackerResult<Reply> {
    if result.timed_out() {
        return Err(TrackerFailure::new("tracker command timed out"));
    }
    match result.exit_code {
        0 => Ok(Reply::Ok(result.stdout)),
        NOT_FOUND_EXIT => Ok(Reply::NotFound),
        code => {
            let stderr = result.stderr.trim();
            Err(TrackerFailure::new(if stderr.is_empty() {
                format!("tracker command exited with {code}")
            } else {
                stderr.to_string()
            }))
        }
    }
}

fn parse<T: DeserializeOwned>(stdout: &str) -> TrackerResult<T> {
    serde_json::from_str(stdout)
        .map_err(|err| TrackerFailure::new(format!("invalid tracker output: {err}")))
}

impl TaskTracker for CommandTracker {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn get_task_status(&self, id: &str) -> TaskLookup {
        let stdout = match self.call(&["status", id]) {
            Ok(Reply::Ok(stdout)) => stdout,
            Ok(Reply::NotFound) => return TaskLookup::NotFound,
            Err(failure) => return TaskLookup::Error(failure.0),
        };
        match parse::<StatusReply>(&stdout) {
            Ok(reply) => TaskLookup::Found(TaskStatus {
                provider: self.provider.clone(),
                key: id.to_string(),
                raw: reply.status,
                internal: reply.internal,
            }),
            Err(failure) => TaskLookup::Error(failure.0),
        }
    }

    fn track_session(&self, snapshot: &SessionSnapshot) -> TrackerResult<()> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|err| TrackerFailure::new(format!("serialize session: {err}")))?;
        self.call_ok(&["session", &payload]).map(|_| ())
    }

    fn create_subtask(&self, parent: &str, title: Option<&str>) -> TrackerResult<String> {
        let mut suffix = vec!["subtask", parent];
        if let Some(title) = title {
            suffix.push(title);
        }
        let stdout = self.call_ok(&suffix)?;
        Ok(parse::<SubtaskReply>(&stdout)?.key)
    }

    fn transition_task(&self, id: &str, target: InternalStatus) -> TrackerResult<()> {
        self.call_ok(&["transition", id, target.as_str()]).map(|_| ())
    }

    fn get_task_details(&self, id: &str) -> TrackerResult<TaskDetails> {
        let stdout = self.call_ok(&["details", id])?;
        parse(&stdout)
    }
}
