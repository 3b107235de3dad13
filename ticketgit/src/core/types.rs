//! Shared vocabulary for policy decisions.
//!
//! These types are the contract between interceptors, the status normalizer,
//! and tracker backends. They carry no I/O and serialize with stable names.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a policy reacts to a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnforcementMode {
    /// Report on stderr and let the command proceed.
    #[default]
    Warn,
    /// Report on stderr and stop with the policy's exit code.
    Block,
    /// Never evaluate the policy.
    Off,
}

/// Backend-agnostic task status. Identity only; variant order means nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStatus {
    Todo,
    InProgress,
    Review,
    Blocked,
    Done,
}

impl InternalStatus {
    pub const ALL: [InternalStatus; 5] = [
        InternalStatus::Todo,
        InternalStatus::InProgress,
        InternalStatus::Review,
        InternalStatus::Blocked,
        InternalStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InternalStatus::Todo => "TODO",
            InternalStatus::InProgress => "IN_PROGRESS",
            InternalStatus::Review => "REVIEW",
            InternalStatus::Blocked => "BLOCKED",
            InternalStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for InternalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InternalStatus {
    type Err = anyhow::Error;

    /// Accepts `IN_PROGRESS`, `in-progress`, `In Progress` and similar spellings.
    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_uppercase().replace([' ', '-'], "_");
        InternalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| anyhow!("unknown status '{value}'"))
    }
}

/// A task's status as reported by a tracker, optionally normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Tracker provider name; selects the mapping rule set.
    pub provider: String,
    /// Task key, e.g. `PROJ-123`.
    pub key: String,
    /// Literal status text from the backend.
    pub raw: Option<String>,
    /// Canonical status, filled in by the normalizer.
    pub internal: Option<InternalStatus>,
}

impl TaskStatus {
    pub fn raw(provider: &str, key: &str, raw: &str) -> Self {
        Self {
            provider: provider.to_string(),
            key: key.to_string(),
            raw: Some(raw.to_string()),
            internal: None,
        }
    }
}

/// Immutable record of a closed tracking session, handed to the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub branch: String,
    pub task: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_status_parses_loose_spellings() {
        assert_eq!(
            "in progress".parse::<InternalStatus>().expect("parse"),
            InternalStatus::InProgress
        );
        assert_eq!(
            "In-Progress".parse::<InternalStatus>().expect("parse"),
            InternalStatus::InProgress
        );
        assert_eq!(
            "done".parse::<InternalStatus>().expect("parse"),
            InternalStatus::Done
        );
        assert!("shipped".parse::<InternalStatus>().is_err());
    }

    #[test]
    fn enforcement_mode_uses_upper_case_names() {
        let json = serde_json::to_string(&EnforcementMode::Block).expect("serialize");
        assert_eq!(json, "\"BLOCK\"");
        let mode: EnforcementMode = serde_json::from_str("\"OFF\"").expect("deserialize");
        assert_eq!(mode, EnforcementMode::Off);
    }

    #[test]
    fn internal_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&InternalStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
