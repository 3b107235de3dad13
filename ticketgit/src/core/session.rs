//! Session state machine for elapsed-time tracking.
//!
//! Exactly one session is live at a time. Each observed invocation either
//! starts one, refreshes it, or rotates it (closing the old session into a
//! [`SessionSnapshot`] and opening a new one).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::types::SessionSnapshot;

/// Persisted active session (`session.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub branch: String,
    pub task: Option<String>,
    pub start_time: DateTime<Utc>,
    pub last_activity_time: DateTime<Utc>,
}

impl Session {
    pub fn start(branch: &str, task: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            branch: branch.to_string(),
            task: task.map(str::to_string),
            start_time: now,
            last_activity_time: now,
        }
    }

    /// Close this session at `end`.
    pub fn close(&self, end: DateTime<Utc>) -> SessionSnapshot {
        let duration_ms = (end - self.start_time).num_milliseconds().max(0) as u64;
        SessionSnapshot {
            branch: self.branch.clone(),
            task: self.task.clone(),
            start_time: self.start_time,
            end_time: end,
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateReason {
    BranchChanged,
    TimedOut,
}

/// Outcome of feeding one invocation into the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// No session was active; a new one begins.
    Started(Session),
    /// Same branch within the interval; activity time advanced.
    Refreshed(Session),
    /// The old session was closed and a new one begins.
    ///
    /// `closed` is `None` when the old session had zero duration; such a
    /// session is not worth reporting.
    Rotated {
        reason: RotateReason,
        closed: Option<SessionSnapshot>,
        next: Session,
    },
}

impl SessionTransition {
    /// The session to persist after this transition.
    pub fn session(&self) -> &Session {
        match self {
            SessionTransition::Started(session) | SessionTransition::Refreshed(session) => session,
            SessionTransition::Rotated { next, .. } => next,
        }
    }

    pub fn closed(&self) -> Option<&SessionSnapshot> {
        match self {
            SessionTransition::Rotated { closed, .. } => closed.as_ref(),
            SessionTransition::Started(_) | SessionTransition::Refreshed(_) => None,
        }
    }
}

/// Advance the session state for an invocation on `branch` at `now`.
pub fn advance(
    active: Option<&Session>,
    branch: &str,
    task: Option<&str>,
    now: DateTime<Utc>,
    interval: Duration,
) -> SessionTransition {
    let Some(active) = active else {
        return SessionTransition::Started(Session::start(branch, task, now));
    };

    let reason = if active.branch != branch {
        Some(RotateReason::BranchChanged)
    } else if now - active.last_activity_time >= interval {
        Some(RotateReason::TimedOut)
    } else {
        None
    };

    match reason {
        Some(reason) => {
            let snapshot = active.close(now);
            SessionTransition::Rotated {
                reason,
                closed: (snapshot.duration_ms > 0).then_some(snapshot),
                next: Session::start(branch, task, now),
            }
        }
        None => {
            let mut refreshed = active.clone();
            refreshed.last_activity_time = now;
            if refreshed.task.is_none() {
                refreshed.task = task.map(str::to_string);
            }
            SessionTransition::Refreshed(refreshed)
        }
    }
}
