//! Persistence for the active session (`session.json`) and the debug
//! `tracking.log` channel under the state root.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

use crate::core::session::Session;
use crate::io::atomic::write_json_atomic;

pub const SESSION_FILE: &str = "session.json";
pub const TRACKING_LOG_FILE: &str = "tracking.log";

/// Append-only diagnostic log, active only in debug mode.
#[derive(Debug, Clone)]
pub struct DebugLog {
    path: PathBuf,
    enabled: bool,
}

impl DebugLog {
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            path: path.into(),
            enabled,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line. Failures are traced and dropped.
    pub fn log(&self, message: &str) {
        debug!(target: "ticketgit::tracking", "{message}");
        if !self.enabled {
            return;
        }
        if let Err(err) = self.append(message) {
            debug!(path = %self.path.display(), err = %err, "tracking log write failed");
        }
    }

    fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(file, "{} {message}", Utc::now().to_rfc3339())
            .with_context(|| format!("append {}", self.path.display()))?;
        Ok(())
    }
}

/// Single active session, identified by the presence of `session.json`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    log: DebugLog,
}

impl SessionStore {
    pub fn new(state_root: &Path, debug: bool) -> Self {
        Self {
            path: state_root.join(SESSION_FILE),
            log: DebugLog::new(state_root.join(TRACKING_LOG_FILE), debug),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn debug_log(&self) -> &DebugLog {
        &self.log
    }

    /// Load the active session. Missing, unreadable and corrupt files all
    /// count as "no session"; the latter two are logged.
    pub fn load(&self) -> Option<Session> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                self.log
                    .log(&format!("failed to read {}: {err}", self.path.display()));
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(session) => Some(session),
            Err(err) => {
                self.log
                    .log(&format!("ignoring corrupt {}: {err}", self.path.display()));
                None
            }
        }
    }

    /// Replace the active session (temp file + rename).
    pub fn save(&self, session: &Session) -> Result<()> {
        debug!(path = %self.path.display(), branch = %session.branch, "saving session");
        write_json_atomic(&self.path, session)
    }

    /// Remove the active session; a missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", self.path.display())),
        }
    }

    pub fn log(&self, message: &str) {
        self.log.log(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session() -> Session {
        let start = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        Session::start("PROJ-1/work", Some("PROJ-1"), start)
    }

    #[test]
    fn missing_file_is_no_session() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path(), false);
        assert_eq!(store.load(), None);
        store.clear().expect("clear missing");
    }

    #[test]
    fn save_load_clear() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(&temp.path().join("nested"), false);
        store.save(&session()).expect("save");
        assert_eq!(store.load(), Some(session()));
        store.clear().expect("clear");
        assert!(!store.path().exists());
    }

    #[test]
    fn corrupt_file_is_no_session_and_logged_in_debug() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path(), true);
        fs::write(store.path(), "{not json").expect("write");
        assert_eq!(store.load(), None);

        let log = fs::read_to_string(store.debug_log().path()).expect("read log");
        assert!(log.contains("ignoring corrupt"), "{log}");
    }

    #[test]
    fn tracking_log_is_silent_without_debug() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(temp.path(), false);
        store.log("hello");
        assert!(!store.debug_log().path().exists());
    }

    #[test]
    fn tracking_log_appends() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = DebugLog::new(temp.path().join(TRACKING_LOG_FILE), true);
        log.log("first");
        log.log("second");
        let contents = fs::read_to_string(log.path()).expect("read");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" first"));
        assert!(lines[1].ends_with(" second"));
    }
}
