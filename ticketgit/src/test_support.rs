//! Test-only helpers: an in-memory tracker and a scripted fake `git`.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::core::types::{InternalStatus, SessionSnapshot, TaskStatus};
use crate::tracker::{TaskDetails, TaskLookup, TaskTracker, TrackerFailure, TrackerResult};

#[cfg(unix)]
pub use fake_git::{FakeGit, context};

pub const FAKE_PROVIDER: &str = "fake";

/// Tracker with canned answers that records every call.
#[derive(Debug, Default)]
pub struct FakeTracker {
    statuses: BTreeMap<String, TaskLookup>,
    details: BTreeMap<String, TaskDetails>,
    fail_sessions: bool,
    lookups: RefCell<Vec<String>>,
    sessions: RefCell<Vec<SessionSnapshot>>,
    transitions: RefCell<Vec<(String, InternalStatus)>>,
    subtasks: RefCell<Vec<(String, Option<String>)>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, key: &str, raw: &str) -> Self {
        self.statuses.insert(
            key.to_string(),
            TaskLookup::Found(TaskStatus::raw(FAKE_PROVIDER, key, raw)),
        );
        self
    }

    pub fn with_lookup_error(mut self, key: &str, message: &str) -> Self {
        self.statuses
            .insert(key.to_string(), TaskLookup::Error(message.to_string()));
        self
    }

    pub fn with_details(mut self, key: &str, summary: &str) -> Self {
        self.details.insert(
            key.to_string(),
            TaskDetails {
                key: key.to_string(),
                summary: summary.to_string(),
                description: String::new(),
                parent_key: None,
            },
        );
        self
    }

    pub fn failing_sessions(mut self) -> Self {
        self.fail_sessions = true;
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.borrow().clone()
    }

    pub fn sessions(&self) -> Vec<SessionSnapshot> {
        self.sessions.borrow().clone()
    }

    pub fn transitions(&self) -> Vec<(String, InternalStatus)> {
        self.transitions.borrow().clone()
    }

    pub fn subtasks(&self) -> Vec<(String, Option<String>)> {
        self.subtasks.borrow().clone()
    }

    fn knows(&self, key: &str) -> bool {
        self.details.contains_key(key)
            || matches!(self.statuses.get(key), Some(TaskLookup::Found(_)))
    }
}

impl TaskTracker for FakeTracker {
    fn provider(&self) -> &str {
        FAKE_PROVIDER
    }

    fn get_task_status(&self, id: &str) -> TaskLookup {
        self.lookups.borrow_mut().push(id.to_string());
        self.statuses.get(id).cloned().unwrap_or(TaskLookup::NotFound)
    }

    fn track_session(&self, snapshot: &SessionSnapshot) -> TrackerResult<()> {
        if self.fail_sessions {
            return Err(TrackerFailure::new("session endpoint down"));
        }
        self.sessions.borrow_mut().push(snapshot.clone());
        Ok(())
    }

    fn create_subtask(&self, parent: &str, title: Option<&str>) -> TrackerResult<String> {
        if !self.knows(parent) {
            return Err(TrackerFailure::new(format!("task {parent} not found")));
        }
        let mut subtasks = self.subtasks.borrow_mut();
        subtasks.push((parent.to_string(), title.map(str::to_string)));
        Ok(format!("SUB-{}", subtasks.len()))
    }

    fn transition_task(&self, id: &str, target: InternalStatus) -> TrackerResult<()> {
        if !self.knows(id) {
            return Err(TrackerFailure::new(format!("task {id} not found")));
        }
        self.transitions.borrow_mut().push((id.to_string(), target));
        Ok(())
    }

    fn get_task_details(&self, id: &str) -> TrackerResult<TaskDetails> {
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerFailure::new(format!("task {id} not found")))
    }
}

#[cfg(unix)]
mod fake_git {
    use std::collections::BTreeMap;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use crate::context::InvocationContext;
    use crate::io::config::Timeouts;

    const ARG_SEPARATOR: char = '\u{1f}';

    /// A shell script standing in for git.
    ///
    /// - appends each argv to `calls.log` (args joined by U+001F)
    /// - answers `rev-parse --abbrev-ref HEAD` from the `branch` file, or fails
    ///   with 128 when it is absent
    /// - `checkout -b <name>` rewrites the `branch` file
    /// - every other command exits with the code in `exit_code` (default 0)
    pub struct FakeGit {
        temp: TempDir,
    }

    impl FakeGit {
        pub fn new() -> Self {
            let temp = tempfile::tempdir().expect("tempdir");
            let bin = temp.path().join("bin");
            let state = temp.path().join("fake-state");
            for dir in [&bin, &state] {
                fs::create_dir_all(dir).expect("create fake git dirs");
            }
            let script = format!(
                r#"#!/bin/sh
state='{state}'
sep=$(printf '\037')
line=''
first=1
for arg in "$@"; do
  if [ "$first" = 1 ]; then line="$arg"; first=0; else line="$line$sep$arg"; fi
done
printf '%s\n' "$line" >> "$state/calls.log"
case "$1" in
  --version)
    echo "git version 2.99.0 (fake)"
    exit 0 ;;
  rev-parse)
    if [ "$2" = "--abbrev-ref" ]; then
      if [ -f "$state/branch" ]; then cat "$state/branch"; echo; exit 0; fi
      echo "fatal: not a git repository (or any of the parent directories): .git" >&2
      exit 128
    fi ;;
  checkout)
    if [ "$2" = "-b" ] && [ -n "$3" ]; then printf '%s' "$3" > "$state/branch"; fi ;;
esac
if [ -f "$state/exit_code" ]; then exit "$(cat "$state/exit_code")"; fi
exit 0
"#,
                state = state.display()
            );
            let path = bin.join("git");
            fs::write(&path, script).expect("write fake git");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod fake git");
            Self { temp }
        }

        /// Path of the fake `git` executable.
        pub fn path(&self) -> PathBuf {
            self.temp.path().join("bin").join("git")
        }

        pub fn bin_dir(&self) -> PathBuf {
            self.temp.path().join("bin")
        }

        /// Working directory for invocations.
        pub fn dir(&self) -> &Path {
            self.temp.path()
        }

        fn state(&self) -> PathBuf {
            self.temp.path().join("fake-state")
        }

        pub fn set_branch(&self, branch: &str) {
            fs::write(self.state().join("branch"), branch).expect("write branch");
        }

        pub fn clear_branch(&self) {
            let _ = fs::remove_file(self.state().join("branch"));
        }

        pub fn branch(&self) -> Option<String> {
            fs::read_to_string(self.state().join("branch")).ok()
        }

        pub fn set_exit_code(&self, code: i32) {
            fs::write(self.state().join("exit_code"), code.to_string()).expect("write exit code");
        }

        /// Every argv the fake has seen, in order.
        pub fn calls(&self) -> Vec<Vec<String>> {
            let Ok(log) = fs::read_to_string(self.state().join("calls.log")) else {
                return Vec::new();
            };
            log.lines()
                .map(|line| {
                    if line.is_empty() {
                        Vec::new()
                    } else {
                        line.split(ARG_SEPARATOR).map(str::to_string).collect()
                    }
                })
                .collect()
        }

        /// Calls other than the branch lookups interceptors make.
        pub fn user_calls(&self) -> Vec<Vec<String>> {
            self.calls()
                .into_iter()
                .filter(|call| !(call.len() == 3 && call[0] == "rev-parse" && call[1] == "--abbrev-ref"))
                .collect()
        }
    }

    impl Default for FakeGit {
        fn default() -> Self {
            Self::new()
        }
    }

    /// Invocation context running `args` against `fake`.
    pub fn context(fake: &FakeGit, args: &[&str]) -> InvocationContext {
        InvocationContext::new(
            args.iter().map(|arg| (*arg).to_string()).collect(),
            fake.dir(),
            BTreeMap::new(),
            &fake.path(),
            &Timeouts::default(),
        )
    }
}
