//! Adapter for calling the resolved real git.
//!
//! Every call layers the invocation's environment on top of the inherited one
//! and runs in the invocation's working directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::{debug, instrument, warn};

use crate::io::config::Timeouts;
use crate::io::process::{self, CommandResult};

#[derive(Debug, Clone)]
pub struct RealGit {
    binary: PathBuf,
    workdir: PathBuf,
    env: BTreeMap<String, String>,
    timeouts: Timeouts,
}

impl RealGit {
    pub fn new(
        binary: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        env: BTreeMap<String, String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            binary: binary.into(),
            workdir: workdir.into(),
            env,
            timeouts,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command<S: AsRef<str>>(&self, args: &[S]) -> Vec<String> {
        let mut cmd = Vec::with_capacity(args.len() + 1);
        cmd.push(self.binary.to_string_lossy().into_owned());
        cmd.extend(args.iter().map(|arg| arg.as_ref().to_string()));
        cmd
    }

    /// Run git with output captured, bounded by `timeouts.captureSecs`.
    pub fn capture<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandResult> {
        process::capture(
            &self.command(args),
            Some(&self.workdir),
            &self.env,
            self.timeouts.capture(),
        )
    }

    /// Run git attached to the terminal, bounded by `timeouts.passthroughSecs`.
    pub fn passthrough<S: AsRef<str>>(&self, args: &[S]) -> Result<i32> {
        process::passthrough(
            &self.command(args),
            Some(&self.workdir),
            &self.env,
            self.timeouts.passthrough(),
        )
    }

    /// Return the current branch name (errors on detached HEAD or outside a repository).
    #[instrument(skip_all)]
    pub fn current_branch(&self) -> Result<String> {
        let out = self.capture(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if !out.success() {
            debug!(exit_code = out.exit_code, stderr = %out.stderr, "rev-parse failed");
            bail!("git rev-parse failed with exit code {}", out.exit_code);
        }
        let name = out.stdout.trim().to_string();
        if name.is_empty() {
            bail!("git rev-parse returned no branch");
        }
        if name == "HEAD" {
            warn!("detached HEAD detected");
            bail!("detached HEAD");
        }
        debug!(branch = %name, "current branch");
        Ok(name)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::FakeGit;

    fn git(fake: &FakeGit) -> RealGit {
        RealGit::new(
            fake.path(),
            fake.dir(),
            BTreeMap::new(),
            Timeouts::default(),
        )
    }

    #[test]
    fn current_branch_reads_rev_parse() {
        let fake = FakeGit::new();
        fake.set_branch("PROJ-3/cleanup");
        assert_eq!(git(&fake).current_branch().expect("branch"), "PROJ-3/cleanup");
        assert_eq!(fake.calls(), vec![vec!["rev-parse", "--abbrev-ref", "HEAD"]]);
    }

    #[test]
    fn detached_head_is_an_error() {
        let fake = FakeGit::new();
        fake.set_branch("HEAD");
        let err = git(&fake).current_branch().unwrap_err();
        assert!(err.to_string().contains("detached"));
    }

    #[test]
    fn missing_repository_is_an_error() {
        let fake = FakeGit::new();
        fake.clear_branch();
        assert!(git(&fake).current_branch().is_err());
    }

    #[test]
    fn passthrough_returns_git_exit_code() {
        let fake = FakeGit::new();
        fake.set_exit_code(9);
        assert_eq!(git(&fake).passthrough(&["status"]).expect("run"), 9);
        assert_eq!(fake.calls(), vec![vec!["status"]]);
    }
}
