//! Per-invocation context handed to every interceptor.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::io::config::Timeouts;
use crate::io::git::RealGit;
use crate::io::process::CommandResult;

/// One git invocation: raw arguments, where it runs, and how to reach the real git.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    args: Vec<String>,
    workdir: PathBuf,
    env: BTreeMap<String, String>,
    command: Option<String>,
    git: RealGit,
}

impl InvocationContext {
    pub fn new(
        args: Vec<String>,
        workdir: &Path,
        env: BTreeMap<String, String>,
        binary: &Path,
        timeouts: &Timeouts,
    ) -> Self {
        let command = args.first().map(|arg| arg.to_lowercase());
        let git = RealGit::new(binary, workdir, env.clone(), timeouts.clone());
        Self {
            args,
            workdir: workdir.to_path_buf(),
            env,
            command,
            git,
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// First argument, lower-cased.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn git(&self) -> &RealGit {
        &self.git
    }

    pub fn is_command(&self, names: &[&str]) -> bool {
        self.command().is_some_and(|command| names.contains(&command))
    }

    /// Whether any argument equals one of `flags` exactly.
    pub fn has_flag(&self, flags: &[&str]) -> bool {
        self.args.iter().any(|arg| flags.contains(&arg.as_str()))
    }

    pub fn capture_real_tool<S: AsRef<str>>(&self, args: &[S]) -> Result<CommandResult> {
        self.git.capture(args)
    }

    pub fn passthrough_real_tool<S: AsRef<str>>(&self, args: &[S]) -> Result<i32> {
        self.git.passthrough(args)
    }

    /// Current branch, or `None` outside a repository or on a detached HEAD.
    pub fn current_branch(&self) -> Option<String> {
        self.git.current_branch().ok()
    }
}
