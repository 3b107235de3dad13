//! Locating the real `git` binary without ever resolving to ourselves.
//!
//! Candidates, first valid one wins:
//! 1. `TICKETGIT_GIT`
//! 2. the config hint (`realGit`), if non-blank
//! 3. every `git` on `PATH`, in order
//! 4. fixed OS install locations
//!
//! A candidate is valid when its canonical path is an existing, executable
//! regular file that is not the running wrapper. Identity is checked by path
//! and, on Unix, by device and inode, so hard links to the wrapper are
//! rejected too. When `ticketgit` is installed
//! as `git` early on `PATH`, the first PATH hit is the wrapper itself; it is
//! skipped and the next one is used.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, instrument};

pub const REAL_TOOL: &str = "git";
pub const OVERRIDE_ENV: &str = "TICKETGIT_GIT";

#[derive(Debug, Clone)]
pub struct Resolver {
    env_override: Option<String>,
    path_var: Option<OsString>,
    fallbacks: Vec<PathBuf>,
    self_exe: Option<PathBuf>,
    cwd: PathBuf,
}

impl Resolver {
    /// Build a resolver from an environment snapshot and the running executable.
    pub fn from_env(env: &BTreeMap<String, String>, cwd: &Path) -> Self {
        Self {
            env_override: env.get(OVERRIDE_ENV).cloned(),
            path_var: env.get("PATH").map(OsString::from),
            fallbacks: default_fallbacks(),
            self_exe: std::env::current_exe().ok(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// A resolver with no candidates besides the ones configured on it.
    pub fn empty(cwd: &Path) -> Self {
        Self {
            env_override: None,
            path_var: None,
            fallbacks: Vec::new(),
            self_exe: None,
            cwd: cwd.to_path_buf(),
        }
    }

    pub fn with_override(mut self, path: impl Into<String>) -> Self {
        self.env_override = Some(path.into());
        self
    }

    pub fn with_path_var(mut self, path_var: impl Into<OsString>) -> Self {
        self.path_var = Some(path_var.into());
        self
    }

    pub fn with_fallbacks(mut self, fallbacks: Vec<PathBuf>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Treat `path` as the running wrapper executable.
    pub fn with_self_exe(mut self, path: impl Into<PathBuf>) -> Self {
        self.self_exe = Some(path.into());
        self
    }

    /// Resolve the real binary to an absolute canonical path.
    #[instrument(skip_all)]
    pub fn resolve(&self, config_hint: Option<&str>) -> Result<PathBuf> {
        let own = self.self_exe.as_deref().and_then(OwnExe::locate);
        for candidate in self.candidates(config_hint) {
            match validate_candidate(&candidate, own.as_ref()) {
                Ok(path) => {
                    debug!(path = %path.display(), "resolved real binary");
                    return Ok(path);
                }
                Err(err) => debug!(candidate = %candidate.display(), reason = %err, "rejected candidate"),
            }
        }
        bail!(
            "could not find the real `{REAL_TOOL}` binary (set {OVERRIDE_ENV} or `realGit` in the config)"
        )
    }

    fn candidates(&self, config_hint: Option<&str>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        let explicit = [self.env_override.as_deref(), config_hint];
        for value in explicit.into_iter().flatten() {
            let value = value.trim();
            if !value.is_empty() {
                candidates.push(self.cwd.join(value));
            }
        }
        if let Some(path_var) = &self.path_var {
            match which::which_in_all(REAL_TOOL, Some(path_var), &self.cwd) {
                Ok(found) => candidates.extend(found),
                Err(err) => debug!(err = %err, "PATH search failed"),
            }
        }
        candidates.extend(self.fallbacks.iter().cloned());
        candidates
    }
}

/// The running wrapper, as a canonical path plus its file metadata.
#[derive(Debug)]
struct OwnExe {
    path: PathBuf,
    metadata: fs::Metadata,
}

impl OwnExe {
    fn locate(path: &Path) -> Option<Self> {
        let path = fs::canonicalize(path).ok()?;
        let metadata = fs::metadata(&path).ok()?;
        Some(Self { path, metadata })
    }

    fn is(&self, path: &Path, metadata: &fs::Metadata) -> bool {
        self.path == path || same_inode(&self.metadata, metadata)
    }
}

#[cfg(unix)]
fn same_inode(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_inode(_a: &fs::Metadata, _b: &fs::Metadata) -> bool {
    false
}

fn validate_candidate(candidate: &Path, own: Option<&OwnExe>) -> Result<PathBuf> {
    let canonical = fs::canonicalize(candidate).context("does not exist")?;
    let metadata = fs::metadata(&canonical).context("unreadable metadata")?;
    if !metadata.is_file() {
        bail!("not a regular file");
    }
    if !is_executable(&canonical, &metadata) {
        bail!("not executable");
    }
    if own.is_some_and(|own| own.is(&canonical, &metadata)) {
        bail!("is this wrapper");
    }
    Ok(canonical)
}

#[cfg(unix)]
fn is_executable(_path: &Path, metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(windows)]
fn is_executable(path: &Path, _metadata: &fs::Metadata) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ["exe", "cmd", "bat", "com"].contains(&ext.to_ascii_lowercase().as_str()))
}

#[cfg(not(any(unix, windows)))]
fn is_executable(_path: &Path, _metadata: &fs::Metadata) -> bool {
    true
}

fn default_fallbacks() -> Vec<PathBuf> {
    let paths: &[&str] = if cfg!(windows) {
        &[
            r"C:\Program Files\Git\cmd\git.exe",
            r"C:\Program Files\Git\bin\git.exe",
            r"C:\Program Files (x86)\Git\cmd\git.exe",
        ]
    } else {
        &[
            "/usr/bin/git",
            "/usr/local/bin/git",
            "/opt/homebrew/bin/git",
            "/bin/git",
        ]
    };
    paths.iter().map(PathBuf::from).collect()
}
