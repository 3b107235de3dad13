//! Crash-safe file replacement shared by the state writers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// If the temp file cannot be written or renamed (read-only directories, some
/// network or Windows filesystems), the temp file is removed and `path` is
/// overwritten directly, once.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = temp_path(path);
    if let Err(err) = replace_via(&tmp_path, path, contents) {
        warn!(path = %path.display(), "atomic write failed, overwriting in place: {err:#}");
        let _ = fs::remove_file(&tmp_path);
        fs::write(path, contents).with_context(|| format!("overwrite {}", path.display()))?;
    }
    Ok(())
}

fn replace_via(tmp_path: &Path, path: &Path, contents: &str) -> Result<()> {
    fs::write(tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(tmp_path, path).with_context(|| format!("rename onto {}", path.display()))
}

/// Serialize `value` as pretty JSON with a trailing newline and write it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
