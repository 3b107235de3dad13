//! Wrapper configuration, stored as `config.json` under the state root.
//!
//! JSON is the default format; a path ending in `.toml` is read and written as
//! TOML instead. Missing files and missing fields fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::branch::BranchPattern;
use crate::core::status_mapping::TicketMapping;
use crate::core::template::{DEFAULT_BRANCH_TEMPLATE, DEFAULT_COMMIT_TEMPLATE};
use crate::core::types::{EnforcementMode, InternalStatus};
use crate::io::atomic::{write_atomic, write_json_atomic};

pub const DEFAULT_BRANCH_PATTERN: &str =
    r"^(?:[a-z]+/)?(?P<task>[A-Z][A-Z0-9]+-\d+)(?:[/_-].*)?$";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Explicit path to the real git binary.
    pub real_git: Option<String>,
    pub enforcement: Enforcement,
    /// Regex for branch names; the `task` group (or first group) is the task id.
    pub branch_pattern: String,
    /// Template for `ticketgit task start` branch names.
    pub branch_template: String,
    pub allow_commit_when: Vec<InternalStatus>,
    pub allow_push_when: Vec<InternalStatus>,
    pub commit_message: CommitMessageConfig,
    pub tracking: TrackingConfig,
    /// Directory for `session.json` and friends; `TICKETGIT_STATE_DIR` wins over this.
    pub state_root: Option<PathBuf>,
    pub tracker: TrackerConfig,
    pub ticket_mapping: TicketMapping,
    pub timeouts: Timeouts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Enforcement {
    pub branch_policy: EnforcementMode,
    pub status_check: EnforcementMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct CommitMessageConfig {
    pub enabled: bool,
    /// minijinja template with `task` and `message`.
    pub template: String,
}

impl Default for CommitMessageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            template: DEFAULT_COMMIT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackingConfig {
    pub enabled: bool,
    /// Idle gap after which the active session is closed.
    pub interval_minutes: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 30,
        }
    }
}

impl TrackingConfig {
    pub fn interval(&self) -> chrono::Duration {
        let minutes = i64::try_from(self.interval_minutes)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 60_000);
        chrono::Duration::minutes(minutes)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    #[default]
    None,
    File,
    Command,
}

impl TrackerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackerKind::None => "none",
            TrackerKind::File => "file",
            TrackerKind::Command => "command",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackerConfig {
    pub kind: TrackerKind,
    /// Provider name used for status mapping; defaults to the kind name.
    pub provider: Option<String>,
    /// Task database for the `file` backend.
    pub path: Option<PathBuf>,
    /// Program and leading arguments for the `command` backend.
    pub command: Vec<String>,
}

impl TrackerConfig {
    pub fn provider_name(&self) -> String {
        self.provider
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.kind.as_str().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Timeouts {
    /// Bound for captured helper calls such as `rev-parse`.
    pub capture_secs: u64,
    /// Bound for the user's own git command.
    pub passthrough_secs: u64,
    /// Bound for a single `command` tracker call.
    pub tracker_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            capture_secs: 30,
            passthrough_secs: 24 * 60 * 60,
            tracker_secs: 20,
        }
    }
}

impl Timeouts {
    pub fn capture(&self) -> Duration {
        Duration::from_secs(self.capture_secs)
    }

    pub fn passthrough(&self) -> Duration {
        Duration::from_secs(self.passthrough_secs)
    }

    pub fn tracker(&self) -> Duration {
        Duration::from_secs(self.tracker_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            real_git: None,
            enforcement: Enforcement::default(),
            branch_pattern: DEFAULT_BRANCH_PATTERN.to_string(),
            branch_template: DEFAULT_BRANCH_TEMPLATE.to_string(),
            allow_commit_when: vec![InternalStatus::InProgress, InternalStatus::Review],
            allow_push_when: vec![
                InternalStatus::InProgress,
                InternalStatus::Review,
                InternalStatus::Done,
            ],
            commit_message: CommitMessageConfig::default(),
            tracking: TrackingConfig::default(),
            state_root: None,
            tracker: TrackerConfig::default(),
            ticket_mapping: TicketMapping::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.branch_pattern()?;
        if self.tracking.interval_minutes == 0 {
            return Err(anyhow!("tracking.intervalMinutes must be > 0"));
        }
        if self.timeouts.capture_secs == 0
            || self.timeouts.passthrough_secs == 0
            || self.timeouts.tracker_secs == 0
        {
            return Err(anyhow!("timeouts must be > 0"));
        }
        if self.tracker.kind == TrackerKind::Command
            && self
                .tracker
                .command
                .first()
                .is_none_or(|program| program.trim().is_empty())
        {
            return Err(anyhow!("tracker.command must be a non-empty array"));
        }
        Ok(())
    }

    pub fn branch_pattern(&self) -> Result<BranchPattern> {
        BranchPattern::new(&self.branch_pattern)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

/// Load config from `path`.
///
/// If the file is missing, returns `Config::default()`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config = if is_toml(path) {
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    };
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &Config) -> Result<()> {
    cfg.validate()?;
    if is_toml(path) {
        let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
        buf.push('\n');
        write_atomic(path, &buf)
    } else {
        write_json_atomic(path, cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.json")).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn write_then_load_round_trips_json_and_toml() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut cfg = Config::default();
        cfg.enforcement.branch_policy = EnforcementMode::Block;
        cfg.tracker.kind = TrackerKind::File;
        for name in ["config.json", "config.toml"] {
            let path = temp.path().join(name);
            write_config(&path, &cfg).expect("write");
            assert_eq!(load_config(&path).expect("load"), cfg, "{name}");
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{"enforcement": {"statusCheck": "BLOCK"}, "allowCommitWhen": ["IN_PROGRESS"]}"#,
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.enforcement.status_check, EnforcementMode::Block);
        assert_eq!(cfg.enforcement.branch_policy, EnforcementMode::Warn);
        assert_eq!(cfg.allow_commit_when, vec![InternalStatus::InProgress]);
        assert_eq!(cfg.branch_pattern, DEFAULT_BRANCH_PATTERN);
        assert_eq!(cfg.tracking.interval_minutes, 30);
    }

    #[test]
    fn rejects_bad_pattern_and_zero_interval() {
        let mut cfg = Config::default();
        cfg.branch_pattern = "(".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.tracking.interval_minutes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn command_tracker_requires_command() {
        let mut cfg = Config::default();
        cfg.tracker.kind = TrackerKind::Command;
        assert!(cfg.validate().is_err());
        cfg.tracker.command = vec!["tracker-cli".to_string()];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn provider_name_defaults_to_kind() {
        let mut tracker = TrackerConfig {
            kind: TrackerKind::File,
            ..TrackerConfig::default()
        };
        assert_eq!(tracker.provider_name(), "file");
        tracker.provider = Some("jira".to_string());
        assert_eq!(tracker.provider_name(), "jira");
    }
}
