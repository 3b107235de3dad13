//! Environment-derived settings, resolved once per process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::io::config::Config;

pub const CONFIG_ENV: &str = "TICKETGIT_CONFIG";
pub const DEBUG_ENV: &str = "TICKETGIT_DEBUG";
pub const STATE_DIR_ENV: &str = "TICKETGIT_STATE_DIR";
pub const DISABLE_ENV: &str = "TICKETGIT_DISABLE";
pub const NO_TRACKING_ENV: &str = "TICKETGIT_NO_TRACKING";

pub const STATE_DIR_NAME: &str = ".ticketgit";
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `TICKETGIT_STATE_DIR`, when set.
    pub state_root_override: Option<PathBuf>,
    /// `$HOME/.ticketgit`.
    pub default_state_root: PathBuf,
    pub config_path: PathBuf,
    pub debug: bool,
    pub disabled: bool,
    pub no_tracking: bool,
}

impl Settings {
    pub fn from_env(env: &BTreeMap<String, String>) -> Self {
        let state_root_override = non_empty(env, STATE_DIR_ENV).map(PathBuf::from);
        let default_state_root = home_dir(env).join(STATE_DIR_NAME);
        let config_path = non_empty(env, CONFIG_ENV).map_or_else(
            || {
                state_root_override
                    .as_deref()
                    .unwrap_or(&default_state_root)
                    .join(CONFIG_FILE)
            },
            PathBuf::from,
        );
        Self {
            state_root_override,
            default_state_root,
            config_path,
            debug: is_truthy(env, DEBUG_ENV),
            disabled: is_truthy(env, DISABLE_ENV),
            no_tracking: is_truthy(env, NO_TRACKING_ENV),
        }
    }

    /// Settings rooted at `dir`, used by tests.
    pub fn with_state_root(dir: &Path) -> Self {
        Self {
            state_root_override: Some(dir.to_path_buf()),
            default_state_root: dir.to_path_buf(),
            config_path: dir.join(CONFIG_FILE),
            debug: false,
            disabled: false,
            no_tracking: false,
        }
    }

    /// Environment override, then `stateRoot` from config, then `$HOME/.ticketgit`.
    pub fn state_root(&self, config: &Config) -> PathBuf {
        self.state_root_override
            .clone()
            .or_else(|| config.state_root.clone())
            .unwrap_or_else(|| self.default_state_root.clone())
    }

    /// Fold environment switches into a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.no_tracking {
            config.tracking.enabled = false;
        }
    }
}

fn non_empty<'a>(env: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

pub fn is_truthy(env: &BTreeMap<String, String>, key: &str) -> bool {
    non_empty(env, key).is_some_and(|value| {
        matches!(
            value.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn home_dir(env: &BTreeMap<String, String>) -> PathBuf {
    non_empty(env, "HOME")
        .or_else(|| non_empty(env, "USERPROFILE"))
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
