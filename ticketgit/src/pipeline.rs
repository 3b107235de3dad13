//! Ordered interceptor pipeline around one real git invocation.
//!
//! Before-hooks run in registration order; the first `Some(code)` vetoes the
//! invocation and becomes the exit code (after-hooks are skipped). Otherwise
//! the real command runs attached to the terminal and after-hooks see its exit
//! code; the first `Some(code)` from an after-hook replaces it and ends the
//! chain. A hook that errors is logged and treated as `None`.

use anyhow::Result;
use tracing::{debug, instrument, warn};

use crate::context::InvocationContext;
use crate::interceptors::{
    BranchPolicyInterceptor, CommitMessageInterceptor, SessionTrackingInterceptor,
    StatusGateInterceptor,
};
use crate::io::config::Config;
use crate::io::session_store::SessionStore;
use crate::tracker::TaskTracker;

/// Commands that never go through policies.
pub const BYPASS_COMMANDS: [&str; 6] = [
    "help",
    "--version",
    "--exec-path",
    "config",
    "rev-parse",
    "for-each-ref",
];

/// Flags git's shell completion passes when asking for command or option lists
/// (`--list-cmds=...`, `--git-completion-helper`, `--git-completion-helper-all`).
pub const COMPLETION_FLAG_PREFIXES: [&str; 2] = ["--list-cmds", "--git-completion-helper"];

pub trait Interceptor {
    fn name(&self) -> &'static str;

    /// Inspect the invocation before it runs. `Some(code)` vetoes it.
    fn before(
        &self,
        _ctx: &InvocationContext,
        _config: &Config,
        _tracker: &dyn TaskTracker,
    ) -> Result<Option<i32>> {
        Ok(None)
    }

    /// React to the real exit code. `Some(code)` replaces it.
    fn after(
        &self,
        _ctx: &InvocationContext,
        _exit_code: i32,
        _config: &Config,
        _tracker: &dyn TaskTracker,
    ) -> Result<Option<i32>> {
        Ok(None)
    }
}

/// Whether `args` must skip the pipeline and pass straight through.
pub fn is_bypass(args: &[String]) -> bool {
    let by_command = args
        .first()
        .is_some_and(|first| BYPASS_COMMANDS.contains(&first.to_lowercase().as_str()));
    by_command
        || args.iter().any(|arg| {
            COMPLETION_FLAG_PREFIXES
                .iter()
                .any(|prefix| arg.starts_with(prefix))
        })
}

pub struct Pipeline {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new(interceptors: Vec<Box<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    /// Branch policy, status gate, commit message, session tracking.
    pub fn standard(store: SessionStore) -> Self {
        Self::new(vec![
            Box::new(BranchPolicyInterceptor),
            Box::new(StatusGateInterceptor),
            Box::new(CommitMessageInterceptor),
            Box::new(SessionTrackingInterceptor::new(store)),
        ])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run the invocation. Errors only when the real git cannot be started.
    #[instrument(skip_all, fields(command = ctx.command().unwrap_or("")))]
    pub fn run(
        &self,
        ctx: &InvocationContext,
        config: &Config,
        tracker: &dyn TaskTracker,
    ) -> Result<i32> {
        for interceptor in &self.interceptors {
            match interceptor.before(ctx, config, tracker) {
                Ok(Some(code)) => {
                    debug!(interceptor = interceptor.name(), code, "vetoed");
                    return Ok(code);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(interceptor = interceptor.name(), "before hook failed: {err:#}");
                }
            }
        }

        let mut exit_code = ctx.passthrough_real_tool(ctx.args())?;

        for interceptor in &self.interceptors {
            match interceptor.after(ctx, exit_code, config, tracker) {
                Ok(Some(code)) => {
                    debug!(interceptor = interceptor.name(), code, "exit code replaced");
                    exit_code = code;
                    break;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(interceptor = interceptor.name(), "after hook failed: {err:#}");
                }
            }
        }
        Ok(exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    #[test]
    fn bypass_commands_and_completion() {
        assert!(is_bypass(&args(&["--version"])));
        assert!(is_bypass(&args(&["Config", "user.name"])));
        assert!(is_bypass(&args(&["rev-parse", "HEAD"])));
        assert!(is_bypass(&args(&["--list-cmds=main,others"])));
        assert!(is_bypass(&args(&["commit", "--git-completion-helper"])));
        assert!(is_bypass(&args(&["push", "--git-completion-helper-all"])));
        assert!(!is_bypass(&args(&["commit", "-m", "config"])));
        assert!(!is_bypass(&args(&[])));
    }

    #[test]
    fn standard_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pipeline = Pipeline::standard(SessionStore::new(temp.path(), false));
        assert_eq!(
            pipeline.names(),
            vec![
                "branch-policy",
                "status-gate",
                "commit-message",
                "session-tracking"
            ]
        );
    }
}
