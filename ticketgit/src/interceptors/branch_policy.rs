//! Branch-naming policy for branch-creating commands.

use anyhow::Result;
use tracing::debug;

use crate::context::InvocationContext;
use crate::core::branch::created_branch_name;
use crate::core::types::EnforcementMode;
use crate::exit_codes;
use crate::interceptors::enforce;
use crate::io::config::Config;
use crate::pipeline::Interceptor;
use crate::tracker::{TaskLookup, TaskTracker};

/// New branches must match `branchPattern` and name a task the tracker knows.
pub struct BranchPolicyInterceptor;

impl Interceptor for BranchPolicyInterceptor {
    fn name(&self) -> &'static str {
        "branch-policy"
    }

    fn before(
        &self,
        ctx: &InvocationContext,
        config: &Config,
        tracker: &dyn TaskTracker,
    ) -> Result<Option<i32>> {
        let mode = config.enforcement.branch_policy;
        if mode == EnforcementMode::Off {
            return Ok(None);
        }
        let Some(branch) = created_branch_name(ctx.args()) else {
            return Ok(None);
        };
        let pattern = config.branch_pattern()?;
        if !pattern.is_match(&branch) {
            let message = format!(
                "branch '{branch}' does not match the required pattern {}",
                pattern.as_str()
            );
            return Ok(enforce(mode, &message, exit_codes::BRANCH_POLICY));
        }
        let Some(task) = pattern.task_id(&branch) else {
            debug!(branch = %branch, "pattern matched without a task id");
            return Ok(None);
        };
        let message = match tracker.get_task_status(&task) {
            TaskLookup::Found(_) => return Ok(None),
            TaskLookup::NotFound => {
                format!("task {task} for branch '{branch}' was not found in {}", tracker.provider())
            }
            TaskLookup::Error(err) => format!("could not verify task {task}: {err}"),
        };
        Ok(enforce(mode, &message, exit_codes::BRANCH_POLICY))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{FakeGit, FakeTracker, context};

    fn block() -> Config {
        let mut config = Config::default();
        config.enforcement.branch_policy = EnforcementMode::Block;
        config
    }

    #[test]
    fn mismatched_name_blocks() {
        let fake = FakeGit::new();
        let ctx = context(&fake, &["checkout", "-b", "feature/no-ticket"]);
        let code = BranchPolicyInterceptor
            .before(&ctx, &block(), &FakeTracker::new())
            .expect("before");
        assert_eq!(code, Some(exit_codes::BRANCH_POLICY));
    }

    #[test]
    fn known_task_passes() {
        let fake = FakeGit::new();
        let tracker = FakeTracker::new().with_status("PROJ-12", "In Progress");
        let ctx = context(&fake, &["switch", "-c", "PROJ-12/login"]);
        let code = BranchPolicyInterceptor
            .before(&ctx, &block(), &tracker)
            .expect("before");
        assert_eq!(code, None);
        assert_eq!(tracker.lookups(), vec!["PROJ-12"]);
    }

    #[test]
    fn unknown_task_and_tracker_error_block() {
        let fake = FakeGit::new();
        let ctx = context(&fake, &["checkout", "-bfeat/PROJ-12-login"]);
        assert_eq!(
            BranchPolicyInterceptor
                .before(&ctx, &block(), &FakeTracker::new())
                .expect("before"),
            Some(exit_codes::BRANCH_POLICY)
        );

        let failing = FakeTracker::new().with_lookup_error("PROJ-12", "timeout");
        assert_eq!(
            BranchPolicyInterceptor
                .before(&ctx, &block(), &failing)
                .expect("before"),
            Some(exit_codes::BRANCH_POLICY)
        );
    }

    #[test]
    fn warn_never_vetoes() {
        let fake = FakeGit::new();
        let ctx = context(&fake, &["checkout", "-b", "whatever"]);
        let code = BranchPolicyInterceptor
            .before(&ctx, &Config::default(), &FakeTracker::new())
            .expect("before");
        assert_eq!(code, None);
    }

    #[test]
    fn off_skips_tracker_entirely() {
        let fake = FakeGit::new();
        let mut config = Config::default();
        config.enforcement.branch_policy = EnforcementMode::Off;
        let tracker = FakeTracker::new();
        let ctx = context(&fake, &["checkout", "-b", "PROJ-1/x"]);
        assert_eq!(
            BranchPolicyInterceptor
                .before(&ctx, &config, &tracker)
                .expect("before"),
            None
        );
        assert!(tracker.lookups().is_empty());
    }

    #[test]
    fn non_creating_commands_are_ignored() {
        let fake = FakeGit::new();
        let tracker = FakeTracker::new();
        for args in [
            &["checkout", "main"][..],
            &["branch", "-c", "only-one"][..],
            &["commit", "-m", "x"][..],
        ] {
            let ctx = context(&fake, args);
            assert_eq!(
                BranchPolicyInterceptor
                    .before(&ctx, &block(), &tracker)
                    .expect("before"),
                None,
                "{args:?}"
            );
        }
        assert!(tracker.lookups().is_empty());
    }
}
