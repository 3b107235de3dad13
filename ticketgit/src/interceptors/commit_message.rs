//! Prefixes commit messages with the branch's task id.

use anyhow::Result;
use tracing::debug;

use crate::context::InvocationContext;
use crate::core::commit_message::annotate_args;
use crate::interceptors::branch_task;
use crate::io::config::Config;
use crate::pipeline::Interceptor;
use crate::tracker::TaskTracker;

/// Rewrites `commit -m <msg>` to carry the task id and runs the rewritten
/// command itself; its exit code is returned as the veto so the original
/// command never runs.
pub struct CommitMessageInterceptor;

impl Interceptor for CommitMessageInterceptor {
    fn name(&self) -> &'static str {
        "commit-message"
    }

    fn before(
        &self,
        ctx: &InvocationContext,
        config: &Config,
        _tracker: &dyn TaskTracker,
    ) -> Result<Option<i32>> {
        if !config.commit_message.enabled || !ctx.is_command(&["commit"]) {
            return Ok(None);
        }
        let Some((_, Some(task))) = branch_task(ctx, config)? else {
            return Ok(None);
        };
        let Some(args) = annotate_args(ctx.args(), &task, &config.commit_message.template)? else {
            return Ok(None);
        };
        debug!(task = %task, "running annotated commit");
        Ok(Some(ctx.passthrough_real_tool(&args)?))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_support::{FakeGit, FakeTracker, context};

    fn run(fake: &FakeGit, args: &[&str], config: &Config) -> Option<i32> {
        CommitMessageInterceptor
            .before(&context(fake, args), config, &FakeTracker::new())
            .expect("before")
    }

    #[test]
    fn prefixes_message_and_runs_commit() {
        let fake = FakeGit::new();
        fake.set_branch("PROJ-7/login");
        fake.set_exit_code(0);
        let code = run(&fake, &["commit", "-m", "fix login"], &Config::default());
        assert_eq!(code, Some(0));
        assert_eq!(
            fake.calls(),
            vec![
                vec!["rev-parse", "--abbrev-ref", "HEAD"],
                vec!["commit", "-m", "PROJ-7: fix login"],
            ]
        );
    }

    #[test]
    fn keeps_equals_form_and_real_exit_code() {
        let fake = FakeGit::new();
        fake.set_branch("PROJ-7/login");
        fake.set_exit_code(1);
        let code = run(&fake, &["commit", "-a", "--message=wip"], &Config::default());
        assert_eq!(code, Some(1));
        assert_eq!(fake.calls()[1], vec!["commit", "-a", "--message=PROJ-7: wip"]);
    }

    #[test]
    fn already_annotated_message_is_untouched() {
        let fake = FakeGit::new();
        fake.set_branch("PROJ-7/login");
        assert_eq!(
            run(&fake, &["commit", "-m", "proj-7 fix"], &Config::default()),
            None
        );
        assert_eq!(fake.calls().len(), 1);
    }

    #[test]
    fn custom_template() {
        let fake = FakeGit::new();
        fake.set_branch("PROJ-7/login");
        let mut config = Config::default();
        config.commit_message.template = "[{{ task }}] {{ message }}".to_string();
        run(&fake, &["commit", "-m", "fix"], &config);
        assert_eq!(fake.calls()[1], vec!["commit", "-m", "[PROJ-7] fix"]);
    }

    #[test]
    fn no_op_without_message_task_or_when_disabled() {
        let fake = FakeGit::new();
        fake.set_branch("PROJ-7/login");
        assert_eq!(run(&fake, &["commit", "--amend"], &Config::default()), None);

        fake.set_branch("main");
        assert_eq!(run(&fake, &["commit", "-m", "x"], &Config::default()), None);

        let mut disabled = Config::default();
        disabled.commit_message.enabled = false;
        fake.set_branch("PROJ-7/login");
        assert_eq!(run(&fake, &["commit", "-m", "x"], &disabled), None);

        assert!(
            fake.calls()
                .iter()
                .all(|call| call.first().map(String::as_str) == Some("rev-parse"))
        );
    }
}
