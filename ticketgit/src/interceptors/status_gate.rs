//! Work-item status gate for `commit` and `push`.

use anyhow::Result;

use crate::context::InvocationContext;
use crate::core::types::{EnforcementMode, InternalStatus};
use crate::exit_codes;
use crate::interceptors::{branch_task, enforce};
use crate::io::config::Config;
use crate::pipeline::Interceptor;
use crate::tracker::{TaskLookup, TaskTracker};

/// Commits and pushes are only allowed while the branch's task is in one of
/// the configured statuses.
pub struct StatusGateInterceptor;

fn allowed_list(allowed: &[InternalStatus]) -> String {
    allowed
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Interceptor for StatusGateInterceptor {
    fn name(&self) -> &'static str {
        "status-gate"
    }

    fn before(
        &self,
        ctx: &InvocationContext,
        config: &Config,
        tracker: &dyn TaskTracker,
    ) -> Result<Option<i32>> {
        let mode = config.enforcement.status_check;
        if mode == EnforcementMode::Off {
            return Ok(None);
        }
        let (verb, allowed, block_code) = if ctx.is_command(&["commit"]) {
            ("commit", &config.allow_commit_when, exit_codes::COMMIT_BLOCKED)
        } else if ctx.is_command(&["push"]) {
            ("push", &config.allow_push_when, exit_codes::PUSH_BLOCKED)
        } else {
            return Ok(None);
        };
        let Some((branch, task)) = branch_task(ctx, config)? else {
            return Ok(None);
        };
        let Some(task) = task else {
            let message = format!("cannot {verb}: branch '{branch}' does not name a task");
            return Ok(enforce(mode, &message, block_code));
        };

        let message = match tracker.get_task_status(&task) {
            TaskLookup::Found(status) => {
                let normalized = config.ticket_mapping.to_internal(&status);
                match normalized.internal {
                    Some(internal) if allowed.contains(&internal) => return Ok(None),
                    Some(internal) => format!(
                        "cannot {verb}: task {task} is {internal}, expected one of [{}]",
                        allowed_list(allowed)
                    ),
                    None => format!(
                        "cannot {verb}: status '{}' of task {task} is not recognized",
                        normalized.raw.as_deref().unwrap_or("")
                    ),
                }
            }
            TaskLookup::NotFound => {
                format!("cannot {verb}: task {task} was not found in {}", tracker.provider())
            }
            TaskLookup::Error(err) => format!("cannot {verb}: could not check task {task}: {err}"),
        };
        Ok(enforce(mode, &message, block_code))
    }
}
