//! The four policy interceptors, registered in this order by
//! [`crate::pipeline::Pipeline::standard`].

pub mod branch_policy;
pub mod commit_message;
pub mod session_tracking;
pub mod status_gate;

pub use branch_policy::BranchPolicyInterceptor;
pub use commit_message::CommitMessageInterceptor;
pub use session_tracking::SessionTrackingInterceptor;
pub use status_gate::StatusGateInterceptor;

use anyhow::Result;

use crate::context::InvocationContext;
use crate::core::types::EnforcementMode;
use crate::io::config::Config;
use crate::logging;

/// Report a violation under `mode`; `Some(block_code)` only for BLOCK.
pub(crate) fn enforce(mode: EnforcementMode, message: &str, block_code: i32) -> Option<i32> {
    match mode {
        EnforcementMode::Off => None,
        EnforcementMode::Warn => {
            logging::user_warn(message);
            None
        }
        EnforcementMode::Block => {
            logging::user_error(message);
            Some(block_code)
        }
    }
}

/// Current branch and the task id it names.
///
/// `Ok(None)` when the branch cannot be determined (not a repository,
/// detached HEAD, rev-parse failure).
pub(crate) fn branch_task(
    ctx: &InvocationContext,
    config: &Config,
) -> Result<Option<(String, Option<String>)>> {
    let Some(branch) = ctx.current_branch() else {
        return Ok(None);
    };
    let task = config.branch_pattern()?.task_id(&branch);
    Ok(Some((branch, task)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_block_vetoes() {
        assert_eq!(enforce(EnforcementMode::Off, "m", 2), None);
        assert_eq!(enforce(EnforcementMode::Warn, "m", 2), None);
        assert_eq!(enforce(EnforcementMode::Block, "m", 2), Some(2));
    }
}
