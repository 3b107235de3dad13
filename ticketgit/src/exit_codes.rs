//! Stable exit codes for the wrapper.
//!
//! Anything not listed here is the real git's own exit code, passed through.

/// Command succeeded.
pub const OK: i32 = 0;
/// Administrative subcommand failed.
pub const ERROR: i32 = 1;
/// Branch-creating command vetoed by the branch policy.
pub const BRANCH_POLICY: i32 = 2;
/// `commit` vetoed by the status gate.
pub const COMMIT_BLOCKED: i32 = 3;
/// `push` vetoed by the status gate.
pub const PUSH_BLOCKED: i32 = 4;
/// The real git binary could not be resolved or started.
pub const UNRESOLVED: i32 = 127;
/// Child killed after exceeding its timeout.
pub const TIMEOUT: i32 = -1;
