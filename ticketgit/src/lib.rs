//! Transparent git wrapper enforcing task-tracker policies.
//!
//! Each git invocation passes through an ordered pipeline of interceptors
//! (branch naming, status gate, commit-message annotation, session tracking)
//! before and after the real git runs with full terminal fidelity.
//!
//! - **[`core`]**: pure logic (branch parsing, status normalization, session
//!   state machine, templates). No I/O.
//! - **[`io`]**: processes, binary resolution, config, persisted state.
//! - **[`tracker`]**: the task-tracker contract and its backends.
//!
//! [`invoke`] and [`admin`] wire these together for the binary.

pub mod admin;
pub mod context;
pub mod core;
pub mod exit_codes;
pub mod interceptors;
pub mod invoke;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tracker;
