//! Deterministic, pure logic shared by the interceptors.
//!
//! Core modules must be free of I/O side effects. They operate on arguments,
//! strings, and timestamps handed in by the caller.

pub mod branch;
pub mod commit_message;
pub mod session;
pub mod status_mapping;
pub mod template;
pub mod types;
