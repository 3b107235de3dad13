//! Side-effecting helpers: processes, the filesystem, and the environment.

pub mod atomic;
pub mod config;
pub mod git;
pub mod process;
pub mod resolver;
pub mod session_store;
pub mod settings;
