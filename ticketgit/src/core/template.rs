//! Rendering of user-configurable commit message and branch name templates.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::branch::slugify;

pub const DEFAULT_COMMIT_TEMPLATE: &str = "{{ task }}: {{ message }}";
pub const DEFAULT_BRANCH_TEMPLATE: &str = "{{ task }}/{{ slug }}";

/// Longest slug (in chars) derived from a task summary.
pub const SLUG_MAX_LEN: usize = 40;

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env
}

/// Render the annotated commit message for `task`.
pub fn render_commit_message(template: &str, task: &str, message: &str) -> Result<String> {
    environment()
        .render_str(template, context! { task => task, message => message })
        .with_context(|| format!("render commit message template '{template}'"))
}

/// Render a branch name for `task` from its summary.
pub fn render_branch_name(template: &str, task: &str, summary: &str) -> Result<String> {
    let slug = slugify(summary, SLUG_MAX_LEN);
    let rendered = environment()
        .render_str(
            template,
            context! { task => task, slug => slug, summary => summary },
        )
        .with_context(|| format!("render branch template '{template}'"))?;
    Ok(rendered.trim().trim_end_matches('/').to_string())
}
