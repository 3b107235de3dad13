//! Branch naming: task id extraction and parsing of branch-creating commands.

use std::ops::Range;

use anyhow::{Context, Result};
use regex::Regex;

/// Name of the capture group that holds the task id, if the pattern has one.
pub const TASK_GROUP: &str = "task";

/// Compiled branch-name pattern.
///
/// The task id is taken from the `task` named group when present, otherwise
/// from the first capturing group. A pattern without groups can validate
/// branch names but never yields a task id.
#[derive(Debug, Clone)]
pub struct BranchPattern {
    regex: Regex,
    has_task_group: bool,
}

impl BranchPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).with_context(|| format!("compile branch pattern '{pattern}'"))?;
        let has_task_group = regex
            .capture_names()
            .any(|name| name == Some(TASK_GROUP));
        Ok(Self {
            regex,
            has_task_group,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, branch: &str) -> bool {
        self.regex.is_match(branch)
    }

    /// Byte range of the task id inside `branch`.
    pub fn task_span(&self, branch: &str) -> Option<Range<usize>> {
        let captures = self.regex.captures(branch)?;
        let found = if self.has_task_group {
            captures.name(TASK_GROUP)
        } else {
            captures.get(1)
        }?;
        (!found.is_empty()).then(|| found.range())
    }

    pub fn task_id(&self, branch: &str) -> Option<String> {
        self.task_span(branch).map(|span| branch[span].to_string())
    }
}

/// Name of the branch an invocation would create, if it is a branch-creating form.
///
/// `args[0]` is the git subcommand. Recognized forms:
/// - `checkout -b|-B <name>`, `checkout -b<name>`, `checkout -b=<name>`
/// - `switch -c|-C|--create|--force-create <name>` and the attached/`=` forms
/// - `branch -c|-C|--copy <src> <name>`
///
/// The copy form reads the name two positions after the flag. The
/// single-argument copy (`branch -c <name>`, copying the current branch)
/// therefore yields `None`.
pub fn created_branch_name(args: &[String]) -> Option<String> {
    let (command, rest) = args.split_first()?;
    match command.to_lowercase().as_str() {
        "checkout" => flag_value(rest, &["-b", "-B"], &[]),
        "switch" => flag_value(rest, &["-c", "-C"], &["--create", "--force-create"]),
        "branch" => copy_target(rest),
        _ => None,
    }
}

fn flag_value(rest: &[String], short: &[&str], long: &[&str]) -> Option<String> {
    for (idx, arg) in rest.iter().enumerate() {
        if arg == "--" {
            break;
        }
        if short.contains(&arg.as_str()) || long.contains(&arg.as_str()) {
            return rest.get(idx + 1).filter(|value| !value.is_empty()).cloned();
        }
        for flag in short {
            if let Some(value) = arg.strip_prefix(flag) {
                let value = value.strip_prefix('=').unwrap_or(value);
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
        for flag in long {
            if let Some(value) = arg.strip_prefix(flag).and_then(|v| v.strip_prefix('='))
                && !value.is_empty()
            {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn copy_target(rest: &[String]) -> Option<String> {
    let idx = rest
        .iter()
        .position(|arg| arg == "-c" || arg == "-C" || arg == "--copy")?;
    rest.get(idx + 2).cloned()
}

/// Lower-case `text`, collapse non-alphanumerics to `-`, cap at `max_len` chars.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug.chars().take(max_len).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
