//! Locating and rewriting the `-m`/`--message` argument of `git commit`.

use anyhow::Result;

use crate::core::template::render_commit_message;

/// Where a commit message lives in the argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// Index of the argument holding the message text.
    pub index: usize,
    /// Text before the message inside that argument (`""`, `-m`, `-m=`, `--message=`).
    pub prefix: String,
    pub message: String,
}

/// Find the first message flag in `args` (`args[0]` is the subcommand).
///
/// Scanning stops at `--`, after which arguments are pathspecs.
pub fn find_message(args: &[String]) -> Option<MessageArg> {
    for (idx, arg) in args.iter().enumerate().skip(1) {
        if arg == "--" {
            return None;
        }
        if arg == "-m" || arg == "--message" {
            return args.get(idx + 1).map(|message| MessageArg {
                index: idx + 1,
                prefix: String::new(),
                message: message.clone(),
            });
        }
        for prefix in ["--message=", "-m=", "-m"] {
            if let Some(message) = arg.strip_prefix(prefix)
                && !message.is_empty()
            {
                return Some(MessageArg {
                    index: idx,
                    prefix: prefix.to_string(),
                    message: message.to_string(),
                });
            }
        }
    }
    None
}

/// True if `message` already mentions `task`, ignoring case.
pub fn mentions_task(message: &str, task: &str) -> bool {
    message.to_lowercase().contains(&task.to_lowercase())
}

/// Rewrite `args` so the commit message carries `task`.
///
/// Returns `None` when there is no message flag or the message already
/// mentions the task, so repeated runs never double-annotate.
pub fn annotate_args(args: &[String], task: &str, template: &str) -> Result<Option<Vec<String>>> {
    let Some(found) = find_message(args) else {
        return Ok(None);
    };
    if mentions_task(&found.message, task) {
        return Ok(None);
    }
    let message = render_commit_message(template, task, &found.message)?;
    let mut rewritten = args.to_vec();
    rewritten[found.index] = format!("{}{}", found.prefix, message);
    Ok(Some(rewritten))
}
