//! `ticketgit` entry point.
//!
//! Installed as `git` (any executable whose file stem is `git`), every
//! argument goes to the pipeline untouched. Under its own name it exposes
//! the administrative CLI, with `ticketgit exec -- <git args>` as the
//! explicit route into the pipeline.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ticketgit::admin::{self, AdminContext};
use ticketgit::core::types::InternalStatus;
use ticketgit::exit_codes;
use ticketgit::invoke;
use ticketgit::io::settings::Settings;
use ticketgit::logging;

#[derive(Parser, Debug)]
#[command(
    name = "ticketgit",
    version,
    about = "Transparent git wrapper enforcing task-tracker policies"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run git through the policy pipeline.
    Exec {
        /// Arguments for git (put them after `--`).
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the path of the real git binary.
    Resolve,
    /// Inspect or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect or reset the active tracking session.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Talk to the configured task tracker.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective config as JSON.
    Show,
    /// Write the default config.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionAction {
    /// Print the active session.
    Show,
    /// Forget the active session without reporting it.
    Clear,
}

#[derive(Subcommand, Debug)]
enum TaskAction {
    /// Print a task's raw and normalized status.
    Status { id: String },
    /// Print a task's details as JSON.
    Show { id: String },
    /// Move a task to an internal status.
    Transition { id: String, status: InternalStatus },
    /// Create a subtask and print its key.
    Subtask {
        parent: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Move a task to IN_PROGRESS and create its branch.
    Start {
        id: String,
        /// Only print the branch name.
        #[arg(long)]
        no_checkout: bool,
    },
}

fn main() {
    let args: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let env: BTreeMap<String, String> = std::env::vars_os()
        .map(|(key, value)| {
            (
                key.to_string_lossy().into_owned(),
                value.to_string_lossy().into_owned(),
            )
        })
        .collect();
    let settings = Settings::from_env(&env);
    logging::init(settings.debug);

    let workdir = match std::env::current_dir().context("resolve working directory") {
        Ok(dir) => dir,
        Err(err) => {
            logging::user_error(&format!("{err:#}"));
            std::process::exit(exit_codes::ERROR);
        }
    };

    if args.first().is_some_and(|argv0| invoke::is_shim_name(argv0)) {
        let code = invoke::run(args[1..].to_vec(), &workdir, env, &settings);
        std::process::exit(code);
    }

    let cli = Cli::parse_from(args);
    let ctx = AdminContext::new(workdir, env, settings);
    match run(cli, &ctx) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn run(cli: Cli, ctx: &AdminContext) -> Result<i32> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let code = match cli.command {
        Command::Exec { args } => {
            let code = invoke::run(args, &ctx.workdir, ctx.env.clone(), &ctx.settings);
            return Ok(code);
        }
        Command::Resolve => admin::resolve(ctx, &mut out).map(|()| exit_codes::OK)?,
        Command::Config { action } => match action {
            ConfigAction::Show => admin::config_show(ctx, &mut out).map(|()| exit_codes::OK)?,
            ConfigAction::Init { force } => {
                admin::config_init(ctx, force, &mut out).map(|()| exit_codes::OK)?
            }
        },
        Command::Session { action } => match action {
            SessionAction::Show => admin::session_show(ctx, &mut out).map(|()| exit_codes::OK)?,
            SessionAction::Clear => admin::session_clear(ctx, &mut out).map(|()| exit_codes::OK)?,
        },
        Command::Task { action } => match action {
            TaskAction::Status { id } => {
                admin::task_status(ctx, &id, &mut out).map(|()| exit_codes::OK)?
            }
            TaskAction::Show { id } => admin::task_show(ctx, &id, &mut out).map(|()| exit_codes::OK)?,
            TaskAction::Transition { id, status } => {
                admin::task_transition(ctx, &id, status, &mut out).map(|()| exit_codes::OK)?
            }
            TaskAction::Subtask { parent, title } => {
                admin::task_subtask(ctx, &parent, title.as_deref(), &mut out)
                    .map(|()| exit_codes::OK)?
            }
            TaskAction::Start { id, no_checkout } => {
                admin::task_start(ctx, &id, no_checkout, &mut out)?
            }
        },
    };
    out.flush().context("flush stdout")?;
    Ok(code)
}
