//! Running one git invocation end to end.
//!
//! Load config, resolve the real git (exit 127 on failure), honor the opt-outs
//! and bypass list, then hand the invocation to the pipeline.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, instrument};

use crate::context::InvocationContext;
use crate::exit_codes;
use crate::io::config::{Config, load_config};
use crate::io::resolver::Resolver;
use crate::io::session_store::SessionStore;
use crate::io::settings::Settings;
use crate::logging;
use crate::pipeline::{Pipeline, is_bypass};
use crate::tracker::{NoTracker, TaskTracker, build_tracker};

/// Argument that disables every policy for one invocation; removed before git sees it.
pub const OPT_OUT_FLAG: &str = "--no-ticketgit";

/// Whether an executable named `argv0` should behave as `git`.
pub fn is_shim_name(argv0: &str) -> bool {
    Path::new(argv0)
        .file_stem()
        .is_some_and(|stem| stem.eq_ignore_ascii_case("git"))
}

/// Remove every opt-out flag; returns whether one was present.
pub fn strip_opt_out(args: &mut Vec<String>) -> bool {
    let before = args.len();
    args.retain(|arg| arg != OPT_OUT_FLAG);
    args.len() != before
}

/// Load config for an invocation; a broken config warns and falls back to defaults.
pub fn load_effective_config(settings: &Settings) -> Config {
    let mut config = match load_config(&settings.config_path) {
        Ok(config) => config,
        Err(err) => {
            logging::user_warn(&format!("ignoring config: {err:#}"));
            Config::default()
        }
    };
    settings.apply_overrides(&mut config);
    config
}

/// Run git `args` in `workdir` and return the exit code for the process.
#[instrument(skip_all, fields(command = args.first().map(String::as_str).unwrap_or("")))]
pub fn run(
    mut args: Vec<String>,
    workdir: &Path,
    env: BTreeMap<String, String>,
    settings: &Settings,
) -> i32 {
    let opted_out = strip_opt_out(&mut args);
    let config = load_effective_config(settings);

    let binary = match Resolver::from_env(&env, workdir).resolve(config.real_git.as_deref()) {
        Ok(binary) => binary,
        Err(err) => {
            logging::user_error(&format!("{err:#}"));
            return exit_codes::UNRESOLVED;
        }
    };
    let ctx = InvocationContext::new(args, workdir, env, &binary, &config.timeouts);

    if opted_out || settings.disabled || is_bypass(ctx.args()) {
        debug!(opted_out, disabled = settings.disabled, "passing straight through");
        return match ctx.passthrough_real_tool(ctx.args()) {
            Ok(code) => code,
            Err(err) => {
                logging::user_error(&format!("failed to run git: {err:#}"));
                exit_codes::UNRESOLVED
            }
        };
    }

    let state_root = settings.state_root(&config);
    let tracker = tracker_or_none(&config, &state_root);
    let pipeline = Pipeline::standard(SessionStore::new(&state_root, settings.debug));
    dispatch(&ctx, &config, tracker.as_ref(), &pipeline)
}

/// Build the configured tracker; a misconfigured backend warns and degrades to none.
pub fn tracker_or_none(config: &Config, state_root: &Path) -> Box<dyn TaskTracker> {
    match build_tracker(&config.tracker, state_root, &config.timeouts) {
        Ok(tracker) => tracker,
        Err(err) => {
            logging::user_warn(&format!("tracker unavailable: {err:#}"));
            Box::new(NoTracker::new(config.tracker.provider_name()))
        }
    }
}

/// Run the pipeline, mapping a git that cannot be started to exit 127.
pub fn dispatch(
    ctx: &InvocationContext,
    config: &Config,
    tracker: &dyn TaskTracker,
    pipeline: &Pipeline,
) -> i32 {
    match pipeline.run(ctx, config, tracker) {
        Ok(code) => code,
        Err(err) => {
            logging::user_error(&format!("failed to run git: {err:#}"));
            exit_codes::UNRESOLVED
        }
    }
}
