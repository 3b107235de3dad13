//! Administrative subcommands of the `ticketgit` binary.
//!
//! Unlike the git path, these surface problems as errors (exit 1) instead of
//! degrading to defaults.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::template::render_branch_name;
use crate::core::types::InternalStatus;
use crate::invoke;
use crate::io::config::{Config, load_config, write_config};
use crate::io::resolver::Resolver;
use crate::io::session_store::SessionStore;
use crate::io::settings::Settings;
use crate::logging;
use crate::tracker::{TaskLookup, TaskTracker, build_tracker};

/// Process environment the subcommands run in.
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub workdir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub settings: Settings,
}

impl AdminContext {
    pub fn new(workdir: PathBuf, env: BTreeMap<String, String>, settings: Settings) -> Self {
        Self {
            workdir,
            env,
            settings,
        }
    }

    /// Effective config; a broken config file is an error here.
    pub fn config(&self) -> Result<Config> {
        let mut config = load_config(&self.settings.config_path)?;
        self.settings.apply_overrides(&mut config);
        Ok(config)
    }

    fn session_store(&self, config: &Config) -> SessionStore {
        SessionStore::new(&self.settings.state_root(config), self.settings.debug)
    }

    fn tracker(&self, config: &Config) -> Result<Box<dyn TaskTracker>> {
        build_tracker(
            &config.tracker,
            &self.settings.state_root(config),
            &config.timeouts,
        )
    }
}

pub fn resolve(ctx: &AdminContext, out: &mut impl Write) -> Result<()> {
    let config = ctx.config()?;
    let path = Resolver::from_env(&ctx.env, &ctx.workdir).resolve(config.real_git.as_deref())?;
    writeln!(out, "{}", path.display())?;
    Ok(())
}

pub fn config_show(ctx: &AdminContext, out: &mut impl Write) -> Result<()> {
    let config = ctx.config()?;
    let json = serde_json::to_string_pretty(&config).context("serialize config")?;
    writeln!(out, "{json}")?;
    Ok(())
}

pub fn config_init(ctx: &AdminContext, force: bool, out: &mut impl Write) -> Result<()> {
    let path = &ctx.settings.config_path;
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &Config::default())?;
    writeln!(out, "wrote {}", path.display())?;
    Ok(())
}

pub fn session_show(ctx: &AdminContext, out: &mut impl Write) -> Result<()> {
    let config = ctx.config()?;
    match ctx.session_store(&config).load() {
        Some(session) => {
            let json = serde_json::to_string_pretty(&session).context("serialize session")?;
            writeln!(out, "{json}")?;
        }
        None => writeln!(out, "no active session")?,
    }
    Ok(())
}

pub fn session_clear(ctx: &AdminContext, out: &mut impl Write) -> Result<()> {
    let config = ctx.config()?;
    let store = ctx.session_store(&config);
    store.clear()?;
    writeln!(out, "cleared {}", store.path().display())?;
    Ok(())
}

pub fn task_status(ctx: &AdminContext, id: &str, out: &mut impl Write) -> Result<()> {
    let config = ctx.config()?;
    let tracker = ctx.tracker(&config)?;
    let status = match tracker.get_task_status(id) {
        TaskLookup::Found(status) => config.ticket_mapping.to_internal(&status),
        TaskLookup::NotFound => bail!("task {id} not found in {}", tracker.provider()),
        TaskLookup::Error(err) => bail!("could not look up {id}: {err}"),
    };
    let internal = status
        .internal
        .map_or_else(|| "unmapped".to_string(), |internal| internal.to_string());
    writeln!(
        out,
        "{id}: {} ({internal})",
        status.raw.as_deref().unwrap_or("-")
    )?;
    Ok(())
}

pub fn task_show(ctx: &AdminContext, id: &str, out: &mut impl Write) -> Result<()> {
    let config = ctx.config()?;
    let details = ctx
        .tracker(&config)?
        .get_task_details(id)
        .map_err(|err| anyhow!("could not fetch {id}: {err}"))?;
    let json = serde_json::to_string_pretty(&details).context("serialize details")?;
    writeln!(out, "{json}")?;
    Ok(())
}

pub fn task_transition(
    ctx: &AdminContext,
    id: &str,
    target: InternalStatus,
    out: &mut impl Write,
) -> Result<()> {
    let config = ctx.config()?;
    ctx.tracker(&config)?
        .transition_task(id, target)
        .map_err(|err| anyhow!("could not move {id} to {target}: {err}"))?;
    writeln!(out, "{id} -> {target}")?;
    Ok(())
}

pub fn task_subtask(
    ctx: &AdminContext,
    parent: &str,
    title: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let config = ctx.config()?;
    let key = ctx
        .tracker(&config)?
        .create_subtask(parent, title)
        .map_err(|err| anyhow!("could not create subtask of {parent}: {err}"))?;
    writeln!(out, "{key}")?;
    Ok(())
}

/// Render the branch `task start` would create for `id`.
pub fn start_branch(config: &Config, tracker: &dyn TaskTracker, id: &str) -> Result<String> {
    let details = tracker
        .get_task_details(id)
        .map_err(|err| anyhow!("could not fetch {id}: {err}"))?;
    let branch = render_branch_name(&config.branch_template, id, &details.summary)?;
    let pattern = config.branch_pattern()?;
    if pattern.task_id(&branch).as_deref() != Some(id) {
        bail!(
            "branch '{branch}' from branchTemplate does not yield task {id} under branchPattern {}",
            pattern.as_str()
        );
    }
    Ok(branch)
}

/// Move `id` to IN_PROGRESS and check out its branch through the pipeline.
///
/// Returns the exit code of the checkout (0 with `no_checkout`).
pub fn task_start(
    ctx: &AdminContext,
    id: &str,
    no_checkout: bool,
    out: &mut impl Write,
) -> Result<i32> {
    let config = ctx.config()?;
    let tracker = ctx.tracker(&config)?;
    let branch = start_branch(&config, tracker.as_ref(), id)?;
    if let Err(err) = tracker.transition_task(id, InternalStatus::InProgress) {
        logging::user_warn(&format!("could not move {id} to IN_PROGRESS: {err}"));
    }
    writeln!(out, "{branch}")?;
    if no_checkout {
        return Ok(0);
    }
    out.flush()?;
    Ok(invoke::run(
        vec!["checkout".to_string(), "-b".to_string(), branch],
        &ctx.workdir,
        ctx.env.clone(),
        &ctx.settings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::TrackerKind;
    use crate::test_support::FakeTracker;
    use crate::tracker::file::{TASKS_FILE, TaskDb, TaskRecord};
    use crate::tracker::FileTracker;

    fn admin(dir: &std::path::Path) -> AdminContext {
        AdminContext::new(
            dir.to_path_buf(),
            BTreeMap::new(),
            Settings::with_state_root(dir),
        )
    }

    fn with_file_tracker(ctx: &AdminContext) {
        let mut config = Config::default();
        config.tracker.kind = TrackerKind::File;
        write_config(&ctx.settings.config_path, &config).expect("write config");
        let tracker = FileTracker::new("file", ctx.workdir.join(TASKS_FILE));
        let mut db = TaskDb::default();
        db.tasks.insert(
            "PROJ-4".to_string(),
            TaskRecord {
                status: Some("Selected for Development".to_string()),
                summary: "Add OAuth login!".to_string(),
                ..TaskRecord::default()
            },
        );
        tracker.save(&db).expect("seed");
    }

    fn output(run: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        run(&mut buf).expect("command");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn config_init_refuses_to_overwrite() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = admin(temp.path());
        output(|out| config_init(&ctx, false, out));
        let mut sink = Vec::new();
        assert!(config_init(&ctx, false, &mut sink).is_err());
        output(|out| config_init(&ctx, true, out));
        assert_eq!(ctx.config().expect("config"), Config::default());
    }

    #[test]
    fn config_show_is_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = admin(temp.path());
        let text = output(|out| config_show(&ctx, out));
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["enforcement"]["branchPolicy"], "WARN");
    }

    #[test]
    fn session_show_without_session() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = admin(temp.path());
        assert_eq!(output(|out| session_show(&ctx, out)), "no active session\n");
        output(|out| session_clear(&ctx, out));
    }

    #[test]
    fn task_commands_against_file_tracker() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = admin(temp.path());
        with_file_tracker(&ctx);

        assert_eq!(
            output(|out| task_status(&ctx, "PROJ-4", out)),
            "PROJ-4: Selected for Development (unmapped)\n"
        );
        output(|out| task_transition(&ctx, "PROJ-4", InternalStatus::Review, out));
        assert_eq!(
            output(|out| task_status(&ctx, "PROJ-4", out)),
            "PROJ-4: REVIEW (REVIEW)\n"
        );
        assert_eq!(
            output(|out| task_subtask(&ctx, "PROJ-4", Some("docs"), out)),
            "PROJ-5\n"
        );
        let shown = output(|out| task_show(&ctx, "PROJ-5", out));
        assert!(shown.contains("\"parentKey\": \"PROJ-4\""), "{shown}");

        let mut sink = Vec::new();
        assert!(task_status(&ctx, "NOPE-1", &mut sink).is_err());
    }

    #[test]
    fn start_without_checkout_transitions_and_prints_branch() {
        let temp = tempfile::tempdir().expect("tempdir");
        let ctx = admin(temp.path());
        with_file_tracker(&ctx);
        let mut buf = Vec::new();
        let code = task_start(&ctx, "PROJ-4", true, &mut buf).expect("start");
        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(buf).expect("utf8"), "PROJ-4/add-oauth-login\n");
        assert_eq!(
            output(|out| task_status(&ctx, "PROJ-4", out)),
            "PROJ-4: IN_PROGRESS (IN_PROGRESS)\n"
        );
    }

    #[test]
    fn start_branch_must_round_trip_task_id() {
        let tracker = FakeTracker::new().with_details("PROJ-4", "Add login");
        let mut config = Config::default();
        assert_eq!(
            start_branch(&config, &tracker, "PROJ-4").expect("branch"),
            "PROJ-4/add-login"
        );

        config.branch_template = "feature/{{ slug }}".to_string();
        assert!(start_branch(&config, &tracker, "PROJ-4").is_err());
    }
}
