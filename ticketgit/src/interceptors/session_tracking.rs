//! Elapsed-time sessions, reported to the tracker when they close.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::context::InvocationContext;
use crate::core::session::{SessionTransition, advance};
use crate::interceptors::branch_task;
use crate::io::config::Config;
use crate::io::session_store::SessionStore;
use crate::pipeline::Interceptor;
use crate::tracker::TaskTracker;

type Clock = Box<dyn Fn() -> DateTime<Utc>>;

/// After every invocation, whatever its exit code, start, refresh or rotate
/// the active session.
pub struct SessionTrackingInterceptor {
    store: SessionStore,
    clock: Clock,
}

impl SessionTrackingInterceptor {
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            clock: Box::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Feed one observation into the session state machine and persist it.
    pub fn record(
        &self,
        branch: &str,
        task: Option<&str>,
        config: &Config,
        tracker: &dyn TaskTracker,
    ) -> SessionTransition {
        let now = (self.clock)();
        let active = self.store.load();
        let transition = advance(
            active.as_ref(),
            branch,
            task,
            now,
            config.tracking.interval(),
        );
        if let Some(snapshot) = transition.closed() {
            self.store.log(&format!(
                "closing session on {} ({} ms)",
                snapshot.branch, snapshot.duration_ms
            ));
            if let Err(err) = tracker.track_session(snapshot) {
                self.store
                    .log(&format!("tracker rejected session on {}: {err}", snapshot.branch));
            }
        }
        if let Err(err) = self.store.save(transition.session()) {
            self.store.log(&format!("failed to save session: {err:#}"));
        }
        transition
    }
}

impl Interceptor for SessionTrackingInterceptor {
    fn name(&self) -> &'static str {
        "session-tracking"
    }

    fn after(
        &self,
        ctx: &InvocationContext,
        exit_code: i32,
        config: &Config,
        tracker: &dyn TaskTracker,
    ) -> Result<Option<i32>> {
        if !config.tracking.enabled {
            if let Err(err) = self.store.clear() {
                self.store.log(&format!("failed to clear session: {err:#}"));
            }
            return Ok(None);
        }
        let Some((branch, task)) = branch_task(ctx, config)? else {
            return Ok(None);
        };
        let transition = self.record(&branch, task.as_deref(), config, tracker);
        debug!(exit_code, branch = %branch, ?transition, "session updated");
        Ok(None)
    }
}
