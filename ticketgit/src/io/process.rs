//! Child process execution for the real tool.
//!
//! Two separate entry points:
//! - [`passthrough`] inherits the caller's stdin/stdout/stderr, so prompts,
//!   pagers, colors, and TTY detection behave as if git ran directly.
//! - [`capture`] pipes stdout/stderr into memory for inspection.
//!
//! Both layer `env` on top of the inherited environment, wait at most
//! `timeout`, and kill the child on expiry (exit code [`exit_codes::TIMEOUT`]).

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::exit_codes;

/// Upper bound on captured bytes per stream; the rest is drained and dropped.
pub const CAPTURE_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// How long to keep draining pipes after the child is gone.
const READER_GRACE: Duration = Duration::from_millis(200);

/// Output of a captured child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Child exit code, or [`exit_codes::TIMEOUT`] if it was killed.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == exit_codes::OK
    }

    pub fn timed_out(&self) -> bool {
        self.exit_code == exit_codes::TIMEOUT
    }
}

/// Run `cmd` attached to the caller's terminal and return its exit code.
///
/// # Panics
/// Panics if `cmd` is empty.
#[instrument(skip_all, fields(program = %cmd.first().map(String::as_str).unwrap_or(""), timeout_secs = timeout.as_secs()))]
pub fn passthrough(
    cmd: &[String],
    workdir: Option<&Path>,
    env: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<i32> {
    let mut command = build_command(cmd, workdir, env);
    command
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    debug!("spawning passthrough child");
    let mut child = spawn(&mut command)?;
    let code = match wait_or_kill(&mut child, timeout)? {
        Some(status) => exit_code(status),
        None => exit_codes::TIMEOUT,
    };
    debug!(exit_code = code, "passthrough finished");
    Ok(code)
}

/// Run `cmd` with stdout/stderr captured into memory.
///
/// Output is read concurrently while the child runs so a chatty child cannot
/// deadlock on a full pipe. Trailing whitespace is trimmed from both streams
/// when the child exits on its own; a timed-out child returns whatever was
/// buffered.
///
/// # Panics
/// Panics if `cmd` is empty.
#[instrument(skip_all, fields(program = %cmd.first().map(String::as_str).unwrap_or(""), timeout_secs = timeout.as_secs()))]
pub fn capture(
    cmd: &[String],
    workdir: Option<&Path>,
    env: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<CommandResult> {
    let mut command = build_command(cmd, workdir, env);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning captured child");
    let started = Instant::now();
    let mut child = spawn(&mut command)?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_buf = SharedBuffer::default();
    let stderr_buf = SharedBuffer::default();
    let (done_tx, done_rx) = mpsc::channel();
    spawn_reader(stdout, Arc::clone(&stdout_buf), done_tx.clone());
    spawn_reader(stderr, Arc::clone(&stderr_buf), done_tx);

    let status = wait_or_kill(&mut child, timeout)?;

    // A grandchild may still hold the pipes; never wait on it past the budget.
    let drain_deadline = match status {
        Some(_) => started
            .checked_add(timeout)
            .map(|deadline| deadline.max(Instant::now() + READER_GRACE)),
        None => Some(Instant::now() + READER_GRACE),
    };
    if !wait_for_readers(&done_rx, 2, drain_deadline) {
        warn!("output pipes still open after the child exited, returning buffered output");
    }

    let StreamBuffer {
        bytes: stdout,
        truncated: stdout_truncated,
    } = take_buffer(&stdout_buf);
    let StreamBuffer {
        bytes: stderr,
        truncated: stderr_truncated,
    } = take_buffer(&stderr_buf);
    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "captured output truncated");
    }

    let stdout = String::from_utf8_lossy(&stdout).into_owned();
    let stderr = String::from_utf8_lossy(&stderr).into_owned();
    let result = match status {
        Some(status) => CommandResult {
            exit_code: exit_code(status),
            stdout: stdout.trim_end().to_string(),
            stderr: stderr.trim_end().to_string(),
        },
        None => CommandResult {
            exit_code: exit_codes::TIMEOUT,
            stdout,
            stderr,
        },
    };
    debug!(exit_code = result.exit_code, "capture finished");
    Ok(result)
}

fn build_command(cmd: &[String], workdir: Option<&Path>, env: &BTreeMap<String, String>) -> Command {
    let (program, args) = cmd
        .split_first()
        .expect("process command must not be empty");
    let mut command = Command::new(program);
    command.args(args).envs(env);
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }
    command
}

fn spawn(command: &mut Command) -> Result<Child> {
    match command.spawn() {
        Ok(child) => Ok(child),
        Err(e) => {
            error!(err = %e, program = ?command.get_program(), "failed to spawn command");
            Err(e).with_context(|| format!("spawn {}", command.get_program().to_string_lossy()))
        }
    }
}

/// Wait up to `timeout`; on expiry kill the child and return `None`.
fn wait_or_kill(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok(Some(status)),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?;
            Ok(None)
        }
    }
}

/// Map an exit status to a shell-style code (`128 + signal` for signal deaths on Unix).
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    exit_codes::ERROR
}

#[derive(Debug, Default)]
struct StreamBuffer {
    bytes: Vec<u8>,
    truncated: usize,
}

type SharedBuffer = Arc<Mutex<StreamBuffer>>;

/// Drain `reader` into `buffer` on a detached thread, signalling `done` at EOF.
fn spawn_reader<R: Read + Send + 'static>(reader: R, buffer: SharedBuffer, done: mpsc::Sender<()>) {
    thread::spawn(move || {
        if let Err(err) = read_stream_limited(reader, &buffer, CAPTURE_LIMIT_BYTES) {
            warn!(err = %err, "reading captured output failed");
        }
        let _ = done.send(());
    });
}

/// Wait for `readers` EOF signals, giving up at `deadline`.
fn wait_for_readers(done: &mpsc::Receiver<()>, readers: usize, deadline: Option<Instant>) -> bool {
    for _ in 0..readers {
        let received = match deadline {
            Some(deadline) => done
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .is_ok(),
            None => done.recv().is_ok(),
        };
        if !received {
            return false;
        }
    }
    true
}

fn take_buffer(buffer: &SharedBuffer) -> StreamBuffer {
    std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner))
}

fn read_stream_limited<R: Read>(mut reader: R, buffer: &Mutex<StreamBuffer>, limit: usize) -> Result<()> {
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let mut buf = buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = limit.saturating_sub(buf.bytes.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.bytes.extend_from_slice(&chunk[..keep]);
            buf.truncated += n.saturating_sub(keep);
        } else {
            buf.truncated += n;
        }
    }

    Ok(())
}
