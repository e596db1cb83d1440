//! External tool execution.
//!
//! Runs a helper program (`dpkg-query`, `apt-get`, plugin interpreters) with a
//! hard timeout and captures its output.
//!
//! On Unix the child leads its own process group. Whatever it leaves running
//! in that group is killed when it exits or times out, so a backgrounded
//! grandchild holding the output pipes cannot stretch the timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::sync::CancellationToken;

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Extra time allowed for the output pipes to close after the child exits.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started (missing binary, permissions).
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program did not finish in time and was killed.
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The caller cancelled the run and the program was killed.
    #[error("'{program}' was cancelled")]
    Cancelled { program: String },

    /// Waiting on the child failed.
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of a finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    /// Exit status of the process
    pub status: ExitStatus,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ToolOutput {
    /// Check if the tool exited with status 0.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get the exit code.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Builder-style description of a tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    working_dir: Option<std::path::PathBuf>,
    clear_env: bool,
    cancel: Option<CancellationToken>,
}

impl ToolCommand {
    /// Create a new invocation of `program` with a 10 second timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(10),
            working_dir: None,
            clear_env: false,
            cancel: None,
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run in the given directory.
    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.working_dir = Some(dir.to_path_buf());
        self
    }

    /// Start from an empty environment, passing through only `PATH`.
    #[must_use]
    pub fn isolated_env(mut self) -> Self {
        self.clear_env = true;
        self
    }

    /// Kill the tool as soon as `token` is cancelled.
    #[must_use]
    pub fn cancel_on(mut self, token: &CancellationToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    /// Run the tool to completion or until the timeout elapses.
    pub fn run(&self) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let deadline = start + self.timeout;

        let mut cmd = ProcessCommand::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        if self.clear_env {
            cmd.env_clear();
            if let Some(path) = std::env::var_os("PATH") {
                cmd.env("PATH", path);
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|source| ToolError::Spawn { program: self.program.clone(), source })?;

        // Drain pipes on helper threads so a chatty child cannot block on a full pipe.
        let stdout_rx = drain(child.stdout.take());
        let stderr_rx = drain(child.stderr.take());

        let waited = self.wait_with_deadline(&mut child, deadline);
        kill_group(&child);
        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        let drain_deadline = deadline.max(Instant::now() + DRAIN_GRACE);
        let stdout = self.collect(&stdout_rx, drain_deadline)?;
        let stderr = self.collect(&stderr_rx, drain_deadline)?;

        tracing::debug!(
            program = %self.program,
            code = ?status.code(),
            elapsed = ?start.elapsed(),
            "Tool finished"
        );

        Ok(ToolOutput { status, stdout, stderr })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    fn wait_with_deadline(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<ExitStatus, ToolError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if self.is_cancelled() {
                        return Err(ToolError::Cancelled { program: self.program.clone() });
                    }
                    if Instant::now() >= deadline {
                        return Err(self.timed_out());
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    return Err(ToolError::Wait { program: self.program.clone(), source })
                }
            }
        }
    }

    /// Wait for a drained pipe, giving up at `deadline`.
    fn collect(&self, rx: &Receiver<String>, deadline: Instant) -> Result<String, ToolError> {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(output) => Ok(output),
            Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
            Err(RecvTimeoutError::Timeout) => {
                tracing::debug!(program = %self.program, "Output pipe still open after exit");
                Err(self.timed_out())
            }
        }
    }

    fn timed_out(&self) -> ToolError {
        ToolError::Timeout { program: self.program.clone(), timeout: self.timeout }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Kill every process left in the child's process group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Ok(pgid) = i32::try_from(child.id()) {
        // ESRCH just means the group is already empty.
        let _ = killpg(Pid::from_raw(pgid), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}
